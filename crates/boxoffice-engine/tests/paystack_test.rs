//! Booking through the Paystack adapter against a stubbed provider.
//!
//! Run with: `cargo test -p boxoffice-engine --test paystack_test`

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use boxoffice_core::BookingOutcome;
use boxoffice_engine::{BookingEngine, PaystackGateway};
use common::{assert_counter_invariant, create_event, memory_db, seed_users};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn stub_initialize(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .and(body_partial_json(json!({ "email": "user-0@example.com", "amount": 450_000 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "message": "Authorization URL created",
            "data": { "authorization_url": "https://checkout.paystack.com/xyz" }
        })))
        .mount(server)
        .await;
}

fn paystack_engine(server: &MockServer, db: &boxoffice_db::Database) -> BookingEngine {
    let gateway =
        PaystackGateway::new(&server.uri(), "sk_test_secret", Duration::from_secs(2)).unwrap();
    BookingEngine::new(db.clone(), Arc::new(gateway)).with_payment_timeout(Duration::from_millis(500))
}

#[tokio::test]
async fn test_verified_payment_books_with_checkout_url() {
    let server = MockServer::start().await;
    stub_initialize(&server).await;
    Mock::given(method("GET"))
        .and(path("/transaction/verify/T-100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "data": { "status": "success", "reference": "T-100" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let db = memory_db().await;
    let users = seed_users(&db, 1).await;
    let event = create_event(&db, 2, 450_000).await;
    let engine = paystack_engine(&server, &db);

    let outcome = engine.book(&event.id, &users[0], "T-100").await.unwrap();
    let BookingOutcome::Booked { ticket, payment_url } = outcome else {
        panic!("expected Booked, got {outcome:?}");
    };
    assert_eq!(payment_url.as_deref(), Some("https://checkout.paystack.com/xyz"));
    assert_eq!(ticket.payment_reference.as_deref(), Some("T-100"));
    assert_counter_invariant(&db, &event.id).await;
}

#[tokio::test]
async fn test_failed_verification_is_rejected() {
    let server = MockServer::start().await;
    stub_initialize(&server).await;
    Mock::given(method("GET"))
        .and(path("/transaction/verify/T-200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "data": { "status": "failed" }
        })))
        .mount(&server)
        .await;

    let db = memory_db().await;
    let users = seed_users(&db, 1).await;
    let event = create_event(&db, 2, 450_000).await;
    let engine = paystack_engine(&server, &db);

    let outcome = engine.book(&event.id, &users[0], "T-200").await.unwrap();
    assert_eq!(outcome.code(), "PAYMENT_VERIFY_FAILED");
    assert_eq!(engine.event_status(&event.id).await.unwrap().available_tickets, 2);
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_json(json!({ "status": true, "data": { "authorization_url": "x" } })),
        )
        .mount(&server)
        .await;

    let db = memory_db().await;
    let users = seed_users(&db, 1).await;
    let event = create_event(&db, 2, 450_000).await;
    let engine = paystack_engine(&server, &db);

    let outcome = engine.book(&event.id, &users[0], "T-300").await.unwrap();
    assert_eq!(outcome.code(), "PAYMENT_INIT_FAILED");
    assert!(engine.tickets_for_user(&users[0]).await.unwrap().is_empty());
}
