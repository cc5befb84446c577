//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use boxoffice_core::{Event, NewEvent};
use boxoffice_db::{Database, DbConfig};
use boxoffice_engine::{BookingEngine, EventLifecycle, MockGateway};
use chrono::Utc;
use tempfile::TempDir;

/// A file-backed store so that concurrent tasks really use separate
/// connections. Keep the `TempDir` alive for the duration of the test.
pub async fn file_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new(dir.path().join("boxoffice.db"))
        .max_connections(8)
        .busy_timeout(Duration::from_secs(10));
    (Database::new(config).await.unwrap(), dir)
}

pub async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// Inserts `count` users named `user-0`, `user-1`, ...
pub async fn seed_users(db: &Database, count: usize) -> Vec<String> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let id = format!("user-{i}");
        db.users()
            .insert(&id, &format!("{id}@example.com"), &format!("User {i}"))
            .await
            .unwrap();
        ids.push(id);
    }
    ids
}

pub fn new_event(total_tickets: i64, price_minor: i64) -> NewEvent {
    NewEvent {
        name: "Afrobeats Live".into(),
        description: Some("Open-air concert".into()),
        date: Utc::now() + chrono::Duration::days(14),
        location: "Eko Atlantic".into(),
        organizer: Some("Sound City".into()),
        price_minor,
        total_tickets,
    }
}

pub async fn create_event(db: &Database, total_tickets: i64, price_minor: i64) -> Event {
    EventLifecycle::new(db.clone())
        .create(new_event(total_tickets, price_minor))
        .await
        .unwrap()
}

pub fn engine(db: &Database, gateway: MockGateway) -> (BookingEngine, Arc<MockGateway>) {
    let gateway = Arc::new(gateway);
    let engine = BookingEngine::new(db.clone(), gateway.clone())
        .with_payment_timeout(Duration::from_millis(200));
    (engine, gateway)
}

/// `0 <= available <= total` and `available == total - booked`.
pub async fn assert_counter_invariant(db: &Database, event_id: &str) {
    let event = db.events().get_by_id(event_id).await.unwrap().unwrap();
    let booked = db.tickets().count_booked(event_id).await.unwrap();

    assert!(event.available_tickets >= 0, "available went negative");
    assert!(
        event.available_tickets <= event.total_tickets,
        "available exceeds capacity"
    );
    assert_eq!(
        event.available_tickets,
        event.total_tickets - booked,
        "available != total - booked"
    );
}
