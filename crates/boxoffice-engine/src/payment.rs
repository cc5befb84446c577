//! # Payment Gateway Adapter
//!
//! The engine talks to the payment provider only through [`PaymentGateway`].
//!
//! ## Booking Round Trip
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   BookingEngine                      Provider (Paystack)                │
//! │        │                                    │                           │
//! │        │  authorize(email, amount)          │                           │
//! │        │──── POST /transaction/initialize ─►│                           │
//! │        │◄─── data.authorization_url ────────│                           │
//! │        │                                    │                           │
//! │        │  confirm(reference)                │                           │
//! │        │──── GET /transaction/verify/{ref} ►│                           │
//! │        │◄─── data.status == "success" ──────│                           │
//! │        ▼                                    │                           │
//! │   commit ticket                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts are always sent in the currency's minor unit.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use boxoffice_core::Money;

use crate::config::{PaymentProvider, PaymentSettings};

// =============================================================================
// Errors
// =============================================================================

/// Errors from a payment provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PaymentError {
    /// Transport failure (DNS, TLS, connection reset).
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The provider rejected the secret key.
    #[error("Unauthorized: check the payment secret key")]
    Unauthorized,

    /// Non-success status from the provider.
    #[error("Provider error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The provider answered with something we could not read.
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// The call did not finish in time.
    #[error("Payment call timed out")]
    Timeout,

    /// The provider refused the charge.
    #[error("Payment declined")]
    Declined,
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PaymentError::Timeout
        } else if err.is_decode() {
            PaymentError::InvalidResponse(err.to_string())
        } else {
            PaymentError::RequestFailed(err.to_string())
        }
    }
}

// =============================================================================
// Trait
// =============================================================================

/// A payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Starts a payment of `amount` by `email`. Returns the checkout URL.
    async fn authorize(&self, email: &str, amount: Money) -> Result<String, PaymentError>;

    /// Whether the payment identified by `reference` succeeded.
    async fn confirm(&self, reference: &str) -> Result<bool, PaymentError>;

    /// Short provider name for logs.
    fn name(&self) -> &'static str;
}

/// Builds the gateway selected by `settings.provider`.
pub fn build_gateway(settings: &PaymentSettings) -> Result<Arc<dyn PaymentGateway>, PaymentError> {
    match settings.provider {
        PaymentProvider::Paystack => {
            let secret = settings
                .secret_key
                .clone()
                .ok_or(PaymentError::Unauthorized)?;
            let gateway = PaystackGateway::new(&settings.base_url, secret, settings.timeout())?;
            Ok(Arc::new(gateway))
        }
        PaymentProvider::Mock => {
            warn!("Using mock payment gateway: every payment is approved");
            Ok(MockGateway::approving().shared())
        }
    }
}

// =============================================================================
// Paystack
// =============================================================================

#[derive(Debug, Serialize)]
struct InitializeRequest<'a> {
    email: &'a str,
    amount: i64,
}

/// Paystack wraps every payload as `{ status, message, data }`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
}

/// Paystack REST API client.
#[derive(Debug, Clone)]
pub struct PaystackGateway {
    client: Client,
    base_url: Url,
    secret_key: String,
}

impl PaystackGateway {
    /// Creates a client for `base_url` (normally `https://api.paystack.co`).
    pub fn new(
        base_url: &str,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PaymentError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| PaymentError::RequestFailed(format!("invalid base URL: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::RequestFailed(e.to_string()))?;

        Ok(PaystackGateway {
            client,
            base_url,
            secret_key: secret_key.into(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, PaymentError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PaymentError::RequestFailed("base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn read<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, PaymentError> {
        match response.status() {
            StatusCode::OK => {
                let envelope: Envelope<T> = response.json().await?;
                envelope.data.ok_or_else(|| {
                    PaymentError::InvalidResponse(
                        envelope
                            .message
                            .unwrap_or_else(|| "missing data field".to_string()),
                    )
                })
            }
            StatusCode::UNAUTHORIZED => Err(PaymentError::Unauthorized),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(PaymentError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn authorize(&self, email: &str, amount: Money) -> Result<String, PaymentError> {
        let url = self.endpoint(&["transaction", "initialize"])?;
        debug!(email = %email, amount = amount.minor(), "Initializing Paystack transaction");

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.secret_key)
            .json(&InitializeRequest {
                email,
                amount: amount.minor(),
            })
            .send()
            .await?;

        let data: InitializeData = Self::read(response).await?;
        Ok(data.authorization_url)
    }

    async fn confirm(&self, reference: &str) -> Result<bool, PaymentError> {
        let url = self.endpoint(&["transaction", "verify", reference])?;
        debug!(reference = %reference, "Verifying Paystack transaction");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        let data: VerifyData = Self::read(response).await?;
        Ok(data.status == "success")
    }

    fn name(&self) -> &'static str {
        "paystack"
    }
}

// =============================================================================
// Mock
// =============================================================================

/// What a [`MockGateway`] call does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// authorize returns a URL; confirm returns true.
    Approve,
    /// confirm returns false. authorize treats it as an error.
    Decline,
    /// Returns the given error.
    Fail(PaymentError),
    /// Sleeps before approving.
    Hang(Duration),
}

/// Scripted gateway for tests and local development.
#[derive(Debug)]
pub struct MockGateway {
    authorize_behavior: MockBehavior,
    confirm_behavior: MockBehavior,
    authorize_calls: AtomicUsize,
    confirm_calls: AtomicUsize,
}

impl MockGateway {
    pub fn new(authorize: MockBehavior, confirm: MockBehavior) -> Self {
        MockGateway {
            authorize_behavior: authorize,
            confirm_behavior: confirm,
            authorize_calls: AtomicUsize::new(0),
            confirm_calls: AtomicUsize::new(0),
        }
    }

    pub fn approving() -> Self {
        Self::new(MockBehavior::Approve, MockBehavior::Approve)
    }

    pub fn shared(self) -> Arc<dyn PaymentGateway> {
        Arc::new(self)
    }

    pub fn authorize_calls(&self) -> usize {
        self.authorize_calls.load(Ordering::SeqCst)
    }

    pub fn confirm_calls(&self) -> usize {
        self.confirm_calls.load(Ordering::SeqCst)
    }

    async fn play(behavior: &MockBehavior) -> Result<bool, PaymentError> {
        match behavior {
            MockBehavior::Approve => Ok(true),
            MockBehavior::Decline => Ok(false),
            MockBehavior::Fail(err) => Err(err.clone()),
            MockBehavior::Hang(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(true)
            }
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn authorize(&self, email: &str, amount: Money) -> Result<String, PaymentError> {
        let call = self.authorize_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if Self::play(&self.authorize_behavior).await? {
            Ok(format!(
                "https://checkout.mock/pay/{call}?email={email}&amount={}",
                amount.minor()
            ))
        } else {
            Err(PaymentError::Declined)
        }
    }

    async fn confirm(&self, _reference: &str) -> Result<bool, PaymentError> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        Self::play(&self.confirm_behavior).await
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
