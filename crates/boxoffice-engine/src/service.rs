//! # Box Office Service
//!
//! Wires the store, the payment gateway and the engines together from a
//! loaded [`BoxOfficeConfig`].
//!
//! ```text
//! BoxOfficeConfig ──► Database (pool + leases)
//!                 ──► PaymentGateway (paystack | mock)
//!                 ──► BookingEngine ─┐
//!                 ──► EventLifecycle ┴─► BoxOffice
//! ```

use std::sync::Arc;

use boxoffice_db::{Database, DbConfig};
use tracing::info;

use crate::booking::BookingEngine;
use crate::config::{BoxOfficeConfig, DatabaseSettings};
use crate::error::EngineResult;
use crate::lifecycle::EventLifecycle;
use crate::payment::{build_gateway, PaymentGateway};
use crate::sweeper::{ExpirySweeper, SweeperHandle};

/// Everything a host process needs, sharing one database handle.
#[derive(Debug, Clone)]
pub struct BoxOffice {
    db: Database,
    booking: BookingEngine,
    lifecycle: EventLifecycle,
    config: Arc<BoxOfficeConfig>,
}

impl BoxOffice {
    /// Opens the database and builds the configured gateway.
    pub async fn open(config: BoxOfficeConfig) -> EngineResult<Self> {
        let gateway = build_gateway(&config.payment)?;
        let db = open_database(&config.database).await?;

        Ok(Self::with_parts(db, gateway, config))
    }

    /// Assembles a service from an existing database and gateway.
    pub fn with_parts(
        db: Database,
        gateway: Arc<dyn PaymentGateway>,
        config: BoxOfficeConfig,
    ) -> Self {
        info!(
            gateway = gateway.name(),
            confirmation = ?config.payment.confirmation,
            "Box office ready"
        );

        BoxOffice {
            booking: BookingEngine::from_settings(db.clone(), gateway, &config.payment),
            lifecycle: EventLifecycle::new(db.clone()),
            db,
            config: Arc::new(config),
        }
    }

    pub fn booking(&self) -> &BookingEngine {
        &self.booking
    }

    pub fn lifecycle(&self) -> &EventLifecycle {
        &self.lifecycle
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &BoxOfficeConfig {
        &self.config
    }

    /// Spawns the expiry sweeper on the current runtime.
    pub fn spawn_sweeper(&self) -> (SweeperHandle, tokio::task::JoinHandle<()>) {
        let (sweeper, handle) =
            ExpirySweeper::new(self.lifecycle.clone(), self.config.sweeper.interval());
        (handle, tokio::spawn(sweeper.run()))
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}

/// Opens the store alone, creating its directory if needed. No gateway is
/// built, so payment settings play no part.
pub async fn open_database(settings: &DatabaseSettings) -> EngineResult<Database> {
    if let Some(parent) = settings.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_config = DbConfig::new(settings.path.clone()).max_connections(settings.max_connections);
    Ok(Database::new(db_config).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaymentProvider;

    #[tokio::test]
    async fn test_open_file_database_with_mock_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BoxOfficeConfig::default();
        config.database.path = dir.path().join("boxoffice.db");
        config.payment.provider = PaymentProvider::Mock;

        let office = BoxOffice::open(config).await.unwrap();
        assert!(office.database().health_check().await);
        assert!(office.lifecycle().list(None).await.unwrap().is_empty());

        let (handle, task) = office.spawn_sweeper();
        handle.shutdown().await.unwrap();
        task.await.unwrap();

        office.close().await;
    }

    #[tokio::test]
    async fn test_open_fails_without_paystack_secret() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BoxOfficeConfig::default();
        config.database.path = dir.path().join("boxoffice.db");

        let err = BoxOffice::open(config).await.unwrap_err();
        assert_eq!(err.code(), "PAYMENT_GATEWAY_ERROR");
        assert!(!dir.path().join("boxoffice.db").exists());
    }

    #[tokio::test]
    async fn test_sweeper_store_opens_without_payment_secret() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BoxOfficeConfig::default();
        config.database.path = dir.path().join("nested").join("boxoffice.db");
        assert!(config.validate().is_err());
        assert!(config.validate_storage().is_ok());

        let db = open_database(&config.database).await.unwrap();
        let lifecycle = EventLifecycle::new(db.clone());
        assert_eq!(lifecycle.sweep_expired().await.unwrap(), 0);
        db.close().await;
    }
}
