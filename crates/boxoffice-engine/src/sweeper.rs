//! # Expiry Sweeper
//!
//! Background task that moves past events from `active` to `expired`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      ExpirySweeper::run()                               │
//! │                                                                         │
//! │   loop {                                                                │
//! │     select! {                                                           │
//! │       interval.tick()     ──► lifecycle.sweep_expired()                 │
//! │                                 ├── Ok(n)  → info!(n)                   │
//! │                                 └── Err(e) → error!(e), keep going     │
//! │       shutdown_rx.recv()  ──► break                                     │
//! │     }                                                                   │
//! │   }                                                                     │
//! │                                                                         │
//! │  The first tick fires immediately, so a restart sweeps at once.        │
//! │  Default interval: 24 hours.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::error::{EngineError, EngineResult};
use crate::lifecycle::EventLifecycle;

/// Periodic expiry sweep.
pub struct ExpirySweeper {
    lifecycle: EventLifecycle,
    interval: Duration,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for stopping a running sweeper.
#[derive(Clone)]
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl SweeperHandle {
    /// Asks the sweeper to stop after its current pass.
    pub async fn shutdown(&self) -> EngineResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| EngineError::Channel("Sweeper shutdown channel closed".into()))
    }
}

impl ExpirySweeper {
    /// Creates a sweeper and the handle that stops it.
    pub fn new(lifecycle: EventLifecycle, interval: Duration) -> (Self, SweeperHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let sweeper = ExpirySweeper {
            lifecycle,
            interval,
            shutdown_rx,
        };

        (sweeper, SweeperHandle { shutdown_tx })
    }

    /// Runs until shutdown is requested or every handle is dropped.
    ///
    /// Spawn this as a background task.
    pub async fn run(mut self) {
        info!(interval_secs = self.interval.as_secs(), "Expiry sweeper starting");

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!(?e, "Expiry sweep failed");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Expiry sweeper shutting down");
                    break;
                }
            }
        }

        info!("Expiry sweeper stopped");
    }

    /// One sweep pass. Returns the number of events expired.
    pub async fn run_once(&self) -> EngineResult<usize> {
        let expired = self.lifecycle.sweep_expired().await?;
        if expired == 0 {
            debug!("No events to expire");
        } else {
            info!(expired, "Sweep complete");
        }
        Ok(expired)
    }
}
