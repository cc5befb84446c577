//! # Event Leases
//!
//! Per-event mutual exclusion for the booking engine.
//!
//! ## Why Not Row Locks?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SQLite has no SELECT ... FOR UPDATE. Its write lock is database-wide  │
//! │  and must not be held across a payment-gateway round trip.             │
//! │                                                                         │
//! │  Instead, every same-event operation first takes a lease:              │
//! │                                                                         │
//! │   EventLocks (one per Database)                                        │
//! │   ┌──────────────────────────────────────────────┐                     │
//! │   │  "evt-a" ──► Arc<tokio::Mutex<()>>  (held)    │ ◄── book(evt-a)    │
//! │   │  "evt-b" ──► Arc<tokio::Mutex<()>>  (held)    │ ◄── cancel(evt-b)  │
//! │   └──────────────────────────────────────────────┘                     │
//! │                                                                         │
//! │  • book(evt-a) and cancel(evt-b) run in parallel                       │
//! │  • a second book(evt-a) waits until the first lease drops              │
//! │  • entries are removed once no task holds or awaits them               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Waiting on a lease never holds a pooled connection, so the lease registry
//! and the connection pool cannot deadlock against each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use boxoffice_core::Event;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

type Registry = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

// =============================================================================
// Registry
// =============================================================================

/// Registry of per-event async mutexes.
///
/// Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct EventLocks {
    locks: Registry,
}

impl EventLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `event_id`.
    ///
    /// The registry's std mutex is only held for the map lookup, never
    /// across the `.await`.
    pub async fn acquire(&self, event_id: &str) -> LockGuard {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks
                .entry(event_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        let guard = mutex.lock_owned().await;
        trace!(event_id = %event_id, "Event lease acquired");

        LockGuard {
            event_id: event_id.to_string(),
            guard: Some(guard),
            registry: Arc::clone(&self.locks),
        }
    }

    /// Number of events with a live or awaited lease.
    pub fn active(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

// =============================================================================
// Guards
// =============================================================================

/// Exclusive hold on one event id. Released on drop.
#[derive(Debug)]
pub struct LockGuard {
    event_id: String,
    guard: Option<OwnedMutexGuard<()>>,
    registry: Registry,
}

impl LockGuard {
    pub fn event_id(&self) -> &str {
        &self.event_id
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Unlock first so the strong count below reflects only the registry
        // plus any waiters.
        drop(self.guard.take());

        let mut locks = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = locks
            .get(&self.event_id)
            .map(|m| Arc::strong_count(m) == 1)
            .unwrap_or(false);
        if idle {
            locks.remove(&self.event_id);
        }
        trace!(event_id = %self.event_id, "Event lease released");
    }
}

/// A held event lock plus the event row read while holding it.
///
/// Every writer of an event's row takes the lease first, so the snapshot
/// stays accurate for as long as the lease lives.
#[derive(Debug)]
pub struct EventLease {
    event: Event,
    _guard: LockGuard,
}

impl EventLease {
    pub(crate) fn new(event: Event, guard: LockGuard) -> Self {
        EventLease {
            event,
            _guard: guard,
        }
    }

    /// The event as of the last write made under this lease.
    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn event_id(&self) -> &str {
        &self.event.id
    }

    /// Replaces the snapshot after the lease holder wrote to the event row.
    pub fn refresh(&mut self, event: Event) {
        self.event = event;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_same_event_is_exclusive() {
        let locks = EventLocks::new();
        let held = locks.acquire("evt-a").await;

        let second = timeout(Duration::from_millis(50), locks.acquire("evt-a")).await;
        assert!(second.is_err(), "second lease must wait");

        drop(held);
        let second = timeout(Duration::from_millis(50), locks.acquire("evt-a")).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_different_events_do_not_block() {
        let locks = EventLocks::new();
        let _a = locks.acquire("evt-a").await;
        let b = timeout(Duration::from_millis(50), locks.acquire("evt-b")).await;
        assert!(b.is_ok());
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn test_registry_entries_are_reclaimed() {
        let locks = EventLocks::new();
        {
            let guard = locks.acquire("evt-a").await;
            assert_eq!(guard.event_id(), "evt-a");
            assert_eq!(locks.active(), 1);
        }
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_waiters_keep_entry_alive() {
        let locks = EventLocks::new();
        let first = locks.acquire("evt-a").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.acquire("evt-a").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        // The waiter still references the mutex, so the entry survives
        // until it finishes.
        waiter.await.unwrap();
        assert_eq!(locks.active(), 0);
    }
}
