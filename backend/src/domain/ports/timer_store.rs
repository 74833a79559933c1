//! Port abstraction for durable one-shot reminder timers.
//!
//! Armed timers survive process restarts; on startup the scheduler re-arms
//! everything still pending. Losing this store is survivable, because
//! the watchdog sweep re-derives due reminders from the ledger, so adapters
//! may degrade rather than fail the booking path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::TimerKey;

use super::define_store_error;

define_store_error! {
    /// Failures raised by timer store adapters.
    pub enum TimerStoreError {
        /// Timer store connection could not be established.
        Connection { message: String } => "timer store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "timer store query failed: {message}",
    }
}

/// One durable timer row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmedTimer {
    /// The slot the timer belongs to.
    pub key: TimerKey,
    /// Lead time the reminder was scheduled with.
    pub lead_minutes: u32,
    /// Instant the timer should fire.
    pub fire_at: DateTime<Utc>,
}

/// Durable storage for scheduled one-shot timers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReminderTimerStore: Send + Sync {
    /// Arm (or replace) the timer for a key.
    async fn arm(
        &self,
        key: &TimerKey,
        lead_minutes: u32,
        fire_at: DateTime<Utc>,
    ) -> Result<(), TimerStoreError>;

    /// Remove the timer for a key, if present.
    async fn disarm(&self, key: &TimerKey) -> Result<(), TimerStoreError>;

    /// All timers currently armed.
    async fn pending(&self) -> Result<Vec<ArmedTimer>, TimerStoreError>;
}
