//! Port abstraction for the reminder sent-log.
//!
//! The log is append-only and is the idempotency token for reminder
//! delivery: a tuple present in the log is never sent again, whether the
//! dispatcher was driven by a timer or by the watchdog sweep.

use async_trait::async_trait;

use crate::domain::ReminderKey;

use super::define_store_error;

define_store_error! {
    /// Failures raised by sent-log adapters.
    pub enum ReminderLogError {
        /// Sent-log connection could not be established.
        Connection { message: String } => "reminder log connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "reminder log query failed: {message}",
    }
}

/// Append-only record of reminders already delivered.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReminderLog: Send + Sync {
    /// Record a delivery. Returns `false` when the tuple was already
    /// present (a concurrent dispatcher won); the caller treats that as
    /// "already sent", never as a failure.
    async fn record_sent(&self, key: &ReminderKey) -> Result<bool, ReminderLogError>;

    /// Whether a delivery record exists for the tuple.
    async fn was_sent(&self, key: &ReminderKey) -> Result<bool, ReminderLogError>;
}
