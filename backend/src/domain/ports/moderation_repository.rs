//! Port abstraction for moderation state.
//!
//! Bans and the failed-attempt counter gate entry to the booking path.
//! The core only reads this state as a guard; writes come from the
//! administrative surface and the registration guard.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ExternalId;

use super::define_store_error;

define_store_error! {
    /// Failures raised by moderation store adapters.
    pub enum ModerationStoreError {
        /// Moderation store connection could not be established.
        Connection { message: String } => "moderation store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "moderation store query failed: {message}",
    }
}

/// An active or historical ban.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanRecord {
    /// Banned chat identity.
    pub external_id: ExternalId,
    /// Human-entered reason.
    pub reason: String,
    /// Expiry instant; `None` means indefinite.
    pub banned_until: Option<DateTime<Utc>>,
    /// When the ban was issued.
    pub banned_at: DateTime<Utc>,
}

impl BanRecord {
    /// Whether the ban is still in force at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.banned_until.is_none_or(|until| until > now)
    }
}

/// Durable moderation state: bans plus the failed-attempt counter.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModerationRepository: Send + Sync {
    /// The ban row for an identity, if any (active or expired).
    async fn find_ban(&self, external: ExternalId)
    -> Result<Option<BanRecord>, ModerationStoreError>;

    /// Create or replace a ban.
    async fn upsert_ban(&self, record: &BanRecord) -> Result<(), ModerationStoreError>;

    /// Lift a ban; returns `false` when none existed.
    async fn delete_ban(&self, external: ExternalId) -> Result<bool, ModerationStoreError>;

    /// All ban rows, newest first.
    async fn list_bans(&self) -> Result<Vec<BanRecord>, ModerationStoreError>;

    /// Increment the rolling failed-attempt counter; returns the new count.
    async fn bump_failed_attempts(
        &self,
        external: ExternalId,
        now: DateTime<Utc>,
    ) -> Result<u32, ModerationStoreError>;

    /// Clear the failed-attempt counter.
    async fn reset_failed_attempts(&self, external: ExternalId)
    -> Result<(), ModerationStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn record(until: Option<DateTime<Utc>>) -> BanRecord {
        BanRecord {
            external_id: ExternalId::new(42),
            reason: "spam".to_owned(),
            banned_until: until,
            banned_at: Utc::now(),
        }
    }

    #[test]
    fn indefinite_bans_never_expire() {
        assert!(record(None).is_active(Utc::now()));
    }

    #[test]
    fn dated_bans_expire() {
        let now = Utc::now();
        assert!(record(Some(now + TimeDelta::hours(1))).is_active(now));
        assert!(!record(Some(now - TimeDelta::hours(1))).is_active(now));
    }
}
