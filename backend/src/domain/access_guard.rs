//! Ban checks gating entry to the booking path.
//!
//! The guard is a pure pre-check: a banned identity is rejected before
//! any request reaches the ledger. It also owns the three-strikes rule
//! on the registration side, turning repeated rejected attempts into a
//! temporary automatic ban.

use std::sync::Arc;

use chrono::TimeDelta;
use mockable::Clock;
use tracing::{info, warn};

use crate::domain::ports::{BanRecord, ModerationRepository};
use crate::domain::{Error, ExternalId};

/// Rejected registration attempts tolerated before an automatic ban.
pub const MAX_FAILED_ATTEMPTS: u32 = 3;
/// Length of an automatic ban, in days.
pub const AUTO_BAN_DAYS: i64 = 7;

/// Moderation gate in front of the booking service.
pub struct AccessGuard {
    moderation: Arc<dyn ModerationRepository>,
    clock: Arc<dyn Clock>,
}

impl AccessGuard {
    /// Build a guard over the moderation store.
    pub fn new(moderation: Arc<dyn ModerationRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { moderation, clock }
    }

    /// Reject a banned identity with [`Error::forbidden`]; expired bans
    /// pass.
    pub async fn ensure_not_banned(&self, external: ExternalId) -> Result<(), Error> {
        let Some(ban) = self
            .moderation
            .find_ban(external)
            .await?
        else {
            return Ok(());
        };
        if !ban.is_active(self.clock.utc()) {
            return Ok(());
        }
        Err(match ban.banned_until {
            Some(until) => Error::forbidden(format!("banned until {}", until.format("%Y-%m-%d %H:%M"))),
            None => Error::forbidden("banned indefinitely"),
        })
    }

    /// Count one rejected registration attempt. The third strike issues
    /// an automatic seven-day ban and resets the counter; returns `true`
    /// when that happened.
    pub async fn register_failed_attempt(&self, external: ExternalId) -> Result<bool, Error> {
        let now = self.clock.utc();
        let attempts = self
            .moderation
            .bump_failed_attempts(external, now)
            .await?;
        if attempts < MAX_FAILED_ATTEMPTS {
            return Ok(false);
        }

        let record = BanRecord {
            external_id: external,
            reason: format!("{attempts} rejected registration attempts"),
            banned_until: Some(now + TimeDelta::days(AUTO_BAN_DAYS)),
            banned_at: now,
        };
        self.moderation
            .upsert_ban(&record)
            .await?;
        if let Err(error) = self.moderation.reset_failed_attempts(external).await {
            warn!(%error, %external, "failed to reset attempt counter after auto-ban");
        }
        info!(%external, attempts, "automatic ban issued");
        Ok(true)
    }

    /// Clear the failed-attempt counter after a successful registration.
    pub async fn clear_failed_attempts(&self, external: ExternalId) -> Result<(), Error> {
        self.moderation
            .reset_failed_attempts(external)
            .await
            .map_err(Error::from)
    }

    /// Issue a manual ban; `days` of `None` bans indefinitely.
    pub async fn ban(
        &self,
        external: ExternalId,
        reason: &str,
        days: Option<u32>,
    ) -> Result<BanRecord, Error> {
        let now = self.clock.utc();
        let record = BanRecord {
            external_id: external,
            reason: reason.to_owned(),
            banned_until: days.map(|days| now + TimeDelta::days(i64::from(days))),
            banned_at: now,
        };
        self.moderation
            .upsert_ban(&record)
            .await?;
        info!(%external, reason, "ban issued");
        Ok(record)
    }

    /// Lift a ban; [`Error::not_found`] when none exists.
    pub async fn unban(&self, external: ExternalId) -> Result<(), Error> {
        let lifted = self
            .moderation
            .delete_ban(external)
            .await?;
        if !lifted {
            return Err(Error::not_found(format!("no ban for {external}")));
        }
        info!(%external, "ban lifted");
        Ok(())
    }

    /// Every ban row, newest first, for the administrative overview.
    pub async fn list_bans(&self) -> Result<Vec<BanRecord>, Error> {
        self.moderation.list_bans().await.map_err(Error::from)
    }
}

#[cfg(test)]
#[path = "access_guard_tests.rs"]
mod tests;
