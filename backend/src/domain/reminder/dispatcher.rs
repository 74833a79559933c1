//! Idempotent reminder delivery.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;
use mockable::Clock;
use tracing::{debug, warn};

use crate::domain::ports::{
    ApplianceRepository, BookingRepository, ReminderLog, ReminderNotifier, UserRepository,
};
use crate::domain::{
    Appliance, ApplianceKind, DispatchOutcome, DispatchReminder, Error, LaundryCalendar,
    ReminderKey,
};

/// Driven ports the dispatcher needs.
pub struct DispatcherPorts {
    /// Slot ledger, consulted for the existence and suppression checks.
    pub ledger: Arc<dyn BookingRepository>,
    /// Resident store, resolves the delivery identity.
    pub users: Arc<dyn UserRepository>,
    /// Appliance catalog, resolves the appliance name and kind.
    pub appliances: Arc<dyn ApplianceRepository>,
    /// Append-only sent-log.
    pub sent_log: Arc<dyn ReminderLog>,
    /// Delivery channel.
    pub notifier: Arc<dyn ReminderNotifier>,
}

/// Performs the actual send under strict idempotency.
///
/// Order of checks: late-window cutoff, booking existence, the
/// dryer-after-washer suppression rule, sent-log lookup, then the send
/// itself. A failed send is swallowed; the watchdog sweep is the retry
/// path, not the caller.
pub struct ReminderDispatcher {
    ledger: Arc<dyn BookingRepository>,
    users: Arc<dyn UserRepository>,
    appliances: Arc<dyn ApplianceRepository>,
    sent_log: Arc<dyn ReminderLog>,
    notifier: Arc<dyn ReminderNotifier>,
    calendar: LaundryCalendar,
    clock: Arc<dyn Clock>,
    late_window: TimeDelta,
}

impl ReminderDispatcher {
    /// Build a dispatcher.
    pub fn new(
        ports: DispatcherPorts,
        calendar: LaundryCalendar,
        clock: Arc<dyn Clock>,
        late_window: Duration,
    ) -> Self {
        Self {
            ledger: ports.ledger,
            users: ports.users,
            appliances: ports.appliances,
            sent_log: ports.sent_log,
            notifier: ports.notifier,
            calendar,
            clock,
            late_window: TimeDelta::from_std(late_window).unwrap_or(TimeDelta::MAX),
        }
    }

    async fn is_suppressed(&self, key: &ReminderKey, appliance: &Appliance) -> Result<bool, Error> {
        if appliance.kind != ApplianceKind::Dry || key.hour == 0 {
            return Ok(false);
        }
        self.ledger
            .user_has_kind_at(key.user, key.date, key.hour - 1, ApplianceKind::Wash)
            .await
            .map_err(Error::from)
    }
}

/// Compose the message delivered to the resident.
fn reminder_text(appliance: &Appliance, key: &ReminderKey) -> String {
    let activity = match appliance.kind {
        ApplianceKind::Wash => "wash",
        ApplianceKind::Dry => "drying",
    };
    format!(
        "Reminder: your {activity} starts in {} min.\n{}\n{}, {:02}:00",
        key.lead_minutes, appliance.name, key.date, key.hour
    )
}

#[async_trait]
impl DispatchReminder for ReminderDispatcher {
    async fn dispatch(&self, key: &ReminderKey) -> Result<DispatchOutcome, Error> {
        let fire_at = self
            .calendar
            .fire_at(key.date, key.hour, key.lead_minutes)
            .ok_or_else(|| Error::internal("reminder slot does not map to an instant"))?;

        let now = self.clock.utc();
        if now.signed_duration_since(fire_at) > self.late_window {
            debug!(user = %key.user, date = %key.date, hour = key.hour, "reminder past the late window, dropping");
            return Ok(DispatchOutcome::Stale);
        }

        // Cancellation is a plain delete; this check is what keeps stale
        // timers from notifying about a booking that is gone.
        let booking = self
            .ledger
            .user_booking_at(key.user, key.appliance, key.date, key.hour)
            .await?;
        if booking.is_none() {
            debug!(user = %key.user, date = %key.date, hour = key.hour, "booking gone, skipping reminder");
            return Ok(DispatchOutcome::BookingGone);
        }

        let Some(appliance) = self
            .appliances
            .find(key.appliance)
            .await?
        else {
            warn!(appliance = %key.appliance, "appliance vanished from the catalog, skipping reminder");
            return Ok(DispatchOutcome::BookingGone);
        };

        // A dryer slot right after the same user's wash is already covered
        // by the wash reminder.
        if self.is_suppressed(key, &appliance).await? {
            debug!(user = %key.user, date = %key.date, hour = key.hour, "dryer reminder suppressed after wash");
            return Ok(DispatchOutcome::Suppressed);
        }

        if self.sent_log.was_sent(key).await? {
            return Ok(DispatchOutcome::AlreadySent);
        }

        let Some(user) = self
            .users
            .find_by_id(key.user)
            .await?
        else {
            debug!(user = %key.user, "resident gone, skipping reminder");
            return Ok(DispatchOutcome::BookingGone);
        };

        let text = reminder_text(&appliance, key);
        if let Err(error) = self.notifier.send(user.external_id, &text).await {
            warn!(user = %key.user, %error, "reminder delivery failed, leaving to the sweep");
            return Ok(DispatchOutcome::SendFailed);
        }

        if !self
            .sent_log
            .record_sent(key)
            .await?
        {
            debug!(user = %key.user, date = %key.date, hour = key.hour, "concurrent dispatcher already recorded this reminder");
        }
        Ok(DispatchOutcome::Sent)
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
