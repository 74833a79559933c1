//! Safety-net sweep over due reminders.
//!
//! Timers can be lost to crashes or a degraded timer store. The watchdog
//! does not trust them: every sweep re-reads today's and tomorrow's
//! bookings straight from the ledger and dispatches anything whose fire
//! instant lies inside the late window. The dispatcher's sent-log keeps
//! the sweep from double-sending what a timer already delivered.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use mockable::Clock;
use tracing::{info, warn};

use crate::domain::ports::BookingRepository;
use crate::domain::{DispatchOutcome, DispatchReminder, Error, LaundryCalendar, ReminderKey};

/// Outcome tally of one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    /// Bookings read from the ledger.
    pub examined: usize,
    /// Bookings whose fire instant fell inside the late window.
    pub due: usize,
    /// Reminders actually delivered by this sweep.
    pub sent: usize,
    /// Due reminders whose delivery failed.
    pub send_failures: usize,
}

/// Periodic re-derivation of due reminders from the ledger.
pub struct WatchdogSweep {
    ledger: Arc<dyn BookingRepository>,
    dispatcher: Arc<dyn DispatchReminder>,
    calendar: LaundryCalendar,
    clock: Arc<dyn Clock>,
    lead_minutes: u32,
    late_window: TimeDelta,
}

impl WatchdogSweep {
    /// Build a sweep over the given ledger and dispatcher.
    pub fn new(
        ledger: Arc<dyn BookingRepository>,
        dispatcher: Arc<dyn DispatchReminder>,
        calendar: LaundryCalendar,
        clock: Arc<dyn Clock>,
        lead_minutes: u32,
        late_window: Duration,
    ) -> Self {
        Self {
            ledger,
            dispatcher,
            calendar,
            clock,
            lead_minutes,
            late_window: TimeDelta::from_std(late_window).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Examine today's and tomorrow's bookings and dispatch everything due.
    pub async fn sweep_once(&self) -> Result<SweepStats, Error> {
        let now = self.clock.utc();
        let today = self.calendar.today(self.clock.as_ref());
        let mut dates = vec![today];
        if let Some(tomorrow) = today.succ_opt() {
            dates.push(tomorrow);
        }

        let bookings = self
            .ledger
            .on_dates(&dates)
            .await?;

        let mut stats = SweepStats::default();
        for booking in bookings {
            stats.examined += 1;
            let Some(fire_at) = self
                .calendar
                .fire_at(booking.date, booking.hour, self.lead_minutes)
            else {
                continue;
            };
            let overdue = now.signed_duration_since(fire_at);
            if overdue < TimeDelta::zero() || overdue > self.late_window {
                continue;
            }
            stats.due += 1;

            let reminder = ReminderKey {
                user: booking.user_id,
                appliance: booking.appliance_id,
                date: booking.date,
                hour: booking.hour,
                lead_minutes: self.lead_minutes,
            };
            match self.dispatcher.dispatch(&reminder).await {
                Ok(DispatchOutcome::Sent) => stats.sent += 1,
                Ok(DispatchOutcome::SendFailed) => stats.send_failures += 1,
                Ok(_) => {}
                Err(error) => {
                    stats.send_failures += 1;
                    warn!(%error, date = %booking.date, hour = booking.hour, "watchdog dispatch failed");
                }
            }
        }

        if stats.sent > 0 || stats.send_failures > 0 {
            info!(
                examined = stats.examined,
                due = stats.due,
                sent = stats.sent,
                send_failures = stats.send_failures,
                "watchdog sweep delivered reminders"
            );
        }
        Ok(stats)
    }
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
