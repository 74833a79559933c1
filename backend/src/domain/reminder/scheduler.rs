//! One-shot reminder timers.
//!
//! The scheduler keeps an in-memory map of armed tokio tasks keyed by
//! [`TimerKey`] and mirrors every armed timer into the durable
//! [`ReminderTimerStore`]. On restart [`ReminderScheduler::restore`]
//! re-arms whatever the store still holds, and
//! [`ReminderScheduler::rebuild_for_horizon`] re-derives timers straight
//! from the ledger for the near horizon, so a lost timer row never loses
//! a reminder.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::TimeDelta;
use mockable::Clock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::ports::{BookingRepository, ReminderTimerStore};
use crate::domain::{DispatchReminder, Error, LaundryCalendar, ReminderKey, Sleeper, TimerKey};

/// Timing knobs for reminder scheduling.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Minutes before the slot start a reminder fires.
    pub lead_minutes: u32,
    /// How far past the fire instant a reminder may still be delivered.
    pub late_window: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lead_minutes: 30,
            late_window: Duration::from_secs(300),
        }
    }
}

/// Driven ports the scheduler needs.
pub struct SchedulerPorts {
    /// Slot ledger, read during horizon rebuilds.
    pub ledger: Arc<dyn BookingRepository>,
    /// Durable mirror of armed timers.
    pub timers: Arc<dyn ReminderTimerStore>,
    /// Delivery path for due reminders.
    pub dispatcher: Arc<dyn DispatchReminder>,
    /// Suspension primitive for the armed tasks.
    pub sleeper: Arc<dyn Sleeper>,
}

type ArmedMap = Arc<Mutex<HashMap<TimerKey, JoinHandle<()>>>>;

fn lock_armed(armed: &Mutex<HashMap<TimerKey, JoinHandle<()>>>)
-> MutexGuard<'_, HashMap<TimerKey, JoinHandle<()>>> {
    armed.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Arms and replaces one-shot reminder timers.
pub struct ReminderScheduler {
    ledger: Arc<dyn BookingRepository>,
    timers: Arc<dyn ReminderTimerStore>,
    dispatcher: Arc<dyn DispatchReminder>,
    sleeper: Arc<dyn Sleeper>,
    calendar: LaundryCalendar,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    late_window: TimeDelta,
    armed: ArmedMap,
}

impl ReminderScheduler {
    /// Build a scheduler.
    pub fn new(
        ports: SchedulerPorts,
        calendar: LaundryCalendar,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            ledger: ports.ledger,
            timers: ports.timers,
            dispatcher: ports.dispatcher,
            sleeper: ports.sleeper,
            calendar,
            clock,
            config,
            late_window: TimeDelta::from_std(config.late_window).unwrap_or(TimeDelta::MAX),
            armed: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of timers currently armed in this process.
    pub fn armed_count(&self) -> usize {
        lock_armed(&self.armed).len()
    }

    /// Schedule the reminder for a fresh booking with the configured lead.
    ///
    /// A slot whose fire instant already passed but still lies inside the
    /// late window is dispatched immediately; one past the window is
    /// dropped. Re-enqueueing a key replaces the armed timer.
    pub async fn enqueue(&self, key: TimerKey) -> Result<(), Error> {
        let reminder = ReminderKey::from_timer(key, self.config.lead_minutes);
        self.schedule(reminder, true).await?;
        Ok(())
    }

    /// Re-arm every timer the durable store still holds. Returns how many
    /// were scheduled (or dispatched immediately).
    pub async fn restore(&self) -> Result<usize, Error> {
        let pending = self.timers.pending().await?;
        let mut scheduled = 0;
        for timer in pending {
            let reminder = ReminderKey::from_timer(timer.key, timer.lead_minutes);
            if self.schedule(reminder, false).await? {
                scheduled += 1;
            }
        }
        Ok(scheduled)
    }

    /// Re-derive timers from the ledger for every booking starting within
    /// the next `hours`. Returns how many were scheduled.
    pub async fn rebuild_for_horizon(&self, hours: u32) -> Result<usize, Error> {
        let end = self.clock.utc() + TimeDelta::hours(i64::from(hours));
        let dates = self.horizon_dates(hours);
        let bookings = self
            .ledger
            .on_dates(&dates)
            .await?;

        let mut scheduled = 0;
        for booking in bookings {
            let Some(start) = self.calendar.slot_start(booking.date, booking.hour) else {
                continue;
            };
            if start > end {
                continue;
            }
            let reminder = ReminderKey {
                user: booking.user_id,
                appliance: booking.appliance_id,
                date: booking.date,
                hour: booking.hour,
                lead_minutes: self.config.lead_minutes,
            };
            if self.schedule(reminder, true).await? {
                scheduled += 1;
            }
        }
        Ok(scheduled)
    }

    fn horizon_dates(&self, hours: u32) -> Vec<chrono::NaiveDate> {
        let now_local = self.calendar.now_local(self.clock.as_ref());
        let end_date = (now_local + TimeDelta::hours(i64::from(hours))).date_naive();
        let mut dates = Vec::new();
        let mut date = now_local.date_naive();
        while date <= end_date {
            dates.push(date);
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        dates
    }

    /// Schedule one reminder. Returns `false` when it was dropped as
    /// stale. `persist` is `false` on restore, where the durable row
    /// already exists.
    async fn schedule(&self, reminder: ReminderKey, persist: bool) -> Result<bool, Error> {
        let key = reminder.timer_key();
        let Some(fire_at) = self
            .calendar
            .fire_at(reminder.date, reminder.hour, reminder.lead_minutes)
        else {
            warn!(date = %reminder.date, hour = reminder.hour, "slot has no instant in the house zone, not scheduling");
            return Ok(false);
        };

        let now = self.clock.utc();
        let overdue = now.signed_duration_since(fire_at);
        if overdue > TimeDelta::zero() {
            if overdue <= self.late_window {
                // Booked inside the lead window: remind right away.
                self.dispatch_immediately(&reminder, !persist).await;
                return Ok(true);
            }
            debug!(date = %reminder.date, hour = reminder.hour, "fire instant already past the late window, dropping");
            if !persist {
                // Restored row that can never fire any more.
                if let Err(error) = self.timers.disarm(&key).await {
                    warn!(%error, "failed to disarm stale restored timer");
                }
            }
            return Ok(false);
        }

        if persist {
            // Best effort: a lost row only costs restart durability, and
            // the watchdog sweep covers that.
            if let Err(error) = self
                .timers
                .arm(&key, reminder.lead_minutes, fire_at)
                .await
            {
                warn!(%error, "failed to persist armed timer");
            }
        }

        let delay = (fire_at - now).to_std().unwrap_or(Duration::ZERO);
        let task = {
            let dispatcher = Arc::clone(&self.dispatcher);
            let timers = Arc::clone(&self.timers);
            let sleeper = Arc::clone(&self.sleeper);
            let armed = Arc::clone(&self.armed);
            async move {
                sleeper.sleep(delay).await;
                if let Err(error) = dispatcher.dispatch(&reminder).await {
                    warn!(%error, "reminder dispatch failed");
                }
                if let Err(error) = timers.disarm(&key).await {
                    warn!(%error, "failed to disarm delivered timer");
                }
                lock_armed(&armed).remove(&key);
            }
        };

        let mut armed = lock_armed(&self.armed);
        if let Some(previous) = armed.remove(&key) {
            previous.abort();
        }
        armed.insert(key, tokio::spawn(task));
        Ok(true)
    }

    async fn dispatch_immediately(&self, reminder: &ReminderKey, durable_row_exists: bool) {
        if let Err(error) = self.dispatcher.dispatch(reminder).await {
            warn!(%error, "immediate reminder dispatch failed");
        }
        if !durable_row_exists {
            return;
        }
        if let Err(error) = self.timers.disarm(&reminder.timer_key()).await {
            warn!(%error, "failed to disarm immediately dispatched timer");
        }
    }
}

#[async_trait::async_trait]
impl crate::domain::ScheduleReminder for ReminderScheduler {
    async fn enqueue(&self, key: TimerKey) -> Result<(), Error> {
        Self::enqueue(self, key).await
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
