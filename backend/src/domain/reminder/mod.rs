//! Reminder scheduling subsystem.
//!
//! The [`ReminderScheduler`] owns the mapping from future instants to
//! delivery work, the [`ReminderDispatcher`] performs the idempotent send,
//! and the [`WatchdogSweep`] re-derives due reminders straight from the
//! ledger so correctness never depends on a timer surviving.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{ApplianceId, Error, UserId};

mod dispatcher;
mod scheduler;
mod watchdog;

pub use dispatcher::{DispatcherPorts, ReminderDispatcher};
pub use scheduler::{ReminderScheduler, SchedulerConfig, SchedulerPorts};
pub use watchdog::{SweepStats, WatchdogSweep};

/// Identity of one scheduled timer: re-enqueueing the same key replaces
/// the armed timer instead of duplicating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerKey {
    /// Owning resident.
    pub user: UserId,
    /// Reserved appliance.
    pub appliance: ApplianceId,
    /// Civil date of the slot.
    pub date: NaiveDate,
    /// Hour-of-day of the slot start.
    pub hour: u8,
}

/// Identity of one delivered (or deliverable) reminder; this exact tuple
/// is what the sent-log deduplicates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReminderKey {
    /// Owning resident.
    pub user: UserId,
    /// Reserved appliance.
    pub appliance: ApplianceId,
    /// Civil date of the slot.
    pub date: NaiveDate,
    /// Hour-of-day of the slot start.
    pub hour: u8,
    /// Minutes before the slot start the reminder targets.
    pub lead_minutes: u32,
}

impl ReminderKey {
    /// Build a reminder key from a timer key plus a lead time.
    pub fn from_timer(key: TimerKey, lead_minutes: u32) -> Self {
        Self {
            user: key.user,
            appliance: key.appliance,
            date: key.date,
            hour: key.hour,
            lead_minutes,
        }
    }

    /// The timer identity of this reminder.
    pub fn timer_key(&self) -> TimerKey {
        TimerKey {
            user: self.user,
            appliance: self.appliance,
            date: self.date,
            hour: self.hour,
        }
    }
}

/// What the dispatcher did with one due reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The notification was delivered and recorded.
    Sent,
    /// The sent-log already held the tuple; nothing was delivered.
    AlreadySent,
    /// The fire time was missed by more than the late window.
    Stale,
    /// The booking no longer exists (cancelled or merged away).
    BookingGone,
    /// Suppressed by the dryer-after-washer rule.
    Suppressed,
    /// The send itself failed; swallowed, the sweep may retry later.
    SendFailed,
}

/// Driving port for reminder delivery, implemented by
/// [`ReminderDispatcher`] and mocked in scheduler and watchdog tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DispatchReminder: Send + Sync {
    /// Deliver one due reminder under the idempotency rules.
    async fn dispatch(&self, key: &ReminderKey) -> Result<DispatchOutcome, Error>;
}

/// Driving port for arming reminder timers, implemented by
/// [`ReminderScheduler`] and mocked in booking service tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScheduleReminder: Send + Sync {
    /// Arm (or replace) the reminder timer for a slot.
    async fn enqueue(&self, key: TimerKey) -> Result<(), Error>;
}

/// Suspension abstraction so timer logic is testable without real delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend the calling task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer wheel.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
