//! Domain types and services for the laundry room.
//!
//! The domain layer is storage-agnostic: services talk to the driven
//! ports in [`ports`] and read time through an injected clock. The
//! inbound HTTP layer and the outbound adapters both depend on this
//! module, never the other way round.

pub mod access_guard;
pub mod appliance;
pub mod booking;
pub mod booking_service;
pub mod calendar;
pub mod error;
pub mod ports;
pub mod purge;
pub mod reminder;
pub mod user;

pub use self::access_guard::{AUTO_BAN_DAYS, AccessGuard, MAX_FAILED_ATTEMPTS};
pub use self::appliance::{Appliance, ApplianceId, ApplianceKind};
pub use self::booking::{Booking, BookingDetails, BookingId};
pub use self::booking_service::{BookingService, BookingServicePorts};
pub use self::calendar::{InvalidOperatingHours, LaundryCalendar, OperatingHours};
pub use self::error::{Error, ErrorCode};
pub use self::purge::DailyPurge;
pub use self::reminder::{
    DispatchOutcome, DispatchReminder, DispatcherPorts, ReminderDispatcher, ReminderKey,
    ReminderScheduler, ScheduleReminder, SchedulerConfig, SchedulerPorts, Sleeper, SweepStats,
    TimerKey, TokioSleeper, WatchdogSweep,
};
pub use self::user::{ExternalId, User, UserId};

/// Convenient domain result alias.
pub type ApiResult<T> = Result<T, Error>;
