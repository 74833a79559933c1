//! Domain ports for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_store_error;

mod appliance_repository;
mod booking_repository;
mod moderation_repository;
mod notifier;
mod reminder_log;
mod timer_store;
mod user_repository;

#[cfg(test)]
pub use appliance_repository::MockApplianceRepository;
pub use appliance_repository::{ApplianceRepository, ApplianceStoreError};
#[cfg(test)]
pub use booking_repository::MockBookingRepository;
pub use booking_repository::{BookingRepository, BookingStoreError};
#[cfg(test)]
pub use moderation_repository::MockModerationRepository;
pub use moderation_repository::{BanRecord, ModerationRepository, ModerationStoreError};
#[cfg(test)]
pub use notifier::MockReminderNotifier;
pub use notifier::{NotifyError, ReminderNotifier};
#[cfg(test)]
pub use reminder_log::MockReminderLog;
pub use reminder_log::{ReminderLog, ReminderLogError};
#[cfg(test)]
pub use timer_store::MockReminderTimerStore;
pub use timer_store::{ArmedTimer, ReminderTimerStore, TimerStoreError};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserRepository, UserStoreError};
