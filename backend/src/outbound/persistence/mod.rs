//! Storage adapters.
//!
//! Two interchangeable backends sit behind the domain ports: an
//! in-process [`MemoryStore`] for single-node deployments and tests,
//! and a PostgreSQL backend via Diesel for the networked setup. The
//! core never learns which one it is talking to.

mod diesel_appliance_repository;
mod diesel_booking_repository;
mod diesel_moderation_repository;
mod diesel_reminder_log;
mod diesel_timer_store;
mod diesel_user_repository;
mod error_map;
mod memory;
mod migrations;
mod models;
mod pool;
pub mod schema;

pub use diesel_appliance_repository::DieselApplianceRepository;
pub use diesel_booking_repository::DieselBookingRepository;
pub use diesel_moderation_repository::DieselModerationRepository;
pub use diesel_reminder_log::DieselReminderLog;
pub use diesel_timer_store::DieselTimerStore;
pub use diesel_user_repository::DieselUserRepository;
pub use memory::MemoryStore;
pub use migrations::run_pending_migrations;
pub use pool::{DbPool, PoolConfig, PoolError};
