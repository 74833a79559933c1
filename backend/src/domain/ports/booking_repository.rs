//! Port abstraction for the slot ledger.
//!
//! The ledger is the authority for "is this slot free": it stores bookings
//! and enforces the hard exclusivity invariant through a uniqueness
//! constraint on (appliance, date, hour). Adapters surface that constraint
//! as [`BookingStoreError::SlotConflict`] so the booking service can tell a
//! lost race apart from an infrastructure failure.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{ApplianceId, ApplianceKind, Booking, BookingId, UserId};

use super::define_store_error;

define_store_error! {
    /// Failures raised by slot ledger adapters.
    pub enum BookingStoreError {
        /// Ledger connection could not be established.
        Connection { message: String } => "slot ledger connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "slot ledger query failed: {message}",
        /// The (appliance, date, hour) uniqueness constraint fired.
        SlotConflict => "slot is already booked",
    }
}

/// Durable, consistent storage of bookings.
///
/// All writes are immediately visible to subsequent reads; no adapter may
/// cache booking state across calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a booking, or fail with [`BookingStoreError::SlotConflict`]
    /// when the slot is already taken (by anyone, the caller included).
    async fn create(
        &self,
        user: UserId,
        appliance: ApplianceId,
        date: NaiveDate,
        hour: u8,
    ) -> Result<BookingId, BookingStoreError>;

    /// Fetch a booking by identifier.
    async fn find(&self, id: BookingId) -> Result<Option<Booking>, BookingStoreError>;

    /// Delete a booking; returns `false` when no such row existed.
    async fn delete(&self, id: BookingId) -> Result<bool, BookingStoreError>;

    /// Hours already booked for an appliance on a date.
    async fn booked_hours(
        &self,
        appliance: ApplianceId,
        date: NaiveDate,
    ) -> Result<Vec<u8>, BookingStoreError>;

    /// Whether the user holds any booking of the given kind on the date.
    async fn user_has_kind_on(
        &self,
        user: UserId,
        date: NaiveDate,
        kind: ApplianceKind,
    ) -> Result<bool, BookingStoreError>;

    /// Whether the user holds a booking of the given kind at an exact hour.
    async fn user_has_kind_at(
        &self,
        user: UserId,
        date: NaiveDate,
        hour: u8,
        kind: ApplianceKind,
    ) -> Result<bool, BookingStoreError>;

    /// The user's own booking for an exact slot, if any.
    async fn user_booking_at(
        &self,
        user: UserId,
        appliance: ApplianceId,
        date: NaiveDate,
        hour: u8,
    ) -> Result<Option<BookingId>, BookingStoreError>;

    /// The user's bookings at or after the given civil position, ordered by
    /// date then hour.
    async fn upcoming_for_user(
        &self,
        user: UserId,
        from_date: NaiveDate,
        from_hour: u8,
    ) -> Result<Vec<Booking>, BookingStoreError>;

    /// All bookings on any of the given dates.
    async fn on_dates(&self, dates: &[NaiveDate]) -> Result<Vec<Booking>, BookingStoreError>;

    /// All bookings on one date, ordered by appliance then hour.
    async fn all_for_date(&self, date: NaiveDate) -> Result<Vec<Booking>, BookingStoreError>;

    /// Delete bookings dated strictly before the cutoff; returns the count.
    async fn purge_before(&self, cutoff: NaiveDate) -> Result<u64, BookingStoreError>;
}
