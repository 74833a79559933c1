//! Booking entities.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Appliance, ApplianceId, UserId};

/// Opaque booking identifier assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(i64);

impl BookingId {
    /// Wrap a raw store identifier.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw store identifier.
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for BookingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One exclusive (appliance, date, hour) reservation.
///
/// The store enforces that no two bookings share the same appliance, date
/// and hour; the hour is civil and bounded to the operating window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Store-assigned identifier.
    pub id: BookingId,
    /// Owning resident.
    pub user_id: UserId,
    /// Reserved appliance.
    pub appliance_id: ApplianceId,
    /// Civil date of the slot.
    pub date: NaiveDate,
    /// Hour-of-day of the slot start.
    pub hour: u8,
    /// When the reservation was made.
    pub created_at: DateTime<Utc>,
}

/// A booking joined with its appliance, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDetails {
    /// The reservation itself.
    pub booking: Booking,
    /// The appliance it reserves.
    pub appliance: Appliance,
}
