//! Reservation rules over the slot ledger.
//!
//! The service validates a request against freshness and quota rules,
//! performs the atomic insert, and translates the ledger's uniqueness
//! conflict into a user-facing outcome. The quota pre-check and the
//! insert are deliberately not one cross-table transaction; the narrow
//! same-type double-booking race that leaves open is a known and
//! accepted trade-off.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Timelike};
use mockable::Clock;
use tracing::{info, warn};

use crate::domain::ports::{
    ApplianceRepository, BookingRepository, BookingStoreError, UserRepository,
};
use crate::domain::{
    Appliance, ApplianceId, Booking, BookingDetails, BookingId, Error, LaundryCalendar,
    ScheduleReminder, TimerKey, User, UserId,
};

/// Driven ports the booking service needs.
pub struct BookingServicePorts {
    /// The slot ledger.
    pub ledger: Arc<dyn BookingRepository>,
    /// Appliance catalog.
    pub appliances: Arc<dyn ApplianceRepository>,
    /// Resident store, used by the administrative pre-booking path.
    pub users: Arc<dyn UserRepository>,
    /// Reminder timer entry point.
    pub scheduler: Arc<dyn ScheduleReminder>,
}

/// Validates and executes reservations.
pub struct BookingService {
    ledger: Arc<dyn BookingRepository>,
    appliances: Arc<dyn ApplianceRepository>,
    users: Arc<dyn UserRepository>,
    scheduler: Arc<dyn ScheduleReminder>,
    calendar: LaundryCalendar,
    clock: Arc<dyn Clock>,
    booking_days_ahead: u32,
}

impl BookingService {
    /// Build a booking service.
    ///
    /// `booking_days_ahead` counts today as the first bookable day, so
    /// a value of 3 opens today plus the next two days.
    pub fn new(
        ports: BookingServicePorts,
        calendar: LaundryCalendar,
        clock: Arc<dyn Clock>,
        booking_days_ahead: u32,
    ) -> Self {
        Self {
            ledger: ports.ledger,
            appliances: ports.appliances,
            users: ports.users,
            scheduler: ports.scheduler,
            calendar,
            clock,
            booking_days_ahead,
        }
    }

    async fn require_appliance(&self, id: ApplianceId) -> Result<Appliance, Error> {
        self.appliances
            .find(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("appliance {id} not found")))
    }

    /// Operating hours still free for an appliance on a date.
    ///
    /// Freeness is the set-difference between the operating window and
    /// the booked hours, recomputed per request so a stale view never
    /// double-offers a slot. For today, hours whose start already passed
    /// are excluded as well.
    pub async fn free_hours(
        &self,
        appliance: ApplianceId,
        date: NaiveDate,
    ) -> Result<Vec<u8>, Error> {
        self.require_appliance(appliance).await?;

        let booked = self
            .ledger
            .booked_hours(appliance, date)
            .await?;
        let now = self.clock.utc();

        Ok(self
            .calendar
            .operating_hours()
            .iter()
            .filter(|hour| !booked.contains(hour))
            .filter(|hour| {
                self.calendar
                    .slot_start(date, *hour)
                    .is_some_and(|start| start > now)
            })
            .collect())
    }

    /// Reserve a slot for a resident.
    pub async fn reserve(
        &self,
        user: UserId,
        appliance_id: ApplianceId,
        date: NaiveDate,
        hour: u8,
    ) -> Result<BookingId, Error> {
        let appliance = self.require_appliance(appliance_id).await?;

        if !self.calendar.operating_hours().contains(hour) {
            return Err(Error::invalid_request(format!(
                "hour {hour} is outside the operating window"
            )));
        }
        let Some(start) = self.calendar.slot_start(date, hour) else {
            return Err(Error::invalid_request(format!(
                "{date} {hour}:00 does not exist in the house time zone"
            )));
        };
        if start <= self.clock.utc() {
            return Err(Error::past_slot(format!(
                "slot {date} {hour}:00 has already started"
            )));
        }

        let today = self.calendar.now_local(self.clock.as_ref()).date_naive();
        let last_open_day = today.checked_add_days(chrono::Days::new(u64::from(
            self.booking_days_ahead.saturating_sub(1),
        )));
        if !last_open_day.is_some_and(|last| date <= last) {
            return Err(Error::invalid_request(format!(
                "{date} is beyond the {}-day booking window",
                self.booking_days_ahead
            )));
        }

        // Resubmitting an already held slot is a success, and must not
        // trip the quota check below.
        if let Some(own) = self
            .ledger
            .user_booking_at(user, appliance_id, date, hour)
            .await?
        {
            return Ok(own);
        }

        // Soft quota: one booking per appliance kind per day. Pre-check
        // only; the insert below is not in the same transaction.
        let holds_same_kind = self
            .ledger
            .user_has_kind_on(user, date, appliance.kind)
            .await?;
        if holds_same_kind {
            return Err(Error::quota_exceeded(format!(
                "already booked a {} slot on {date}",
                appliance.kind
            )));
        }

        let booking_id = match self.ledger.create(user, appliance_id, date, hour).await {
            Ok(id) => id,
            Err(BookingStoreError::SlotConflict) => {
                // Lost the race, or the caller resubmitted. A conflicting
                // row owned by the caller makes the resubmission a success.
                return match self
                    .ledger
                    .user_booking_at(user, appliance_id, date, hour)
                    .await?
                {
                    Some(own) => Ok(own),
                    None => Err(Error::slot_taken(format!(
                        "slot {date} {hour}:00 on {} is already booked",
                        appliance.name
                    ))),
                };
            }
            Err(other) => return Err(other.into()),
        };

        info!(%user, appliance = %appliance_id, %date, hour, "booking created");

        // Reminder scheduling is best effort; the watchdog sweep picks up
        // anything a failed enqueue loses.
        let key = TimerKey {
            user,
            appliance: appliance_id,
            date,
            hour,
        };
        if let Err(error) = self.scheduler.enqueue(key).await {
            warn!(%error, %user, %date, hour, "failed to schedule reminder for new booking");
        }

        Ok(booking_id)
    }

    /// Cancel the caller's own booking.
    pub async fn cancel(&self, user: UserId, id: BookingId) -> Result<(), Error> {
        let booking = self
            .ledger
            .find(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("booking {id} not found")))?;
        if booking.user_id != user {
            return Err(Error::forbidden("booking belongs to another resident"));
        }
        self.delete_booking(booking).await
    }

    /// Delete any booking, without an ownership check.
    pub async fn admin_delete(&self, id: BookingId) -> Result<(), Error> {
        let booking = self
            .ledger
            .find(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("booking {id} not found")))?;
        self.delete_booking(booking).await
    }

    // Cancellation is a plain delete. A pending reminder timer is left
    // alone; the dispatcher's existence check keeps it from firing a
    // message for a row that is gone.
    async fn delete_booking(&self, booking: Booking) -> Result<(), Error> {
        let deleted = self
            .ledger
            .delete(booking.id)
            .await?;
        if !deleted {
            return Err(Error::not_found(format!("booking {} not found", booking.id)));
        }
        info!(booking = %booking.id, user = %booking.user_id, "booking cancelled");
        Ok(())
    }

    /// The resident's bookings that have not started yet, soonest first.
    pub async fn list_upcoming(&self, user: UserId) -> Result<Vec<BookingDetails>, Error> {
        let now_local = self.calendar.now_local(self.clock.as_ref());
        let today = now_local.date_naive();
        // A slot at the current hour has already started.
        let from_hour = u8::try_from(now_local.hour() + 1).unwrap_or(u8::MAX);

        let bookings = self
            .ledger
            .upcoming_for_user(user, today, from_hour)
            .await?;
        self.with_appliances(bookings).await
    }

    /// Reserve on behalf of a resident known only by surname and room.
    ///
    /// A resident without a record yet gets a stub created on the spot;
    /// the reservation then follows the normal rules.
    pub async fn force_book(
        &self,
        surname: &str,
        room: &str,
        appliance: ApplianceId,
        date: NaiveDate,
        hour: u8,
    ) -> Result<(User, BookingId), Error> {
        let user = self
            .users
            .ensure_by_natural_key(surname, room)
            .await?;
        let booking_id = self.reserve(user.id, appliance, date, hour).await?;
        Ok((user, booking_id))
    }

    /// Every booking on a date, for the administrative overview.
    pub async fn list_all_for_date(&self, date: NaiveDate) -> Result<Vec<BookingDetails>, Error> {
        let bookings = self
            .ledger
            .all_for_date(date)
            .await?;
        self.with_appliances(bookings).await
    }

    async fn with_appliances(&self, bookings: Vec<Booking>) -> Result<Vec<BookingDetails>, Error> {
        let catalog: HashMap<ApplianceId, Appliance> = self
            .appliances
            .list()
            .await?
            .into_iter()
            .map(|appliance| (appliance.id, appliance))
            .collect();

        bookings
            .into_iter()
            .map(|booking| {
                let appliance = catalog
                    .get(&booking.appliance_id)
                    .cloned()
                    .ok_or_else(|| {
                        Error::internal(format!(
                            "booking {} references unknown appliance {}",
                            booking.id, booking.appliance_id
                        ))
                    })?;
                Ok(BookingDetails { booking, appliance })
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "booking_service_tests.rs"]
mod tests;
