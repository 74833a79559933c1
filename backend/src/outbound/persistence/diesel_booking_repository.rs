//! PostgreSQL-backed slot ledger.
//!
//! The `(appliance_id, date, hour)` unique index on the bookings table is
//! the hard exclusivity invariant; this adapter surfaces its violation as
//! [`BookingStoreError::SlotConflict`] so the booking service can tell a
//! lost race from an infrastructure failure.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{BookingRepository, BookingStoreError};
use crate::domain::{ApplianceId, ApplianceKind, Booking, BookingId, UserId};

use super::error_map::{is_unique_violation, map_diesel_error, map_pool_error};
use super::models::{BookingRow, NewBookingRow};
use super::pool::DbPool;
use super::schema::{appliances, bookings};

fn map_pool(error: super::pool::PoolError) -> BookingStoreError {
    map_pool_error(error, BookingStoreError::connection)
}

fn map_diesel(error: diesel::result::Error) -> BookingStoreError {
    map_diesel_error(
        error,
        BookingStoreError::query,
        BookingStoreError::connection,
    )
}

/// Diesel implementation of the slot ledger port.
#[derive(Clone)]
pub struct DieselBookingRepository {
    pool: DbPool,
}

impl DieselBookingRepository {
    /// Create a repository over the shared pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for DieselBookingRepository {
    async fn create(
        &self,
        user: UserId,
        appliance: ApplianceId,
        date: NaiveDate,
        hour: u8,
    ) -> Result<BookingId, BookingStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let row = NewBookingRow {
            user_id: user.as_i64(),
            appliance_id: appliance.as_i64(),
            date,
            hour: i16::from(hour),
            created_at: Utc::now(),
        };
        let id: i64 = diesel::insert_into(bookings::table)
            .values(&row)
            .returning(bookings::id)
            .get_result(&mut conn)
            .await
            .map_err(|error| {
                if is_unique_violation(&error) {
                    BookingStoreError::SlotConflict
                } else {
                    map_diesel(error)
                }
            })?;
        Ok(BookingId::new(id))
    }

    async fn find(&self, id: BookingId) -> Result<Option<Booking>, BookingStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let row: Option<BookingRow> = bookings::table
            .filter(bookings::id.eq(id.as_i64()))
            .select(BookingRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;
        Ok(row.map(Booking::from))
    }

    async fn delete(&self, id: BookingId) -> Result<bool, BookingStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let deleted = diesel::delete(bookings::table.filter(bookings::id.eq(id.as_i64())))
            .execute(&mut conn)
            .await
            .map_err(map_diesel)?;
        Ok(deleted > 0)
    }

    async fn booked_hours(
        &self,
        appliance: ApplianceId,
        date: NaiveDate,
    ) -> Result<Vec<u8>, BookingStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let hours: Vec<i16> = bookings::table
            .filter(
                bookings::appliance_id
                    .eq(appliance.as_i64())
                    .and(bookings::date.eq(date)),
            )
            .select(bookings::hour)
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;
        Ok(hours
            .into_iter()
            .filter_map(|hour| u8::try_from(hour).ok())
            .collect())
    }

    async fn user_has_kind_on(
        &self,
        user: UserId,
        date: NaiveDate,
        kind: ApplianceKind,
    ) -> Result<bool, BookingStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let count: i64 = bookings::table
            .inner_join(appliances::table)
            .filter(
                bookings::user_id
                    .eq(user.as_i64())
                    .and(bookings::date.eq(date))
                    .and(appliances::kind.eq(kind.as_str())),
            )
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel)?;
        Ok(count > 0)
    }

    async fn user_has_kind_at(
        &self,
        user: UserId,
        date: NaiveDate,
        hour: u8,
        kind: ApplianceKind,
    ) -> Result<bool, BookingStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let count: i64 = bookings::table
            .inner_join(appliances::table)
            .filter(
                bookings::user_id
                    .eq(user.as_i64())
                    .and(bookings::date.eq(date))
                    .and(bookings::hour.eq(i16::from(hour)))
                    .and(appliances::kind.eq(kind.as_str())),
            )
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel)?;
        Ok(count > 0)
    }

    async fn user_booking_at(
        &self,
        user: UserId,
        appliance: ApplianceId,
        date: NaiveDate,
        hour: u8,
    ) -> Result<Option<BookingId>, BookingStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let id: Option<i64> = bookings::table
            .filter(
                bookings::user_id
                    .eq(user.as_i64())
                    .and(bookings::appliance_id.eq(appliance.as_i64()))
                    .and(bookings::date.eq(date))
                    .and(bookings::hour.eq(i16::from(hour))),
            )
            .select(bookings::id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;
        Ok(id.map(BookingId::new))
    }

    async fn upcoming_for_user(
        &self,
        user: UserId,
        from_date: NaiveDate,
        from_hour: u8,
    ) -> Result<Vec<Booking>, BookingStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let rows: Vec<BookingRow> = bookings::table
            .filter(bookings::user_id.eq(user.as_i64()))
            .filter(
                bookings::date.gt(from_date).or(bookings::date
                    .eq(from_date)
                    .and(bookings::hour.ge(i16::from(from_hour)))),
            )
            .order((bookings::date.asc(), bookings::hour.asc()))
            .select(BookingRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;
        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn on_dates(&self, dates: &[NaiveDate]) -> Result<Vec<Booking>, BookingStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let rows: Vec<BookingRow> = bookings::table
            .filter(bookings::date.eq_any(dates))
            .order((bookings::date.asc(), bookings::hour.asc()))
            .select(BookingRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;
        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn all_for_date(&self, date: NaiveDate) -> Result<Vec<Booking>, BookingStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let rows: Vec<BookingRow> = bookings::table
            .filter(bookings::date.eq(date))
            .order((bookings::appliance_id.asc(), bookings::hour.asc()))
            .select(BookingRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;
        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn purge_before(&self, cutoff: NaiveDate) -> Result<u64, BookingStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let deleted = diesel::delete(bookings::table.filter(bookings::date.lt(cutoff)))
            .execute(&mut conn)
            .await
            .map_err(map_diesel)?;
        Ok(u64::try_from(deleted).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn unique_violations_surface_as_slot_conflicts() {
        let error = diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key".to_owned()),
        );
        let mapped = if is_unique_violation(&error) {
            BookingStoreError::SlotConflict
        } else {
            map_diesel(error)
        };
        assert_eq!(mapped, BookingStoreError::SlotConflict);
    }

    #[rstest]
    fn other_database_errors_stay_query_errors() {
        let mapped = map_diesel(diesel::result::Error::NotFound);
        assert!(matches!(mapped, BookingStoreError::Query { .. }));
    }
}
