//! Retention for the slot ledger.

use std::sync::Arc;

use mockable::Clock;
use tracing::info;

use crate::domain::ports::BookingRepository;
use crate::domain::{Error, LaundryCalendar};

/// Deletes bookings old enough to be irrelevant.
///
/// The cutoff is yesterday in the house time zone: rows dated before it
/// go, so yesterday's bookings stay visible for a full day after the
/// slot passed.
pub struct DailyPurge {
    ledger: Arc<dyn BookingRepository>,
    calendar: LaundryCalendar,
    clock: Arc<dyn Clock>,
}

impl DailyPurge {
    /// Build a purge task.
    pub fn new(
        ledger: Arc<dyn BookingRepository>,
        calendar: LaundryCalendar,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            calendar,
            clock,
        }
    }

    /// How long to wait before the next pass: shortly after the next
    /// local midnight, when the cutoff date advances.
    pub fn until_next_run(&self) -> std::time::Duration {
        let now_local = self.calendar.now_local(self.clock.as_ref());
        let elapsed_today = now_local.time() - chrono::NaiveTime::MIN;
        let remaining = chrono::TimeDelta::hours(24) - elapsed_today
            + chrono::TimeDelta::seconds(30);
        remaining.to_std().unwrap_or(std::time::Duration::from_secs(60))
    }

    /// Run one purge pass; returns how many rows were deleted.
    pub async fn run_once(&self) -> Result<u64, Error> {
        let today = self.calendar.today(self.clock.as_ref());
        let Some(cutoff) = today.pred_opt() else {
            return Ok(0);
        };
        let deleted = self
            .ledger
            .purge_before(cutoff)
            .await?;
        if deleted > 0 {
            info!(%cutoff, deleted, "purged expired bookings");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OperatingHours;
    use crate::domain::ports::MockBookingRepository;
    use crate::test_support::MutableClock;
    use chrono::{NaiveDate, TimeZone, Utc};

    #[tokio::test]
    async fn purges_rows_dated_before_yesterday() {
        // 22:00 UTC on the 30th is already the 31st in Moscow.
        let clock = Arc::new(MutableClock::new(
            Utc.with_ymd_and_hms(2026, 8, 30, 22, 0, 0)
                .single()
                .expect("instant"),
        ));

        let mut ledger = MockBookingRepository::new();
        ledger
            .expect_purge_before()
            .times(1)
            .withf(|cutoff| *cutoff == NaiveDate::from_ymd_opt(2026, 8, 30).expect("date"))
            .return_once(|_| Ok(3));

        let purge = DailyPurge::new(
            Arc::new(ledger),
            LaundryCalendar::new(
                chrono_tz::Europe::Moscow,
                OperatingHours::new(9, 23).expect("window"),
            ),
            clock,
        );

        assert_eq!(purge.run_once().await.expect("purge succeeds"), 3);
    }

    #[tokio::test]
    async fn next_run_lands_just_past_local_midnight() {
        // 22:00 UTC on the 30th is 01:00 on the 31st in Moscow, so the
        // next run is 23 hours (plus slack) away.
        let clock = Arc::new(MutableClock::new(
            Utc.with_ymd_and_hms(2026, 8, 30, 22, 0, 0)
                .single()
                .expect("instant"),
        ));
        let purge = DailyPurge::new(
            Arc::new(MockBookingRepository::new()),
            LaundryCalendar::new(
                chrono_tz::Europe::Moscow,
                OperatingHours::new(9, 23).expect("window"),
            ),
            clock,
        );

        let wait = purge.until_next_run();
        assert_eq!(wait.as_secs(), 23 * 3600 + 30);
    }
}
