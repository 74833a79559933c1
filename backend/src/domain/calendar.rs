//! Civil time for the laundry room.
//!
//! Dates and hours are stored zone-less; the configured time zone is
//! applied only when a slot is compared against "now". All reads of the
//! current time go through an injected [`mockable::Clock`] so the services
//! stay testable.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use mockable::Clock;

/// The inclusive hour window during which slots may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingHours {
    first: u8,
    last: u8,
}

/// Validation failure for an operating-hour window.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid operating hours: first {first} must be <= last {last} and both < 24")]
pub struct InvalidOperatingHours {
    /// Requested first hour.
    pub first: u8,
    /// Requested last hour.
    pub last: u8,
}

impl OperatingHours {
    /// Build a window covering `first..=last` hours of the day.
    pub fn new(first: u8, last: u8) -> Result<Self, InvalidOperatingHours> {
        if first > last || last > 23 {
            return Err(InvalidOperatingHours { first, last });
        }
        Ok(Self { first, last })
    }

    /// Whether `hour` lies inside the window.
    pub fn contains(self, hour: u8) -> bool {
        (self.first..=self.last).contains(&hour)
    }

    /// First bookable hour.
    pub fn first(self) -> u8 {
        self.first
    }

    /// Last bookable hour.
    pub fn last(self) -> u8 {
        self.last
    }

    /// All hours in the window, ascending.
    pub fn iter(self) -> impl Iterator<Item = u8> {
        self.first..=self.last
    }
}

/// Converts civil slot coordinates into instants in the configured zone.
#[derive(Debug, Clone)]
pub struct LaundryCalendar {
    tz: Tz,
    hours: OperatingHours,
}

impl LaundryCalendar {
    /// Build a calendar for the given zone and operating window.
    pub fn new(tz: Tz, hours: OperatingHours) -> Self {
        Self { tz, hours }
    }

    /// The operating-hour window.
    pub fn operating_hours(&self) -> OperatingHours {
        self.hours
    }

    /// Current instant translated into the house time zone.
    pub fn now_local(&self, clock: &dyn Clock) -> DateTime<Tz> {
        clock.utc().with_timezone(&self.tz)
    }

    /// Today's civil date in the house time zone.
    pub fn today(&self, clock: &dyn Clock) -> NaiveDate {
        self.now_local(clock).date_naive()
    }

    /// The instant a slot starts, or `None` when the civil time does not
    /// exist in the zone (spring-forward gap) or the hour is malformed.
    pub fn slot_start(&self, date: NaiveDate, hour: u8) -> Option<DateTime<Utc>> {
        let time = NaiveTime::from_hms_opt(u32::from(hour), 0, 0)?;
        self.tz
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|instant| instant.with_timezone(&Utc))
    }

    /// When the reminder for a slot should fire.
    pub fn fire_at(&self, date: NaiveDate, hour: u8, lead_minutes: u32) -> Option<DateTime<Utc>> {
        self.slot_start(date, hour)
            .map(|start| start - TimeDelta::minutes(i64::from(lead_minutes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MutableClock;
    use chrono::Timelike;

    fn calendar() -> LaundryCalendar {
        LaundryCalendar::new(
            chrono_tz::Europe::Moscow,
            OperatingHours::new(9, 23).expect("window"),
        )
    }

    #[test]
    fn operating_hours_reject_inverted_windows() {
        assert!(OperatingHours::new(23, 9).is_err());
        assert!(OperatingHours::new(9, 24).is_err());
    }

    #[test]
    fn operating_hours_iterate_inclusively() {
        let hours: Vec<u8> = OperatingHours::new(9, 11).expect("window").iter().collect();
        assert_eq!(hours, vec![9, 10, 11]);
    }

    #[test]
    fn slot_start_applies_the_house_zone() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 30).expect("date");
        let start = calendar().slot_start(date, 12).expect("instant");
        // Moscow is UTC+3 year-round.
        assert_eq!(start.hour(), 9);
    }

    #[test]
    fn fire_at_subtracts_the_lead_time() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 30).expect("date");
        let cal = calendar();
        let start = cal.slot_start(date, 12).expect("instant");
        let fire = cal.fire_at(date, 12, 30).expect("instant");
        assert_eq!(start - fire, TimeDelta::minutes(30));
    }

    #[test]
    fn today_follows_the_injected_clock() {
        let clock = MutableClock::new(
            Utc.with_ymd_and_hms(2026, 8, 30, 22, 0, 0)
                .single()
                .expect("instant"),
        );
        // 22:00 UTC is already the next civil day in Moscow.
        assert_eq!(
            calendar().today(&clock),
            NaiveDate::from_ymd_opt(2026, 8, 31).expect("date")
        );
    }
}
