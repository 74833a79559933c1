//! Internal Diesel row structs.
//!
//! Implementation details of the persistence layer; row types stay
//! private to it and convert into domain types at the adapter boundary.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;

use crate::domain::ports::{ArmedTimer, BanRecord};
use crate::domain::{
    Appliance, ApplianceId, ApplianceKind, Booking, BookingId, ExternalId, TimerKey, User, UserId,
};

use super::schema::{appliances, bans, bookings, failed_attempts, reminder_timers, reminders_sent, users};

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: i64,
    pub external_id: i64,
    pub surname: String,
    pub room: String,
    pub handle: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::new(row.id),
            external_id: ExternalId::new(row.external_id),
            surname: row.surname,
            room: row.room,
            handle: row.handle,
        }
    }
}

/// Insertable struct for creating residents.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub external_id: i64,
    pub surname: &'a str,
    pub room: &'a str,
    pub handle: Option<&'a str>,
}

/// Row struct for reading from the appliances table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = appliances)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ApplianceRow {
    pub id: i64,
    pub kind: String,
    pub name: String,
}

impl ApplianceRow {
    /// Convert to the domain type; fails on a kind string the domain
    /// does not know.
    pub fn into_domain(self) -> Result<Appliance, String> {
        let kind = ApplianceKind::parse(&self.kind)
            .ok_or_else(|| format!("unknown appliance kind {:?} in row {}", self.kind, self.id))?;
        Ok(Appliance {
            id: ApplianceId::new(self.id),
            kind,
            name: self.name,
        })
    }
}

/// Insertable struct for seeding the appliance catalog.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = appliances)]
pub(crate) struct NewApplianceRow<'a> {
    pub kind: &'a str,
    pub name: &'a str,
}

/// Row struct for reading from the bookings table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct BookingRow {
    pub id: i64,
    pub user_id: i64,
    pub appliance_id: i64,
    pub date: NaiveDate,
    pub hour: i16,
    pub created_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Self {
            id: BookingId::new(row.id),
            user_id: UserId::new(row.user_id),
            appliance_id: ApplianceId::new(row.appliance_id),
            date: row.date,
            // hour is constrained to 0..=23 by the schema check.
            hour: u8::try_from(row.hour).unwrap_or(0),
            created_at: row.created_at,
        }
    }
}

/// Insertable struct for creating bookings.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bookings)]
pub(crate) struct NewBookingRow {
    pub user_id: i64,
    pub appliance_id: i64,
    pub date: NaiveDate,
    pub hour: i16,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for the reminder sent-log.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = reminders_sent)]
pub(crate) struct NewReminderSentRow {
    pub user_id: i64,
    pub appliance_id: i64,
    pub date: NaiveDate,
    pub hour: i16,
    pub lead_minutes: i32,
    pub sent_at: DateTime<Utc>,
}

/// Row struct for reading from the reminder_timers table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = reminder_timers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ReminderTimerRow {
    pub user_id: i64,
    pub appliance_id: i64,
    pub date: NaiveDate,
    pub hour: i16,
    pub lead_minutes: i32,
    pub fire_at: DateTime<Utc>,
}

impl From<ReminderTimerRow> for ArmedTimer {
    fn from(row: ReminderTimerRow) -> Self {
        Self {
            key: TimerKey {
                user: UserId::new(row.user_id),
                appliance: ApplianceId::new(row.appliance_id),
                date: row.date,
                hour: u8::try_from(row.hour).unwrap_or(0),
            },
            lead_minutes: u32::try_from(row.lead_minutes).unwrap_or(0),
            fire_at: row.fire_at,
        }
    }
}

/// Insertable struct for arming durable timers.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = reminder_timers)]
pub(crate) struct NewReminderTimerRow {
    pub user_id: i64,
    pub appliance_id: i64,
    pub date: NaiveDate,
    pub hour: i16,
    pub lead_minutes: i32,
    pub fire_at: DateTime<Utc>,
}

/// Row struct for reading from the bans table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = bans)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct BanRow {
    pub external_id: i64,
    pub reason: String,
    pub banned_until: Option<DateTime<Utc>>,
    pub banned_at: DateTime<Utc>,
}

impl From<BanRow> for BanRecord {
    fn from(row: BanRow) -> Self {
        Self {
            external_id: ExternalId::new(row.external_id),
            reason: row.reason,
            banned_until: row.banned_until,
            banned_at: row.banned_at,
        }
    }
}

impl From<&BanRecord> for BanRow {
    fn from(record: &BanRecord) -> Self {
        Self {
            external_id: record.external_id.as_i64(),
            reason: record.reason.clone(),
            banned_until: record.banned_until,
            banned_at: record.banned_at,
        }
    }
}

/// Row struct for the failed-attempt counter.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = failed_attempts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct FailedAttemptRow {
    pub external_id: i64,
    pub attempts: i32,
    pub last_attempt_at: DateTime<Utc>,
}
