//! PostgreSQL-backed reminder sent-log.
//!
//! Inserts race through the `(user_id, appliance_id, date, hour,
//! lead_minutes)` unique index; `ON CONFLICT DO NOTHING` turns the loss
//! of that race into the `false` return the dispatcher expects.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ReminderKey;
use crate::domain::ports::{ReminderLog, ReminderLogError};

use super::error_map::{map_diesel_error, map_pool_error};
use super::models::NewReminderSentRow;
use super::pool::DbPool;
use super::schema::reminders_sent;

fn map_pool(error: super::pool::PoolError) -> ReminderLogError {
    map_pool_error(error, ReminderLogError::connection)
}

fn map_diesel(error: diesel::result::Error) -> ReminderLogError {
    map_diesel_error(error, ReminderLogError::query, ReminderLogError::connection)
}

/// Diesel implementation of the sent-log port.
#[derive(Clone)]
pub struct DieselReminderLog {
    pool: DbPool,
}

impl DieselReminderLog {
    /// Create a log over the shared pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReminderLog for DieselReminderLog {
    async fn record_sent(&self, key: &ReminderKey) -> Result<bool, ReminderLogError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let inserted = diesel::insert_into(reminders_sent::table)
            .values(&NewReminderSentRow {
                user_id: key.user.as_i64(),
                appliance_id: key.appliance.as_i64(),
                date: key.date,
                hour: i16::from(key.hour),
                lead_minutes: i32::try_from(key.lead_minutes).unwrap_or(i32::MAX),
                sent_at: Utc::now(),
            })
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map_err(map_diesel)?;
        Ok(inserted > 0)
    }

    async fn was_sent(&self, key: &ReminderKey) -> Result<bool, ReminderLogError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let count: i64 = reminders_sent::table
            .filter(
                reminders_sent::user_id
                    .eq(key.user.as_i64())
                    .and(reminders_sent::appliance_id.eq(key.appliance.as_i64()))
                    .and(reminders_sent::date.eq(key.date))
                    .and(reminders_sent::hour.eq(i16::from(key.hour)))
                    .and(reminders_sent::lead_minutes.eq(i32::try_from(key.lead_minutes).unwrap_or(i32::MAX))),
            )
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel)?;
        Ok(count > 0)
    }
}
