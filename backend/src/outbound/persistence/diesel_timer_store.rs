//! PostgreSQL-backed durable timer store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::TimerKey;
use crate::domain::ports::{ArmedTimer, ReminderTimerStore, TimerStoreError};

use super::error_map::{map_diesel_error, map_pool_error};
use super::models::{NewReminderTimerRow, ReminderTimerRow};
use super::pool::DbPool;
use super::schema::reminder_timers;

fn map_pool(error: super::pool::PoolError) -> TimerStoreError {
    map_pool_error(error, TimerStoreError::connection)
}

fn map_diesel(error: diesel::result::Error) -> TimerStoreError {
    map_diesel_error(error, TimerStoreError::query, TimerStoreError::connection)
}

type KeyFilter = diesel::dsl::And<
    diesel::dsl::And<
        diesel::dsl::And<
            diesel::dsl::Eq<reminder_timers::user_id, i64>,
            diesel::dsl::Eq<reminder_timers::appliance_id, i64>,
        >,
        diesel::dsl::Eq<reminder_timers::date, chrono::NaiveDate>,
    >,
    diesel::dsl::Eq<reminder_timers::hour, i16>,
>;

fn key_filter(key: &TimerKey) -> KeyFilter {
    reminder_timers::user_id
        .eq(key.user.as_i64())
        .and(reminder_timers::appliance_id.eq(key.appliance.as_i64()))
        .and(reminder_timers::date.eq(key.date))
        .and(reminder_timers::hour.eq(i16::from(key.hour)))
}

/// Diesel implementation of the durable timer port.
#[derive(Clone)]
pub struct DieselTimerStore {
    pool: DbPool,
}

impl DieselTimerStore {
    /// Create a store over the shared pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReminderTimerStore for DieselTimerStore {
    async fn arm(
        &self,
        key: &TimerKey,
        lead_minutes: u32,
        fire_at: DateTime<Utc>,
    ) -> Result<(), TimerStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        // Replace-not-duplicate: delete then insert under the unique
        // (user, appliance, date, hour) index.
        diesel::delete(reminder_timers::table.filter(key_filter(key)))
            .execute(&mut conn)
            .await
            .map_err(map_diesel)?;
        diesel::insert_into(reminder_timers::table)
            .values(&NewReminderTimerRow {
                user_id: key.user.as_i64(),
                appliance_id: key.appliance.as_i64(),
                date: key.date,
                hour: i16::from(key.hour),
                lead_minutes: i32::try_from(lead_minutes).unwrap_or(i32::MAX),
                fire_at,
            })
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map_err(map_diesel)?;
        Ok(())
    }

    async fn disarm(&self, key: &TimerKey) -> Result<(), TimerStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        diesel::delete(reminder_timers::table.filter(key_filter(key)))
            .execute(&mut conn)
            .await
            .map_err(map_diesel)?;
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<ArmedTimer>, TimerStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let rows: Vec<ReminderTimerRow> = reminder_timers::table
            .order(reminder_timers::fire_at.asc())
            .select(ReminderTimerRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;
        Ok(rows.into_iter().map(ArmedTimer::from).collect())
    }
}
