//! PostgreSQL-backed moderation store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ExternalId;
use crate::domain::ports::{BanRecord, ModerationRepository, ModerationStoreError};

use super::error_map::{map_diesel_error, map_pool_error};
use super::models::{BanRow, FailedAttemptRow};
use super::pool::DbPool;
use super::schema::{bans, failed_attempts};

fn map_pool(error: super::pool::PoolError) -> ModerationStoreError {
    map_pool_error(error, ModerationStoreError::connection)
}

fn map_diesel(error: diesel::result::Error) -> ModerationStoreError {
    map_diesel_error(
        error,
        ModerationStoreError::query,
        ModerationStoreError::connection,
    )
}

/// Diesel implementation of the moderation store port.
#[derive(Clone)]
pub struct DieselModerationRepository {
    pool: DbPool,
}

impl DieselModerationRepository {
    /// Create a repository over the shared pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ModerationRepository for DieselModerationRepository {
    async fn find_ban(
        &self,
        external: ExternalId,
    ) -> Result<Option<BanRecord>, ModerationStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let row: Option<BanRow> = bans::table
            .filter(bans::external_id.eq(external.as_i64()))
            .select(BanRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;
        Ok(row.map(BanRecord::from))
    }

    async fn upsert_ban(&self, record: &BanRecord) -> Result<(), ModerationStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let row = BanRow::from(record);
        diesel::insert_into(bans::table)
            .values(&row)
            .on_conflict(bans::external_id)
            .do_update()
            .set((
                bans::reason.eq(&row.reason),
                bans::banned_until.eq(row.banned_until),
                bans::banned_at.eq(row.banned_at),
            ))
            .execute(&mut conn)
            .await
            .map_err(map_diesel)?;
        Ok(())
    }

    async fn delete_ban(&self, external: ExternalId) -> Result<bool, ModerationStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let deleted = diesel::delete(bans::table.filter(bans::external_id.eq(external.as_i64())))
            .execute(&mut conn)
            .await
            .map_err(map_diesel)?;
        Ok(deleted > 0)
    }

    async fn list_bans(&self) -> Result<Vec<BanRecord>, ModerationStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let rows: Vec<BanRow> = bans::table
            .order(bans::banned_at.desc())
            .select(BanRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;
        Ok(rows.into_iter().map(BanRecord::from).collect())
    }

    async fn bump_failed_attempts(
        &self,
        external: ExternalId,
        now: DateTime<Utc>,
    ) -> Result<u32, ModerationStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let row: FailedAttemptRow = diesel::insert_into(failed_attempts::table)
            .values(&FailedAttemptRow {
                external_id: external.as_i64(),
                attempts: 1,
                last_attempt_at: now,
            })
            .on_conflict(failed_attempts::external_id)
            .do_update()
            .set((
                failed_attempts::attempts.eq(failed_attempts::attempts + 1),
                failed_attempts::last_attempt_at.eq(now),
            ))
            .returning(FailedAttemptRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel)?;
        Ok(u32::try_from(row.attempts).unwrap_or(0))
    }

    async fn reset_failed_attempts(
        &self,
        external: ExternalId,
    ) -> Result<(), ModerationStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        diesel::delete(failed_attempts::table.filter(failed_attempts::external_id.eq(external.as_i64())))
            .execute(&mut conn)
            .await
            .map_err(map_diesel)?;
        Ok(())
    }
}
