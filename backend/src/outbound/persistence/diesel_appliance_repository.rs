//! PostgreSQL-backed appliance catalog.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::info;

use crate::domain::ports::{ApplianceRepository, ApplianceStoreError};
use crate::domain::{Appliance, ApplianceId, ApplianceKind};

use super::error_map::{map_diesel_error, map_pool_error};
use super::models::{ApplianceRow, NewApplianceRow};
use super::pool::DbPool;
use super::schema::appliances;

fn map_pool(error: super::pool::PoolError) -> ApplianceStoreError {
    map_pool_error(error, ApplianceStoreError::connection)
}

fn map_diesel(error: diesel::result::Error) -> ApplianceStoreError {
    map_diesel_error(
        error,
        ApplianceStoreError::query,
        ApplianceStoreError::connection,
    )
}

/// Diesel implementation of the appliance catalog port.
#[derive(Clone)]
pub struct DieselApplianceRepository {
    pool: DbPool,
}

impl DieselApplianceRepository {
    /// Create a repository over the shared pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplianceRepository for DieselApplianceRepository {
    async fn seed_if_empty(
        &self,
        catalog: &[(ApplianceKind, String)],
    ) -> Result<usize, ApplianceStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        // The emptiness check and the insert share one transaction so
        // two racing instances cannot both seed.
        let seeded = conn
            .transaction(|conn| {
                async move {
                    let existing: i64 = appliances::table.count().get_result(conn).await?;
                    if existing > 0 {
                        return Ok(0);
                    }
                    let rows: Vec<NewApplianceRow<'_>> = catalog
                        .iter()
                        .map(|(kind, name)| NewApplianceRow {
                            kind: kind.as_str(),
                            name,
                        })
                        .collect();
                    diesel::insert_into(appliances::table)
                        .values(&rows)
                        .execute(conn)
                        .await
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel)?;

        if seeded > 0 {
            info!(seeded, "appliance catalog seeded");
        }
        Ok(seeded)
    }

    async fn list(&self) -> Result<Vec<Appliance>, ApplianceStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let rows: Vec<ApplianceRow> = appliances::table
            .order((appliances::kind.asc(), appliances::id.asc()))
            .select(ApplianceRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;
        rows.into_iter()
            .map(|row| row.into_domain().map_err(ApplianceStoreError::query))
            .collect()
    }

    async fn find(&self, id: ApplianceId) -> Result<Option<Appliance>, ApplianceStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let row: Option<ApplianceRow> = appliances::table
            .filter(appliances::id.eq(id.as_i64()))
            .select(ApplianceRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;
        row.map(|row| row.into_domain().map_err(ApplianceStoreError::query))
            .transpose()
    }
}
