//! PostgreSQL-backed resident store.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::info;

use crate::domain::ports::{UserRepository, UserStoreError};
use crate::domain::{ExternalId, User, UserId};

use super::error_map::{map_diesel_error, map_pool_error};
use super::models::{NewUserRow, UserRow};
use super::pool::DbPool;
use super::schema::{bookings, users};

fn map_pool(error: super::pool::PoolError) -> UserStoreError {
    map_pool_error(error, UserStoreError::connection)
}

fn map_diesel(error: diesel::result::Error) -> UserStoreError {
    map_diesel_error(error, UserStoreError::query, UserStoreError::connection)
}

/// Diesel implementation of the resident store port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a repository over the shared pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn upsert<'a>(
        &self,
        external: ExternalId,
        surname: &str,
        room: &str,
        handle: Option<&'a str>,
    ) -> Result<User, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let row: UserRow = diesel::insert_into(users::table)
            .values(&NewUserRow {
                external_id: external.as_i64(),
                surname,
                room,
                handle,
            })
            .on_conflict(users::external_id)
            .do_update()
            .set((
                users::surname.eq(surname),
                users::room.eq(room),
                users::handle.eq(handle),
            ))
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel)?;
        Ok(row.into())
    }

    async fn find_by_external_id(
        &self,
        external: ExternalId,
    ) -> Result<Option<User>, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let row: Option<UserRow> = users::table
            .filter(users::external_id.eq(external.as_i64()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;
        Ok(row.map(User::from))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let row: Option<UserRow> = users::table
            .filter(users::id.eq(id.as_i64()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;
        Ok(row.map(User::from))
    }

    async fn ensure_by_natural_key(
        &self,
        surname: &str,
        room: &str,
    ) -> Result<User, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let existing: Option<UserRow> = users::table
            .filter(users::surname.eq(surname).and(users::room.eq(room)))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;
        if let Some(row) = existing {
            return Ok(row.into());
        }

        let stub_external = ExternalId::stub_for(surname, room);
        let row: UserRow = diesel::insert_into(users::table)
            .values(&NewUserRow {
                external_id: stub_external.as_i64(),
                surname,
                room,
                handle: None,
            })
            .on_conflict(users::external_id)
            .do_update()
            .set((users::surname.eq(surname), users::room.eq(room)))
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel)?;
        info!(external = %stub_external, surname, room, "stub resident created");
        Ok(row.into())
    }

    async fn merge_stub_into(
        &self,
        external: ExternalId,
        surname: &str,
        room: &str,
    ) -> Result<User, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        // Upsert, booking reassignment, and stub deletion commit
        // together or not at all; concurrent booking reads never see a
        // half-merged resident.
        let row: UserRow = conn
            .transaction(|conn| {
                async move {
                    let real: UserRow = diesel::insert_into(users::table)
                        .values(&NewUserRow {
                            external_id: external.as_i64(),
                            surname,
                            room,
                            handle: None,
                        })
                        .on_conflict(users::external_id)
                        .do_update()
                        .set((users::surname.eq(surname), users::room.eq(room)))
                        .returning(UserRow::as_returning())
                        .get_result(conn)
                        .await?;

                    let stub: Option<UserRow> = users::table
                        .filter(
                            users::surname
                                .eq(surname)
                                .and(users::room.eq(room))
                                .and(users::external_id.lt(0))
                                .and(users::id.ne(real.id)),
                        )
                        .select(UserRow::as_select())
                        .first(conn)
                        .await
                        .optional()?;

                    if let Some(stub) = stub {
                        diesel::update(bookings::table.filter(bookings::user_id.eq(stub.id)))
                            .set(bookings::user_id.eq(real.id))
                            .execute(conn)
                            .await?;
                        diesel::delete(users::table.filter(users::id.eq(stub.id)))
                            .execute(conn)
                            .await?;
                    }

                    Ok::<_, diesel::result::Error>(real)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel)?;

        info!(%external, surname, room, "resident merged");
        Ok(row.into())
    }
}
