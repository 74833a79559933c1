//! Port abstraction for resident persistence.
//!
//! Besides plain lookups this port owns the stub-user lifecycle: an
//! administrator can pre-register a resident by surname and room, which
//! creates a stub with a synthetic external id; once the real chat
//! identity registers, [`UserRepository::merge_stub_into`] reassigns the
//! stub's bookings and deletes the stub atomically, so concurrent
//! booking reads never observe a half-merged state.

use async_trait::async_trait;

use crate::domain::{ExternalId, User, UserId};

use super::define_store_error;

define_store_error! {
    /// Failures raised by user store adapters.
    pub enum UserStoreError {
        /// User store connection could not be established.
        Connection { message: String } => "user store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user store query failed: {message}",
    }
}

/// Durable storage of residents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert or update a resident keyed by external identity.
    async fn upsert<'a>(
        &self,
        external: ExternalId,
        surname: &str,
        room: &str,
        handle: Option<&'a str>,
    ) -> Result<User, UserStoreError>;

    /// Fetch a resident by external identity.
    async fn find_by_external_id(
        &self,
        external: ExternalId,
    ) -> Result<Option<User>, UserStoreError>;

    /// Fetch a resident by internal identifier.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserStoreError>;

    /// Fetch or create the resident for a natural key. A missing resident
    /// is created as a stub with a synthetic external id.
    async fn ensure_by_natural_key(&self, surname: &str, room: &str)
    -> Result<User, UserStoreError>;

    /// Merge any stub matching the natural key into the real resident.
    ///
    /// Upserts the real resident by external id, reassigns the stub's
    /// bookings to it, and deletes the stub row in one transaction.
    /// When no stub exists this degenerates to a plain upsert.
    async fn merge_stub_into(
        &self,
        external: ExternalId,
        surname: &str,
        room: &str,
    ) -> Result<User, UserStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_passes_the_borrowed_handle_through() {
        let mut repo = MockUserRepository::new();
        repo.expect_upsert()
            .withf(|_, _, _, handle| *handle == Some("ivanova"))
            .returning(|external, surname, room, handle| {
                Ok(User {
                    id: UserId::new(1),
                    external_id: external,
                    surname: surname.to_owned(),
                    room: room.to_owned(),
                    handle: handle.map(str::to_owned),
                })
            });

        let user = repo
            .upsert(ExternalId::new(7), "Ivanova", "214", Some("ivanova"))
            .await
            .expect("upsert");
        assert_eq!(user.handle.as_deref(), Some("ivanova"));
    }
}
