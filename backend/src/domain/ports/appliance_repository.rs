//! Port abstraction for the appliance catalog.

use async_trait::async_trait;

use crate::domain::{Appliance, ApplianceId, ApplianceKind};

use super::define_store_error;

define_store_error! {
    /// Failures raised by appliance catalog adapters.
    pub enum ApplianceStoreError {
        /// Catalog connection could not be established.
        Connection { message: String } => "appliance catalog connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "appliance catalog query failed: {message}",
    }
}

/// Read-mostly catalog of appliances, seeded once at startup.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApplianceRepository: Send + Sync {
    /// Insert the given catalog when the store holds no appliances yet;
    /// returns how many rows were created (zero when already seeded).
    async fn seed_if_empty(
        &self,
        catalog: &[(ApplianceKind, String)],
    ) -> Result<usize, ApplianceStoreError>;

    /// All appliances, ordered by kind then id.
    async fn list(&self) -> Result<Vec<Appliance>, ApplianceStoreError>;

    /// Fetch one appliance by identifier.
    async fn find(&self, id: ApplianceId) -> Result<Option<Appliance>, ApplianceStoreError>;
}
