//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain services and ports, never on storage details.

use std::sync::Arc;

use crate::domain::ports::{ApplianceRepository, UserRepository};
use crate::domain::{AccessGuard, BookingService};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Reservation use-cases.
    pub bookings: Arc<BookingService>,
    /// Moderation gate and admin ban management.
    pub guard: Arc<AccessGuard>,
    /// Appliance catalog reads.
    pub appliances: Arc<dyn ApplianceRepository>,
    /// Resident store, for registration and identity resolution.
    pub users: Arc<dyn UserRepository>,
}
