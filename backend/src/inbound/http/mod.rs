//! HTTP inbound adapter exposing REST endpoints.

pub mod admin;
pub mod appliances;
pub mod bookings;
pub mod error;
pub mod health;
pub mod state;
pub mod users;

pub use crate::domain::ApiResult;
