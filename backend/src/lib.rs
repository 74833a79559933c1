//! Shared-laundry booking backend.
//!
//! The crate is laid out hexagonally: `domain` holds the booking and
//! reminder services plus the ports they drive, `outbound` holds the
//! persistence and notification adapters, `inbound` the HTTP surface, and
//! `server` the wiring that assembles a running service from configuration.

pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod server;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
