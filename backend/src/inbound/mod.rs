//! Inbound adapters that translate external requests into domain service
//! calls while keeping framework details at the edge.
//!
//! HTTP handlers live under [`http`]; the chat front end talks to this
//! API through its own gateway process.

pub mod http;
