//! Mediagate API Library
//!
//! The gateway HTTP service: access descriptor issuance for both storage
//! backends, plus the local backend's upload/download fulfillment endpoints.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;
