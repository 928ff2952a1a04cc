//! x402 facilitator service for Sui.
//!
//! Verifies payments by dry run and settles them by execution, behind the
//! three facilitator endpoints plus a health probe.
//!
//! # Modules
//!
//! - [`config`] - TOML configuration with environment variable expansion
//! - [`error`] - HTTP error responses
//! - [`handlers`] - Axum route handlers and router builder
//! - [`registry`] - Builds the routing table from configuration

pub mod config;
pub mod error;
pub mod handlers;
pub mod registry;

pub use handlers::{FacilitatorState, facilitator_router};
pub use registry::build_registry;
