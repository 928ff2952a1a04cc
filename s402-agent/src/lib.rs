//! Autonomous x402 payment agent for Sui.
//!
//! The agent fetches HTTP resources on a caller's behalf. When a resource
//! answers `402 Payment Required`, the agent pays it with a signed Sui
//! transfer and retries, as long as the payment fits under a persistent
//! spend ceiling. Every payment is recorded in a SQLite ledger.
//!
//! # Modules
//!
//! - [`agent`] - [`PaymentAgent`] and its operations
//! - [`config`] - clap configuration of the binary
//! - [`error`] - [`AgentError`] codes and HTTP statuses
//! - [`gate`] - Readiness gate between startup and the HTTP surface
//! - [`ledger`] - SQLite spending ledger
//! - [`routes`] - Axum router

pub mod agent;
pub mod config;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod routes;

pub use agent::{AgentWallet, FetchRequest, PaymentAgent};
pub use error::AgentError;
pub use gate::AgentGate;
pub use routes::agent_router;
