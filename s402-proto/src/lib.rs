//! Wire format types for the x402 payment protocol as spoken on Sui.
//!
//! This crate defines the serialization-level data structures exchanged
//! between clients, resource servers, and facilitators. It depends only on
//! `serde` and `serde_json` and is the shared vocabulary of the s402 stack.
//!
//! # Modules
//!
//! - [`v2`]: Payment types (`PaymentRequirements`, `PaymentPayload`, etc.)
//! - [`responses`]: Facilitator responses (`VerifyResponse`, `SettleResponse`, etc.)
//! - [`helpers`]: Version detection, parsing, and requirement matching

pub mod helpers;
pub mod responses;
pub mod v2;

pub use responses::{SettleResponse, SupportedKind, SupportedResponse, VerifyResponse};
pub use v2::{
    PaymentPayload, PaymentRequired, PaymentRequirements, ResourceInfo, SettleRequest,
    VerifyRequest,
};

/// Current protocol version.
pub const X402_VERSION: u32 = 2;

/// Network identifier in `family:chain` form (e.g., `"sui:testnet"`).
pub type Network = String;

/// Errors that can occur when parsing x402 protocol messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The `x402Version` field is missing from the JSON data.
    #[error("missing x402Version field")]
    MissingVersion,

    /// The `x402Version` field has an unsupported value.
    #[error("unsupported x402Version: {0}")]
    UnsupportedVersion(u64),

    /// A required field is missing from the JSON data.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// JSON deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
