#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for x402 payments settled on Sui.
//!
//! This crate holds the chain-agnostic pieces of the s402 stack: network and
//! scheme identifiers, the three scheme adapter traits, the facilitator
//! routing table, and price conversion. Chain support lives in `s402-sui`.
//!
//! # Overview
//!
//! A client requests a paid resource and receives `402 Payment Required`
//! with payment requirements. It builds and signs a transfer, attaches it to
//! a retried request, and the resource server asks a facilitator to verify
//! (by simulation) and settle (by broadcast) that transfer.
//!
//! # Modules
//!
//! - [`amount`] - Display-unit to base-unit price conversion
//! - [`config`] - Protected resource configuration
//! - [`encoding`] - Base64 helpers
//! - [`error`] - Reason codes, payment problems, client and price errors
//! - [`network`] - `family:chain` network identifiers
//! - [`scheme`] - Adapter traits and the facilitator registry
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod amount;
pub mod config;
pub mod encoding;
pub mod error;
pub mod network;
pub mod scheme;

pub use s402_proto as proto;
pub use s402_proto::{
    PaymentPayload, PaymentRequired, PaymentRequirements, SettleResponse, SupportedKind,
    SupportedResponse, VerifyResponse, X402_VERSION,
};
