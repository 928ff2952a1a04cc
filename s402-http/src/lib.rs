#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP transport for s402 payments.
//!
//! A resource server answers an unpaid request with `402` and a
//! `PAYMENT-REQUIRED` header. The client retries with `PAYMENT-SIGNATURE`,
//! and a successful response carries `PAYMENT-RESPONSE` with the settlement
//! digest. This crate encodes and decodes those headers and talks to a
//! remote facilitator.
//!
//! # Modules
//!
//! - [`constants`] - Header names and status codes
//! - [`error`] - [`HttpError`](error::HttpError)
//! - [`facilitator`] - [`HttpFacilitatorClient`](facilitator::HttpFacilitatorClient)
//! - [`headers`] - Base64 JSON header codecs and 402 challenge parsing
//!
//! # Feature Flags
//!
//! - `telemetry` - Tracing events

pub mod constants;
pub mod error;
pub mod facilitator;
pub mod headers;

pub use error::HttpError;
