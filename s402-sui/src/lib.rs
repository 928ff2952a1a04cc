#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Sui chain support for s402.
//!
//! Implements the x402 "exact" scheme for Sui: a client signs a plain coin
//! transfer to the merchant, and a facilitator verifies it by dry run and
//! settles it by execution. Both sides talk to a full node over JSON-RPC;
//! no Move or BCS tooling is needed locally because transactions are built
//! by the node's `unsafe_paySui` / `unsafe_pay` builders and signed here.
//!
//! # Modules
//!
//! - [`chain`] - Addresses, coin types, and the [`SuiRpc`](chain::SuiRpc) seam
//! - [`exact`] - Client, facilitator, and server adapters
//! - [`networks`] - Known networks, endpoints, and SUI constants
//! - [`signer`] - Ed25519 key loading and transaction signing
//!
//! # Feature Flags
//!
//! - `client` - [`ExactSuiClient`](exact::ExactSuiClient)
//! - `facilitator` - [`ExactSuiFacilitator`](exact::ExactSuiFacilitator)
//! - `server` - [`ExactSuiServer`](exact::ExactSuiServer)
//! - `telemetry` - Tracing spans and events
//!
//! # Example
//!
//! ```rust
//! use s402_sui::signer::SuiSigner;
//!
//! let signer: SuiSigner = "0x0101010101010101010101010101010101010101010101010101010101010101"
//!     .parse()
//!     .unwrap();
//! assert!(signer.address().to_string().starts_with("0x"));
//! ```

pub mod chain;
pub mod exact;
pub mod networks;
pub mod signer;

pub use chain::{SuiAddress, SuiRpc, SuiRpcClient};
pub use exact::SuiExact;
pub use signer::SuiSigner;
