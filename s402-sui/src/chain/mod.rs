//! Sui chain access.
//!
//! - [`types`] - Addresses, coin types, coins, and transaction outcomes
//! - [`rpc`] - The [`SuiRpc`] seam the scheme adapters talk through
//! - [`client`] - [`SuiRpcClient`], a JSON-RPC implementation over `reqwest`

pub mod client;
pub mod rpc;
pub mod types;

pub use client::*;
pub use rpc::*;
pub use types::*;
