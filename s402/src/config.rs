//! Configuration for protected resources.

use serde::{Deserialize, Serialize};

use crate::network::NetworkId;
use crate::scheme::Price;

/// Settlement window used when a resource does not set one.
pub const DEFAULT_MAX_TIMEOUT_SECONDS: u64 = 300;

/// What a resource server charges for one endpoint.
///
/// # Example
///
/// ```rust
/// use s402::config::ResourceConfig;
///
/// let config: ResourceConfig = serde_json::from_value(serde_json::json!({
///     "payTo": "0x7d20dcdb2bca4f508ea9613994683eb4e76e9c4ed371169677c1be02aaf0b58e",
///     "price": "0.01",
///     "network": "sui:testnet"
/// }))
/// .unwrap();
/// assert_eq!(config.network.chain(), "testnet");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfig {
    /// Recipient address.
    pub pay_to: String,

    /// Price for the resource, in display units or as a base-unit amount.
    pub price: Price,

    /// Network the payment settles on.
    pub network: NetworkId,

    /// Upper bound on settlement time. Defaults to
    /// [`DEFAULT_MAX_TIMEOUT_SECONDS`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_timeout_seconds: Option<u64>,
}
