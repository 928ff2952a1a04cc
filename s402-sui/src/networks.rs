//! Well-known Sui networks and the native coin.

use s402::network::NetworkId;

/// Chain family for every Sui network identifier.
pub const SUI_NAMESPACE: &str = "sui";

/// Coin type of native SUI, in its short form.
pub const SUI_COIN_TYPE: &str = "0x2::sui::SUI";

/// Decimal places of SUI. One SUI is 10^9 MIST.
pub const SUI_DECIMALS: u32 = 9;

/// Gas budget, in MIST, for a single payment transfer.
pub const DEFAULT_GAS_BUDGET: u64 = 10_000_000;

/// Static metadata for a public Sui network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuiNetworkInfo {
    /// Chain part of the network identifier (e.g., `"testnet"`).
    pub chain: &'static str,
    /// Public full node JSON-RPC endpoint.
    pub rpc_url: &'static str,
}

impl SuiNetworkInfo {
    /// Returns the `sui:<chain>` identifier.
    #[must_use]
    pub fn network_id(&self) -> NetworkId {
        NetworkId::new(SUI_NAMESPACE, self.chain)
    }
}

/// Networks with a known public full node.
pub static SUI_NETWORKS: &[SuiNetworkInfo] = &[
    SuiNetworkInfo {
        chain: "mainnet",
        rpc_url: "https://fullnode.mainnet.sui.io:443",
    },
    SuiNetworkInfo {
        chain: "testnet",
        rpc_url: "https://fullnode.testnet.sui.io:443",
    },
    SuiNetworkInfo {
        chain: "devnet",
        rpc_url: "https://fullnode.devnet.sui.io:443",
    },
    SuiNetworkInfo {
        chain: "localnet",
        rpc_url: "http://127.0.0.1:9000",
    },
];

/// Looks up a Sui network by identifier.
///
/// Returns `None` for other families and for unknown chains.
#[must_use]
pub fn sui_network(network: &NetworkId) -> Option<&'static SuiNetworkInfo> {
    if network.family() != SUI_NAMESPACE {
        return None;
    }
    SUI_NETWORKS.iter().find(|info| info.chain == network.chain())
}

/// Returns the public RPC endpoint for `network`, if one is known.
#[must_use]
pub fn default_rpc_url(network: &NetworkId) -> Option<&'static str> {
    sui_network(network).map(|info| info.rpc_url)
}
