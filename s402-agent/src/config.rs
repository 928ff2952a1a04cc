//! Command-line and environment configuration of the agent binary.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use s402::network::NetworkId;
use s402_sui::networks::{DEFAULT_GAS_BUDGET, default_rpc_url};
use s402_sui::{SuiRpcClient, SuiSigner};
use url::Url;

use crate::agent::AgentWallet;

/// Errors in the agent's startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `SUI_PRIVATE_KEY` does not load.
    #[error("SUI_PRIVATE_KEY: {0}")]
    InvalidKey(#[from] s402_sui::signer::SignerError),

    /// No `SUI_RPC_URL` and no public node for the network.
    #[error("no SUI_RPC_URL and no public node for {0}")]
    MissingRpcUrl(NetworkId),

    /// The RPC client cannot be built.
    #[error("SUI_RPC_URL client: {0}")]
    RpcClient(#[from] s402_sui::chain::RpcError),
}

/// x402 payment agent for Sui.
#[derive(Debug, Clone, Parser)]
#[command(name = "s402-agent", version, about)]
pub struct AgentConfig {
    /// Ed25519 key as 32-byte hex or base64. Without it the agent serves
    /// read-only endpoints and refuses to pay.
    #[arg(long, env = "SUI_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Network payments are made on.
    #[arg(long, env = "SUI_NETWORK", default_value = "sui:testnet")]
    pub network: NetworkId,

    /// Full node JSON-RPC endpoint. Defaults to the network's public node.
    #[arg(long, env = "SUI_RPC_URL")]
    pub rpc_url: Option<Url>,

    /// SQLite ledger path.
    #[arg(long, env = "AGENT_DB", default_value = "agent.db")]
    pub db: PathBuf,

    /// Spend ceiling in MIST, used until one is set through the API.
    #[arg(long, env = "MAX_SPEND_MIST", default_value_t = 1_000_000_000)]
    pub max_spend_mist: u128,

    /// Gas budget per payment in MIST.
    #[arg(long, env = "GAS_BUDGET", default_value_t = DEFAULT_GAS_BUDGET)]
    pub gas_budget: u64,

    /// Bind address.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Bind port.
    #[arg(long, env = "PORT", default_value_t = 4022)]
    pub port: u16,
}

impl AgentConfig {
    /// Returns the RPC endpoint: the configured one, else the public node.
    #[must_use]
    pub fn resolved_rpc_url(&self) -> Option<Url> {
        self.rpc_url.clone().or_else(|| {
            default_rpc_url(&self.network).and_then(|url| Url::parse(url).ok())
        })
    }

    /// Builds the wallet, or `None` when no key is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the key does not load or no RPC endpoint
    /// is known for the network.
    pub fn wallet(&self) -> Result<Option<AgentWallet>, ConfigError> {
        let Some(key) = self
            .private_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
        else {
            return Ok(None);
        };
        let signer = SuiSigner::from_key_material(key)?;
        let rpc_url = self
            .resolved_rpc_url()
            .ok_or_else(|| ConfigError::MissingRpcUrl(self.network.clone()))?;
        Ok(Some(AgentWallet::sui(
            signer,
            SuiRpcClient::new(rpc_url)?,
            self.network.clone(),
            self.gas_budget,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0x0101010101010101010101010101010101010101010101010101010101010101";

    #[test]
    fn test_defaults() {
        let config = AgentConfig::try_parse_from(["s402-agent"]).unwrap();
        assert_eq!(config.network, NetworkId::new("sui", "testnet"));
        assert_eq!(config.max_spend_mist, 1_000_000_000);
        assert_eq!(config.gas_budget, 10_000_000);
        assert_eq!(config.db, PathBuf::from("agent.db"));
        assert_eq!(
            config.resolved_rpc_url().unwrap().as_str(),
            "https://fullnode.testnet.sui.io/"
        );
    }

    #[test]
    fn test_wallet_from_key() {
        let config =
            AgentConfig::try_parse_from(["s402-agent", "--private-key", KEY]).unwrap();
        let wallet = config.wallet().unwrap().unwrap();
        assert_eq!(
            wallet.address(),
            SuiSigner::from_key_material(KEY).unwrap().address()
        );
    }

    #[test]
    fn test_wallet_errors() {
        let config =
            AgentConfig::try_parse_from(["s402-agent", "--private-key", "nonsense"]).unwrap();
        assert!(matches!(config.wallet(), Err(ConfigError::InvalidKey(_))));

        let config = AgentConfig::try_parse_from([
            "s402-agent",
            "--private-key",
            KEY,
            "--network",
            "sui:private",
        ])
        .unwrap();
        assert!(matches!(config.wallet(), Err(ConfigError::MissingRpcUrl(_))));

        let config = AgentConfig::try_parse_from(["s402-agent", "--private-key", " "]).unwrap();
        assert!(config.wallet().unwrap().is_none());
    }

    #[test]
    fn test_rejects_malformed_network() {
        assert!(AgentConfig::try_parse_from(["s402-agent", "--network", "testnet"]).is_err());
    }
}
