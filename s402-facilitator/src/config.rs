//! Facilitator server configuration.
//!
//! Loads a TOML file whose string values may reference the environment as
//! `$VAR` or `${VAR}`.
//!
//! # Example Configuration
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 4021
//!
//! [networks."sui:testnet"]
//! signer_private_key = "$SUI_FACILITATOR_KEY"
//!
//! [networks."sui:mainnet"]
//! rpc_url = "https://fullnode.mainnet.sui.io:443"
//! signer_private_key = "${SUI_MAINNET_KEY}"
//! verify_before_settle = true
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to the configuration file (default: `config.toml`)
//! - `HOST` - Overrides the bind address
//! - `PORT` - Overrides the port

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

/// Default bind port.
pub const DEFAULT_PORT: u16 = 4021;

/// Errors raised while loading configuration or building adapters from it.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file exists but cannot be read.
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid TOML for this schema.
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A network's signer key does not load.
    #[error("invalid signer key for {network}: {source}")]
    InvalidSigner {
        /// Network table the key belongs to.
        network: String,
        /// Underlying key error.
        #[source]
        source: s402_sui::signer::SignerError,
    },

    /// A network has no `rpc_url` and no known public endpoint.
    #[error("no rpc_url for {0} and no public endpoint is known")]
    MissingRpcUrl(String),

    /// The RPC client for a network cannot be built.
    #[error("cannot build rpc client: {0}")]
    RpcClient(#[from] s402_sui::chain::RpcError),
}

/// Top-level facilitator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilitatorConfig {
    /// Bind address (default: `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Bind port (default: `4021`).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Sui networks keyed by `sui:<chain>` identifier.
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkConfig>,
}

/// Per-network facilitator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Full node JSON-RPC endpoint. Defaults to the public node for known
    /// networks.
    #[serde(default)]
    pub rpc_url: Option<Url>,

    /// Facilitator key, as 32-byte hex or base64. Usually `$VAR`.
    pub signer_private_key: String,

    /// Dry-run every transaction again before broadcasting it.
    #[serde(default)]
    pub verify_before_settle: bool,
}

impl NetworkConfig {
    /// Returns the signer key, or `None` when it is empty or still an
    /// unexpanded `$VAR` reference.
    #[must_use]
    pub fn resolved_key(&self) -> Option<&str> {
        let key = self.signer_private_key.trim();
        (!key.is_empty() && !key.starts_with('$')).then_some(key)
    }
}

const fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for FacilitatorConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            networks: BTreeMap::new(),
        }
    }
}

impl FacilitatorConfig {
    /// Loads from the file named by `CONFIG`, or `config.toml`.
    ///
    /// `HOST` and `PORT` override the file values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("CONFIG").unwrap_or_else(|_| "config.toml".to_owned());
        let mut config = Self::load_from(Path::new(&path))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = if path.exists() {
            std::fs::read_to_string(path)?
        } else {
            String::new()
        };
        Self::from_toml(&content)
    }

    /// Parses TOML text after expanding environment references.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the text does not parse.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(&expand_env_vars(content, |name| {
            std::env::var(name).ok()
        }))?)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(host) = std::env::var("HOST").ok().and_then(|h| h.parse().ok()) {
            self.host = host;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.port = port;
        }
    }
}

/// Replaces `$VAR` and `${VAR}` with values from `lookup`.
///
/// Unresolved references are left as written.
fn expand_env_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        let braced = chars.next_if_eq(&'{').is_some();
        let mut name = String::new();
        let mut closed = false;
        while let Some(&c) = chars.peek() {
            if braced && c == '}' {
                chars.next();
                closed = true;
                break;
            }
            if !braced && !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            name.push(c);
            chars.next();
        }

        let value = if name.is_empty() || (braced && !closed) {
            None
        } else {
            lookup(&name)
        };
        match value {
            Some(value) => result.push_str(&value),
            None => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&name);
                if closed {
                    result.push('}');
                }
            }
        }
    }
    result
}
