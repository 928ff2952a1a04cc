//! Network identifiers.
//!
//! A [`NetworkId`] names one chain within a chain family using the
//! `family:chain` form, e.g. `sui:mainnet` or `sui:testnet`.

use std::fmt;
use std::str::FromStr;

use serde_with::{DeserializeFromStr, SerializeDisplay};

/// A `family:chain` network identifier.
///
/// - `family` identifies the blockchain family (e.g., `sui`)
/// - `chain` identifies the specific chain within that family
///
/// # Serialization
///
/// Serializes to/from a colon-separated string: `"sui:testnet"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr)]
pub struct NetworkId {
    family: String,
    chain: String,
}

impl NetworkId {
    /// Creates a network identifier from its components.
    pub fn new<F: Into<String>, C: Into<String>>(family: F, chain: C) -> Self {
        Self {
            family: family.into(),
            chain: chain.into(),
        }
    }

    /// Returns the chain family (e.g., `sui`).
    #[must_use]
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Returns the chain within the family (e.g., `testnet`).
    #[must_use]
    pub fn chain(&self) -> &str {
        &self.chain
    }

    /// Returns the wildcard pattern for this network's family (`sui:*`).
    #[must_use]
    pub fn family_pattern(&self) -> String {
        format!("{}:*", self.family)
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family, self.chain)
    }
}

impl From<NetworkId> for String {
    fn from(value: NetworkId) -> Self {
        value.to_string()
    }
}

/// Error returned when parsing an invalid network identifier.
///
/// A valid identifier contains exactly one `:` with non-empty text on both
/// sides.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid network identifier {0:?}, expected family:chain")]
pub struct NetworkIdFormatError(String);

impl FromStr for NetworkId {
    type Err = NetworkIdFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((family, chain))
                if !family.is_empty() && !chain.is_empty() && !chain.contains(':') =>
            {
                Ok(Self::new(family, chain))
            }
            _ => Err(NetworkIdFormatError(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_network_id() {
        let id: NetworkId = "sui:testnet".parse().unwrap();
        assert_eq!(id.family(), "sui");
        assert_eq!(id.chain(), "testnet");
        assert_eq!(id.to_string(), "sui:testnet");
        assert_eq!(id.family_pattern(), "sui:*");
    }

    #[test]
    fn test_reject_malformed_network_id() {
        for bad in ["sui", "sui:", ":testnet", "sui:test:net", ""] {
            assert!(bad.parse::<NetworkId>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_network_id_serde() {
        let id = NetworkId::new("sui", "mainnet");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"sui:mainnet\"");
        let back: NetworkId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<NetworkId>("\"nope\"").is_err());
    }
}
