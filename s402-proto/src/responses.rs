//! Facilitator response types for the x402 protocol.
//!
//! Rejections are ordinary values here: a failed verification is an
//! `isValid: false` response with a machine-readable reason, never an error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Network;

/// Response from payment verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// Whether the payment is valid.
    pub is_valid: bool,

    /// Machine-readable reason for invalidity (if `is_valid` is false).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,

    /// Human-readable message for invalidity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_message: Option<String>,

    /// The payer's address, as observed on chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

impl VerifyResponse {
    /// Creates a valid verification response.
    ///
    /// `payer` is `None` when no debit could be attributed to an address.
    #[must_use]
    pub const fn valid(payer: Option<String>) -> Self {
        Self {
            is_valid: true,
            invalid_reason: None,
            invalid_message: None,
            payer,
        }
    }

    /// Creates an invalid verification response.
    #[must_use]
    pub fn invalid(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            invalid_reason: Some(reason.into()),
            invalid_message: Some(message.into()),
            payer: None,
        }
    }
}

/// Response from payment settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    /// Whether settlement was successful.
    pub success: bool,

    /// Machine-readable reason for failure (if `success` is false).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,

    /// Human-readable message for failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// The payer's address, as observed on chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,

    /// Transaction digest. Empty when nothing reached the chain.
    #[serde(default)]
    pub transaction: String,

    /// Network where settlement occurred.
    pub network: Network,
}

impl SettleResponse {
    /// Creates a successful settlement response.
    #[must_use]
    pub fn success(
        transaction: impl Into<String>,
        network: impl Into<String>,
        payer: Option<String>,
    ) -> Self {
        Self {
            success: true,
            error_reason: None,
            error_message: None,
            payer,
            transaction: transaction.into(),
            network: network.into(),
        }
    }

    /// Creates a failed settlement response with an empty digest.
    #[must_use]
    pub fn error(
        reason: impl Into<String>,
        message: impl Into<String>,
        network: impl Into<String>,
    ) -> Self {
        Self::failed(reason, message, String::new(), network)
    }

    /// Creates a failed settlement response that still carries the digest of
    /// the transaction that was executed.
    #[must_use]
    pub fn failed(
        reason: impl Into<String>,
        message: impl Into<String>,
        transaction: impl Into<String>,
        network: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            error_reason: Some(reason.into()),
            error_message: Some(message.into()),
            payer: None,
            transaction: transaction.into(),
            network: network.into(),
        }
    }
}

/// A supported payment configuration.
///
/// Describes a single (version, scheme, network) combination that a
/// facilitator backs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedKind {
    /// Protocol version for this kind.
    pub x402_version: u32,

    /// Payment scheme identifier (e.g., "exact").
    pub scheme: String,

    /// Network identifier (e.g., "sui:testnet").
    pub network: Network,

    /// Additional scheme-specific data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

/// Describes what payment kinds a facilitator supports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedResponse {
    /// List of supported payment kinds.
    pub kinds: Vec<SupportedKind>,

    /// List of supported extension keys.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Map of capability family pattern to signer addresses.
    ///
    /// Example: `{"sui:*": ["0xFacilitatorAddress"]}`
    #[serde(default)]
    pub signers: HashMap<String, Vec<String>>,
}

impl SupportedResponse {
    /// Creates a new `SupportedResponse`.
    #[must_use]
    pub const fn new(
        kinds: Vec<SupportedKind>,
        extensions: Vec<String>,
        signers: HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            kinds,
            extensions,
            signers,
        }
    }

    /// Finds the kind advertised for a scheme on a network.
    #[must_use]
    pub fn kind_for(&self, scheme: &str, network: &str) -> Option<&SupportedKind> {
        self.kinds
            .iter()
            .find(|k| k.scheme == scheme && k.network == network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_response_omits_empty_fields() {
        let json = serde_json::to_value(VerifyResponse::valid(Some("0xbb".into()))).unwrap();
        assert_eq!(json, serde_json::json!({ "isValid": true, "payer": "0xbb" }));

        let json = serde_json::to_value(VerifyResponse::invalid(
            "insufficient_amount",
            "too little",
        ))
        .unwrap();
        assert_eq!(json["isValid"], false);
        assert_eq!(json["invalidReason"], "insufficient_amount");
        assert!(json.get("payer").is_none());
    }

    #[test]
    fn test_settle_error_has_empty_transaction() {
        let resp = SettleResponse::error("settlement_error", "rpc down", "sui:testnet");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["transaction"], "");
        assert_eq!(json["network"], "sui:testnet");
        assert_eq!(json["errorReason"], "settlement_error");
    }

    #[test]
    fn test_settle_failed_keeps_digest() {
        let resp = SettleResponse::failed("execution_failed", "abort", "Digest1", "sui:mainnet");
        assert!(!resp.success);
        assert_eq!(resp.transaction, "Digest1");
    }

    #[test]
    fn test_kind_for() {
        let supported = SupportedResponse::new(
            vec![SupportedKind {
                x402_version: 2,
                scheme: "exact".into(),
                network: "sui:testnet".into(),
                extra: None,
            }],
            Vec::new(),
            HashMap::new(),
        );
        assert!(supported.kind_for("exact", "sui:testnet").is_some());
        assert!(supported.kind_for("exact", "sui:mainnet").is_none());
    }
}
