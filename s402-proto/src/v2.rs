//! Payment types for the x402 protocol (version 2 envelope).
//!
//! Networks are `family:chain` identifiers (e.g., `sui:testnet`) and amounts
//! travel as decimal strings in the asset's smallest unit.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Network, X402_VERSION};

/// Describes the resource being paid for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    /// The URL of the resource.
    pub url: String,

    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Optional MIME type of the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Payment requirements advertised by a resource server.
///
/// # JSON Format
///
/// ```json
/// {
///   "scheme": "exact",
///   "network": "sui:testnet",
///   "asset": "0x2::sui::SUI",
///   "amount": "100000000",
///   "payTo": "0x...",
///   "maxTimeoutSeconds": 300,
///   "extra": {}
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// Payment scheme identifier (e.g., "exact").
    pub scheme: String,

    /// Network identifier (e.g., "sui:mainnet").
    pub network: Network,

    /// Coin type of the asset to transfer (e.g., `0x2::sui::SUI`).
    pub asset: String,

    /// Amount in the asset's smallest unit, as a decimal string.
    pub amount: String,

    /// Recipient address.
    pub pay_to: String,

    /// Upper bound on how long settlement may take.
    pub max_timeout_seconds: u64,

    /// Scheme-specific data (e.g., verification method hints).
    #[serde(default = "default_empty_object")]
    pub extra: Value,
}

impl PaymentRequirements {
    /// Returns the payment amount.
    #[must_use]
    pub fn amount(&self) -> &str {
        &self.amount
    }

    /// Returns the extra metadata, or `None` if it is null.
    #[must_use]
    pub fn extra(&self) -> Option<&Value> {
        if self.extra.is_null() {
            None
        } else {
            Some(&self.extra)
        }
    }
}

/// Body of a 402 response.
///
/// Lists every payment option the resource server accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequired {
    /// Protocol version.
    #[serde(default = "default_version")]
    pub x402_version: u32,

    /// Optional error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Optional resource information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceInfo>,

    /// Accepted payment requirements.
    pub accepts: Vec<PaymentRequirements>,

    /// Optional extension data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

/// Payment payload attached by a client to a retried request.
///
/// For the Sui exact scheme `payload` is
/// `{ "signature": "<base64>", "transaction": "<base64>" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    /// Protocol version.
    #[serde(default = "default_version")]
    pub x402_version: u32,

    /// Scheme-specific payload data.
    pub payload: Value,

    /// The requirements this payload was built for.
    pub accepted: PaymentRequirements,

    /// Optional resource information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceInfo>,

    /// Optional extension data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl PaymentPayload {
    /// Creates a payload for the given requirements with no resource or
    /// extension data.
    #[must_use]
    pub const fn new(x402_version: u32, payload: Value, accepted: PaymentRequirements) -> Self {
        Self {
            x402_version,
            payload,
            accepted,
            resource: None,
            extensions: None,
        }
    }

    /// Returns the payment scheme from the accepted requirements.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.accepted.scheme
    }

    /// Returns the network from the accepted requirements.
    #[must_use]
    pub fn network(&self) -> &str {
        &self.accepted.network
    }
}

/// Request to verify a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// The payment payload to verify.
    pub payment_payload: PaymentPayload,

    /// The requirements to verify against.
    pub payment_requirements: PaymentRequirements,
}

/// Request to settle a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleRequest {
    /// The payment payload to settle.
    pub payment_payload: PaymentPayload,

    /// The requirements for settlement.
    pub payment_requirements: PaymentRequirements,
}

const fn default_version() -> u32 {
    X402_VERSION
}

fn default_empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}
