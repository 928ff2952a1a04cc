//! Server-side scheme adapter.
//!
//! Resource servers quote prices in an asset's display unit (`"0.1"` SUI)
//! and advertise requirements in base units (`"100000000"` MIST). The
//! [`SchemeServer`] trait does that conversion and decorates requirements
//! with scheme-specific `extra` data.

use s402_proto::{PaymentRequirements, SupportedKind};
use serde::{Deserialize, Serialize};

use super::SchemeId;
use crate::config::{DEFAULT_MAX_TIMEOUT_SECONDS, ResourceConfig};
use crate::error::PriceError;
use crate::network::NetworkId;

/// A resolved asset amount ready for use in payment requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAmount {
    /// The asset identifier (a Sui coin type).
    pub asset: String,
    /// The amount in the asset's smallest unit, as a decimal string.
    pub amount: String,
}

/// A price as configured by a resource server.
///
/// Deserializes from any of:
///
/// - `{"asset": "0x2::sui::SUI", "amount": "1000"}` (already in base units)
/// - `0.25` (display units)
/// - `"0.25"` or `"$0.25"` (display units)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Price {
    /// An amount already expressed in base units of a specific asset.
    Asset(AssetAmount),
    /// A display-unit number.
    Number(f64),
    /// A display-unit decimal string.
    Text(String),
}

impl From<AssetAmount> for Price {
    fn from(value: AssetAmount) -> Self {
        Self::Asset(value)
    }
}

impl From<f64> for Price {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Price {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// Server-side scheme processing.
pub trait SchemeServer: SchemeId + Send + Sync {
    /// Converts `price` into a base-unit amount of this adapter's asset.
    ///
    /// A structured [`Price::Asset`] passes through unchanged. Display-unit
    /// prices are scaled by the asset's decimals and rounded up.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::InvalidPrice`] for negative or non-finite input,
    /// and [`PriceError::UnsupportedNetwork`] for networks outside this
    /// adapter's family.
    fn parse_price(&self, price: &Price, network: &NetworkId) -> Result<AssetAmount, PriceError>;

    /// Attaches scheme-specific `extra` metadata to `requirements`.
    ///
    /// Must not change any other field and must be idempotent.
    fn enhance_payment_requirements(
        &self,
        requirements: PaymentRequirements,
        supported_kind: Option<&SupportedKind>,
        facilitator_extensions: &[String],
    ) -> PaymentRequirements;

    /// Builds complete requirements for a protected resource.
    ///
    /// Combines [`parse_price`](Self::parse_price) with the rest of the
    /// resource configuration. The result has an empty `extra`; pass it to
    /// [`enhance_payment_requirements`](Self::enhance_payment_requirements)
    /// once facilitator capabilities are known.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] if the price cannot be converted.
    fn build_requirements(
        &self,
        config: &ResourceConfig,
    ) -> Result<PaymentRequirements, PriceError> {
        let asset_amount = self.parse_price(&config.price, &config.network)?;
        Ok(PaymentRequirements {
            scheme: self.scheme().to_string(),
            network: config.network.to_string(),
            asset: asset_amount.asset,
            amount: asset_amount.amount,
            pay_to: config.pay_to.clone(),
            max_timeout_seconds: config
                .max_timeout_seconds
                .unwrap_or(DEFAULT_MAX_TIMEOUT_SECONDS),
            extra: serde_json::Value::Object(serde_json::Map::new()),
        })
    }
}
