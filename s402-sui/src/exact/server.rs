//! Server adapter: prices resources in SUI and decorates requirements.

use s402::amount::{decimal_from_f64, parse_display_amount, to_base_units};
use s402::error::PriceError;
use s402::network::NetworkId;
use s402::proto::{PaymentRequirements, SupportedKind};
use s402::scheme::{AssetAmount, Price, Scheme, SchemeId, SchemeServer};
use serde_json::{Map, Value};

use super::SuiExact;
use crate::networks::{SUI_COIN_TYPE, SUI_DECIMALS, SUI_NAMESPACE};

/// Key in `extra` naming how the facilitator verifies payments.
pub const VERIFICATION_METHOD_KEY: &str = "verificationMethod";

/// Key in `extra` carrying the facilitator's address.
pub const FACILITATOR_KEY: &str = "facilitator";

/// Prices resources in one Sui coin.
#[derive(Debug, Clone)]
pub struct ExactSuiServer {
    asset: String,
    decimals: u32,
}

impl Default for ExactSuiServer {
    fn default() -> Self {
        Self::new()
    }
}

impl ExactSuiServer {
    /// Creates a server adapter pricing in native SUI.
    #[must_use]
    pub fn new() -> Self {
        Self {
            asset: SUI_COIN_TYPE.to_owned(),
            decimals: SUI_DECIMALS,
        }
    }

    /// Prices in `coin_type` with `decimals` decimal places instead.
    #[must_use]
    pub fn with_asset(mut self, coin_type: impl Into<String>, decimals: u32) -> Self {
        self.asset = coin_type.into();
        self.decimals = decimals;
        self
    }
}

impl SchemeId for ExactSuiServer {
    fn namespace(&self) -> &str {
        SuiExact.namespace()
    }

    fn scheme(&self) -> Scheme {
        SuiExact.scheme()
    }
}

impl SchemeServer for ExactSuiServer {
    fn parse_price(&self, price: &Price, network: &NetworkId) -> Result<AssetAmount, PriceError> {
        if network.family() != SUI_NAMESPACE {
            return Err(PriceError::UnsupportedNetwork(network.to_string()));
        }
        let display = match price {
            Price::Asset(amount) => return Ok(amount.clone()),
            Price::Number(value) => decimal_from_f64(*value)?,
            Price::Text(text) => parse_display_amount(text)?,
        };
        let base_units = to_base_units(display, self.decimals)?;
        Ok(AssetAmount {
            asset: self.asset.clone(),
            amount: base_units.to_string(),
        })
    }

    fn enhance_payment_requirements(
        &self,
        mut requirements: PaymentRequirements,
        supported_kind: Option<&SupportedKind>,
        _facilitator_extensions: &[String],
    ) -> PaymentRequirements {
        let mut extra = match requirements.extra {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        extra.insert(
            VERIFICATION_METHOD_KEY.to_owned(),
            Value::String("simulation".to_owned()),
        );
        if let Some(facilitator) = supported_kind
            .and_then(|kind| kind.extra.as_ref())
            .and_then(|kind_extra| kind_extra.get(FACILITATOR_KEY))
        {
            extra.insert(FACILITATOR_KEY.to_owned(), facilitator.clone());
        }
        requirements.extra = Value::Object(extra);
        requirements
    }
}

#[cfg(test)]
mod tests {
    use s402::config::ResourceConfig;
    use serde_json::json;

    use super::*;

    fn testnet() -> NetworkId {
        "sui:testnet".parse().unwrap()
    }

    #[test]
    fn test_display_prices_scale_to_mist() {
        let server = ExactSuiServer::new();
        for (price, expected) in [
            (Price::from("0.1"), "100000000"),
            (Price::from("$1"), "1000000000"),
            (Price::from(0.25), "250000000"),
            (Price::from("1e-9"), "1"),
            (Price::from("0.0000000001"), "1"),
        ] {
            let amount = server.parse_price(&price, &testnet()).unwrap();
            assert_eq!(amount.amount, expected, "{price:?}");
            assert_eq!(amount.asset, SUI_COIN_TYPE);
        }
    }

    #[test]
    fn test_structured_price_passes_through() {
        let price = Price::from(AssetAmount {
            asset: "0x5::usdc::USDC".into(),
            amount: "42".into(),
        });
        let amount = ExactSuiServer::new().parse_price(&price, &testnet()).unwrap();
        assert_eq!(amount.asset, "0x5::usdc::USDC");
        assert_eq!(amount.amount, "42");
    }

    #[test]
    fn test_rejects_bad_prices_and_networks() {
        let server = ExactSuiServer::new();
        assert!(matches!(
            server.parse_price(&Price::from(-1.0), &testnet()),
            Err(PriceError::InvalidPrice(_))
        ));
        assert!(matches!(
            server.parse_price(&Price::from("abc"), &testnet()),
            Err(PriceError::InvalidPrice(_))
        ));
        let foreign: NetworkId = "eip155:8453".parse().unwrap();
        assert!(matches!(
            server.parse_price(&Price::from("1"), &foreign),
            Err(PriceError::UnsupportedNetwork(_))
        ));
    }

    #[test]
    fn test_enhance_is_idempotent_and_copies_facilitator() {
        let server = ExactSuiServer::new();
        let config = ResourceConfig {
            pay_to: format!("0x{}", "aa".repeat(32)),
            price: Price::from("0.1"),
            network: testnet(),
            max_timeout_seconds: None,
        };
        let requirements = server.build_requirements(&config).unwrap();
        assert_eq!(requirements.max_timeout_seconds, 300);
        assert_eq!(requirements.extra, json!({}));

        let kind = SupportedKind {
            x402_version: 2,
            scheme: "exact".into(),
            network: "sui:testnet".into(),
            extra: Some(json!({ "facilitator": "0xfac" })),
        };
        let once = server.enhance_payment_requirements(requirements.clone(), Some(&kind), &[]);
        let twice = server.enhance_payment_requirements(once.clone(), Some(&kind), &[]);
        assert_eq!(once, twice);
        assert_eq!(
            once.extra,
            json!({ "verificationMethod": "simulation", "facilitator": "0xfac" })
        );
        assert_eq!(once.amount, requirements.amount);
        assert_eq!(once.pay_to, requirements.pay_to);

        let bare = server.enhance_payment_requirements(requirements, None, &[]);
        assert_eq!(bare.extra, json!({ "verificationMethod": "simulation" }));
    }
}
