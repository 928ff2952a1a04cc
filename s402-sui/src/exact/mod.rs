//! The "exact" payment scheme on Sui.
//!
//! The client pays by signing a plain coin transfer to `payTo` for at least
//! the required amount. The facilitator never inspects transaction bytes:
//! it trusts only the balance changes a dry run (verify) or an execution
//! (settle) reports.
//!
//! # Payload
//!
//! ```json
//! { "signature": "<base64 flag||sig||pk>", "transaction": "<base64 tx bytes>" }
//! ```

use s402::encoding::Base64Bytes;
use s402::error::{ErrorReason, PaymentProblem};
use s402::scheme::{Scheme, SchemeId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::networks::SUI_NAMESPACE;

#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "client")]
pub use client::*;

#[cfg(feature = "facilitator")]
pub mod facilitator;
#[cfg(feature = "facilitator")]
pub use facilitator::*;

#[cfg(feature = "server")]
pub mod server;
#[cfg(feature = "server")]
pub use server::*;

/// Sui exact scheme identifier, shared by the three adapters.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuiExact;

impl SchemeId for SuiExact {
    fn namespace(&self) -> &str {
        SUI_NAMESPACE
    }

    fn scheme(&self) -> Scheme {
        Scheme::Exact
    }
}

/// The scheme-specific part of a Sui exact payment payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactSuiPayload {
    /// Serialized Sui signature, base64.
    pub signature: String,
    /// Transaction bytes, base64.
    pub transaction: String,
}

impl ExactSuiPayload {
    /// Extracts the payload from a payment payload's `payload` field.
    ///
    /// # Errors
    ///
    /// Returns a `missing_payload` problem when either field is absent or
    /// empty.
    pub fn from_value(value: &Value) -> Result<Self, PaymentProblem> {
        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .ok_or_else(|| {
                    PaymentProblem::new(ErrorReason::MissingPayload, format!("payload has no {name}"))
                })
        };
        Ok(Self {
            signature: field("signature")?,
            transaction: field("transaction")?,
        })
    }

    /// Decodes the transaction bytes.
    ///
    /// # Errors
    ///
    /// Returns an `invalid_payload` problem if the transaction is not base64.
    pub fn transaction_bytes(&self) -> Result<Vec<u8>, PaymentProblem> {
        Base64Bytes::from(self.transaction.as_str())
            .decode()
            .map_err(|e| {
                PaymentProblem::new(
                    ErrorReason::InvalidPayload,
                    format!("transaction is not base64: {e}"),
                )
            })
    }

    /// Converts into the JSON carried in a payment payload.
    #[must_use]
    pub fn into_value(self) -> Value {
        serde_json::json!({
            "signature": self.signature,
            "transaction": self.transaction,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_payload_requires_both_fields() {
        let full = json!({ "signature": "c2ln", "transaction": "AQID" });
        let payload = ExactSuiPayload::from_value(&full).unwrap();
        assert_eq!(payload.transaction_bytes().unwrap(), [1, 2, 3]);
        assert_eq!(payload.into_value(), full);

        for partial in [
            json!({ "signature": "c2ln" }),
            json!({ "transaction": "AQID" }),
            json!({ "signature": "", "transaction": "AQID" }),
            json!(null),
        ] {
            let problem = ExactSuiPayload::from_value(&partial).unwrap_err();
            assert_eq!(problem.reason(), ErrorReason::MissingPayload);
        }
    }

    #[test]
    fn test_undecodable_transaction_is_invalid_payload() {
        let payload = ExactSuiPayload {
            signature: "c2ln".into(),
            transaction: "%%%".into(),
        };
        assert_eq!(
            payload.transaction_bytes().unwrap_err().reason(),
            ErrorReason::InvalidPayload
        );
    }

    #[test]
    fn test_scheme_id() {
        assert_eq!(SuiExact.id(), "sui-exact");
        assert_eq!(SuiExact.caip_family(), "sui:*");
    }
}
