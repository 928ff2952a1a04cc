//! Facilitator-side scheme adapter.

use s402_proto::{PaymentPayload, PaymentRequirements, SettleResponse, VerifyResponse};
use serde_json::Value;

use super::{BoxFuture, SchemeId};
use crate::network::NetworkId;

/// Verifies and settles payments for a scheme on one chain family.
///
/// Both operations return response values for every outcome. Chain or
/// transport failures are reported as `verification_error` or
/// `settlement_error` responses, so callers never need to handle an `Err`.
pub trait SchemeFacilitator: SchemeId + Send + Sync {
    /// Checks, without broadcasting, that `payload` would pay `requirements`.
    fn verify<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, VerifyResponse>;

    /// Broadcasts the signed transaction carried by `payload`.
    fn settle<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, SettleResponse>;

    /// Addresses that may act for this facilitator on `network`.
    fn get_signers(&self, network: &NetworkId) -> Vec<String>;

    /// Capability hints advertised for `network` in discovery responses.
    fn get_extra(&self, network: &NetworkId) -> Option<Value>;
}
