//! Client-side scheme adapter.

use s402_proto::{PaymentPayload, PaymentRequirements};

use super::{BoxFuture, SchemeId};
use crate::error::ClientError;

/// Builds signed payment payloads for a scheme on one chain family.
///
/// Implementations perform at most the chain reads needed to build the
/// transaction. Nothing is broadcast.
pub trait SchemeClient: SchemeId + Send + Sync {
    /// Creates a payment payload satisfying `requirements`.
    ///
    /// `x402_version` defaults to the current protocol version when `None`.
    /// The returned payload's `accepted` field is a copy of `requirements`.
    fn create_payment_payload<'a>(
        &'a self,
        x402_version: Option<u32>,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<PaymentPayload, ClientError>>;

    /// Returns whether this client can attempt to pay `requirements`.
    ///
    /// The default compares scheme and network family only.
    fn accepts(&self, requirements: &PaymentRequirements) -> bool {
        requirements.scheme == self.scheme().as_str()
            && requirements
                .network
                .split_once(':')
                .is_some_and(|(family, _)| family == self.namespace())
    }
}
