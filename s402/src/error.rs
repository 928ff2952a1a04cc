//! Error types and reason codes for s402 payment operations.
//!
//! Verification and settlement never fail with an `Err`: every rejection is
//! a [`PaymentProblem`] carrying an [`ErrorReason`], which converts into the
//! `isValid: false` / `success: false` wire responses. Client-side payment
//! construction and price parsing, which have a caller to propagate to, use
//! [`ClientError`] and [`PriceError`].

use s402_proto::{SettleResponse, VerifyResponse};
use serde::{Deserialize, Serialize};

/// Machine-readable reason codes for rejected payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorReason {
    /// The payload lacks a signature or a transaction.
    MissingPayload,
    /// The payload is present but cannot be decoded.
    InvalidPayload,
    /// The requirements carry an unparsable amount or recipient.
    InvalidRequirements,
    /// The requested asset is not the one this adapter handles.
    UnsupportedAsset,
    /// No adapter is registered for the scheme and network.
    UnsupportedScheme,
    /// Dry-run execution did not succeed.
    SimulationFailed,
    /// No credit of the asset to the recipient was observed.
    NoTransfer,
    /// The observed credit is below the required amount.
    InsufficientAmount,
    /// The chain could not be queried during verification.
    VerificationError,
    /// The transaction executed but failed on chain.
    ExecutionFailed,
    /// The chain could not be reached during settlement.
    SettlementError,
}

impl ErrorReason {
    /// Returns the `snake_case` string representation matching the wire format.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MissingPayload => "missing_payload",
            Self::InvalidPayload => "invalid_payload",
            Self::InvalidRequirements => "invalid_requirements",
            Self::UnsupportedAsset => "unsupported_asset",
            Self::UnsupportedScheme => "unsupported_scheme",
            Self::SimulationFailed => "simulation_failed",
            Self::NoTransfer => "no_transfer",
            Self::InsufficientAmount => "insufficient_amount",
            Self::VerificationError => "verification_error",
            Self::ExecutionFailed => "execution_failed",
            Self::SettlementError => "settlement_error",
        }
    }
}

impl core::fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured payment rejection with reason code and details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentProblem {
    reason: ErrorReason,
    details: String,
}

impl PaymentProblem {
    /// Creates a new payment problem with the given reason and details.
    #[must_use]
    pub fn new(reason: ErrorReason, details: impl Into<String>) -> Self {
        Self {
            reason,
            details: details.into(),
        }
    }

    /// Returns the error reason code.
    #[must_use]
    pub const fn reason(&self) -> ErrorReason {
        self.reason
    }

    /// Returns the human-readable error details.
    #[must_use]
    pub fn details(&self) -> &str {
        &self.details
    }

    /// Converts into an `isValid: false` verification response.
    #[must_use]
    pub fn into_verify_response(self) -> VerifyResponse {
        VerifyResponse::invalid(self.reason.as_str(), self.details)
    }

    /// Converts into a failed settlement response with an empty digest.
    #[must_use]
    pub fn into_settle_response(self, network: impl Into<String>) -> SettleResponse {
        SettleResponse::error(self.reason.as_str(), self.details, network)
    }
}

impl core::fmt::Display for PaymentProblem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.reason, self.details)
    }
}

/// Errors raised while building a payment payload on the client side.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The requirements ask for an asset this client cannot pay with.
    #[error("unsupported asset {actual}, expected {expected}")]
    UnsupportedAsset {
        /// The asset this client pays with.
        expected: String,
        /// The asset the requirements asked for.
        actual: String,
    },

    /// The requirements target a network this client is not connected to.
    #[error("unsupported network {0}")]
    UnsupportedNetwork(String),

    /// The requirements cannot be interpreted (bad amount, recipient, ...).
    #[error("invalid payment requirements: {0}")]
    InvalidRequirements(String),

    /// The chain node could not be reached while resolving chain state.
    #[error("chain unavailable: {0}")]
    ChainUnavailable(String),

    /// The chain node refused to build the transaction.
    #[error("failed to build transaction: {0}")]
    BuildFailed(String),
}

/// Errors raised while converting a price into an asset amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    /// The price is negative, not finite, not a number, or overflows.
    #[error("invalid price: {0}")]
    InvalidPrice(String),

    /// The network is not one this server adapter prices for.
    #[error("unsupported network {0}")]
    UnsupportedNetwork(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_serde_matches_as_str() {
        for reason in [
            ErrorReason::MissingPayload,
            ErrorReason::UnsupportedScheme,
            ErrorReason::InsufficientAmount,
            ErrorReason::SettlementError,
        ] {
            let json = serde_json::to_value(reason).unwrap();
            assert_eq!(json, reason.as_str());
        }
    }

    #[test]
    fn test_problem_into_responses() {
        let problem = PaymentProblem::new(ErrorReason::NoTransfer, "nothing moved");
        let verify = problem.clone().into_verify_response();
        assert!(!verify.is_valid);
        assert_eq!(verify.invalid_reason.as_deref(), Some("no_transfer"));
        assert_eq!(verify.invalid_message.as_deref(), Some("nothing moved"));

        let settle = problem.into_settle_response("sui:testnet");
        assert!(!settle.success);
        assert!(settle.transaction.is_empty());
        assert_eq!(settle.error_reason.as_deref(), Some("no_transfer"));
    }
}
