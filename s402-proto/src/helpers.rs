//! Utility functions for the x402 protocol.
//!
//! Provides version detection, payload parsing, and requirement matching
//! used across the stack.

use serde_json::Value;

use crate::v2::{PaymentPayload, PaymentRequired, PaymentRequirements};
use crate::{ProtocolError, X402_VERSION};

/// Extracts and validates the `x402Version` field from JSON data.
///
/// # Errors
///
/// Returns [`ProtocolError::MissingVersion`] if the field is absent, or
/// [`ProtocolError::UnsupportedVersion`] if it is not the current version.
pub fn detect_version(data: &Value) -> Result<u32, ProtocolError> {
    let version = data
        .get("x402Version")
        .ok_or(ProtocolError::MissingVersion)?;
    let version = version
        .as_u64()
        .ok_or(ProtocolError::UnsupportedVersion(0))?;
    if version == u64::from(X402_VERSION) {
        Ok(X402_VERSION)
    } else {
        Err(ProtocolError::UnsupportedVersion(version))
    }
}

/// Parses a 402 response body from raw JSON bytes.
///
/// # Errors
///
/// Returns [`ProtocolError`] on parse failure or an unsupported version.
pub fn parse_payment_required_bytes(data: &[u8]) -> Result<PaymentRequired, ProtocolError> {
    let parsed: Value = serde_json::from_slice(data)?;
    detect_version(&parsed)?;
    if parsed.get("accepts").is_none() {
        return Err(ProtocolError::MissingField("accepts"));
    }
    Ok(serde_json::from_value(parsed)?)
}

/// Parses a payment payload from raw JSON bytes.
///
/// # Errors
///
/// Returns [`ProtocolError`] on parse failure or an unsupported version.
pub fn parse_payment_payload_bytes(data: &[u8]) -> Result<PaymentPayload, ProtocolError> {
    let parsed: Value = serde_json::from_slice(data)?;
    detect_version(&parsed)?;
    if parsed.get("accepted").is_none() {
        return Err(ProtocolError::MissingField("accepted"));
    }
    Ok(serde_json::from_value(parsed)?)
}

/// Checks whether a payload was built for the given requirements.
///
/// Compares `scheme`, `network`, `amount`, `asset`, and `payTo`.
#[must_use]
pub fn match_payload_to_requirements(
    payload: &PaymentPayload,
    requirements: &PaymentRequirements,
) -> bool {
    let accepted = &payload.accepted;
    accepted.scheme == requirements.scheme
        && accepted.network == requirements.network
        && accepted.amount == requirements.amount
        && accepted.asset == requirements.asset
        && accepted.pay_to == requirements.pay_to
}

/// Checks if a network matches a pattern (supports `family:*` wildcards).
#[must_use]
pub fn matches_network_pattern(network: &str, pattern: &str) -> bool {
    pattern
        .strip_suffix('*')
        .map_or_else(|| pattern == network, |prefix| network.starts_with(prefix))
}
