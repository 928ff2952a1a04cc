//! Base64 JSON codecs for the payment headers, and 402 challenge parsing.
//!
//! All three headers carry standard (padded) base64 of a JSON document:
//!
//! | Header              | Direction        | Document              |
//! |---------------------|------------------|-----------------------|
//! | `PAYMENT-REQUIRED`  | server to client | [`PaymentRequired`]   |
//! | `PAYMENT-SIGNATURE` | client to server | [`PaymentPayload`]    |
//! | `PAYMENT-RESPONSE`  | server to client | [`SettleResponse`]    |

use http::HeaderMap;
use s402::encoding::Base64Bytes;
use s402::proto::helpers::{parse_payment_payload_bytes, parse_payment_required_bytes};
use s402::proto::{PaymentPayload, PaymentRequired, SettleResponse};
use serde::Serialize;

use crate::constants::{PAYMENT_REQUIRED_HEADER, PAYMENT_RESPONSE_HEADER};
use crate::error::HttpError;

fn encode_json<T: Serialize>(value: &T) -> Result<String, HttpError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64Bytes::encode(json).to_string())
}

fn decode_base64(header_value: &str) -> Result<Vec<u8>, HttpError> {
    Ok(Base64Bytes::from(header_value.trim()).decode()?)
}

/// Encodes a payload for the `PAYMENT-SIGNATURE` header.
///
/// # Errors
///
/// Returns [`HttpError::Json`] if serialization fails.
pub fn encode_payment_signature(payload: &PaymentPayload) -> Result<String, HttpError> {
    encode_json(payload)
}

/// Decodes a `PAYMENT-SIGNATURE` header value.
///
/// # Errors
///
/// Returns [`HttpError`] on base64, JSON, or protocol-version failure.
pub fn decode_payment_signature(header_value: &str) -> Result<PaymentPayload, HttpError> {
    Ok(parse_payment_payload_bytes(&decode_base64(header_value)?)?)
}

/// Encodes requirements for the `PAYMENT-REQUIRED` header.
///
/// # Errors
///
/// Returns [`HttpError::Json`] if serialization fails.
pub fn encode_payment_required(required: &PaymentRequired) -> Result<String, HttpError> {
    encode_json(required)
}

/// Decodes a `PAYMENT-REQUIRED` header value.
///
/// # Errors
///
/// Returns [`HttpError`] on base64, JSON, or protocol-version failure.
pub fn decode_payment_required(header_value: &str) -> Result<PaymentRequired, HttpError> {
    Ok(parse_payment_required_bytes(&decode_base64(header_value)?)?)
}

/// Encodes a settlement result for the `PAYMENT-RESPONSE` header.
///
/// # Errors
///
/// Returns [`HttpError::Json`] if serialization fails.
pub fn encode_payment_response(response: &SettleResponse) -> Result<String, HttpError> {
    encode_json(response)
}

/// Decodes a `PAYMENT-RESPONSE` header value.
///
/// # Errors
///
/// Returns [`HttpError`] on base64 or JSON failure.
pub fn decode_payment_response(header_value: &str) -> Result<SettleResponse, HttpError> {
    Ok(serde_json::from_slice(&decode_base64(header_value)?)?)
}

/// Reads the payment requirements of a 402 response.
///
/// The `PAYMENT-REQUIRED` header wins when present. Otherwise the body is
/// parsed as a JSON [`PaymentRequired`].
///
/// # Errors
///
/// Returns [`HttpError::MissingRequirements`] when neither source carries
/// requirements, or the decode error of the source that was tried.
pub fn extract_payment_required(
    headers: &HeaderMap,
    body: &[u8],
) -> Result<PaymentRequired, HttpError> {
    if let Some(value) = headers.get(PAYMENT_REQUIRED_HEADER) {
        let text = value
            .to_str()
            .map_err(|_| HttpError::InvalidHeader(PAYMENT_REQUIRED_HEADER))?;
        return decode_payment_required(text);
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(HttpError::MissingRequirements);
    }
    Ok(parse_payment_required_bytes(body)?)
}

/// Returns the settlement digest from a `PAYMENT-RESPONSE` header.
///
/// A missing or undecodable header yields `None`.
#[must_use]
pub fn settlement_digest(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(PAYMENT_RESPONSE_HEADER)?.to_str().ok()?;
    decode_payment_response(value)
        .ok()
        .map(|response| response.transaction)
        .filter(|digest| !digest.is_empty())
}
