//! Error types for the HTTP transport layer.

use s402::proto::ProtocolError;

/// Errors raised while encoding, decoding, or exchanging s402 HTTP messages.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A header value is not valid base64.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The message parsed but violates the protocol (version, fields).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A header value is not visible ASCII.
    #[error("invalid header {0}")]
    InvalidHeader(&'static str),

    /// A 402 response carried requirements in neither header nor body.
    #[error("402 response carries no payment requirements")]
    MissingRequirements,

    /// The facilitator could not be reached.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The facilitator answered with a non-success status.
    #[error("facilitator returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// A facilitator endpoint URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}
