//! Agent errors and their HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::ledger::LedgerError;

/// Errors returned by agent operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// No signing key was configured.
    #[error("agent has no signing key configured")]
    NotConfigured,

    /// The spend ceiling does not allow another payment.
    #[error("budget exhausted: spent {total_spent} of {max_spend}, next payment {requested}")]
    BudgetExhausted {
        /// Base units already spent.
        total_spent: u128,
        /// Spend ceiling.
        max_spend: u128,
        /// Price of the payment being refused, `0` before it is known.
        requested: u128,
    },

    /// Startup has not completed, or it failed.
    #[error("agent not ready: {0}")]
    NotReady(String),

    /// Building or retrying the payment failed. Nothing was recorded.
    #[error("auto-payment failed: {0}")]
    AutoPaymentFailed(String),

    /// The target could not be reached.
    #[error("upstream request failed: {0}")]
    UpstreamRequestFailed(String),

    /// The chain balance could not be read.
    #[error("balance unavailable: {0}")]
    BalanceUnavailable(String),

    /// The new ceiling is not a non-negative integer.
    #[error("invalid budget: {0}")]
    InvalidBudget(String),

    /// The request is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The ledger failed.
    #[error("storage error: {0}")]
    Storage(#[from] LedgerError),
}

impl AgentError {
    /// Returns the machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotConfigured => "agent_not_configured",
            Self::BudgetExhausted { .. } => "budget_exhausted",
            Self::NotReady(_) => "agent_not_ready",
            Self::AutoPaymentFailed(_) => "auto_payment_failed",
            Self::UpstreamRequestFailed(_) => "upstream_request_failed",
            Self::BalanceUnavailable(_) => "balance_unavailable",
            Self::InvalidBudget(_) => "invalid_budget",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Storage(_) => "storage_error",
        }
    }

    /// Returns the HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotConfigured | Self::BudgetExhausted { .. } | Self::NotReady(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::AutoPaymentFailed(_)
            | Self::UpstreamRequestFailed(_)
            | Self::BalanceUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidBudget(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(code = self.code(), error = %self, "Agent request failed");
        }
        let body = json!({ "error": self.code(), "message": self.to_string() });
        (status, Json(body)).into_response()
    }
}
