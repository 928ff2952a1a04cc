//! Axum route handlers for the facilitator service.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};
use s402::proto::{SettleRequest, SettleResponse, SupportedResponse, VerifyRequest, VerifyResponse};
use s402::scheme::FacilitatorRegistry;
use serde_json::{Value, json};

use crate::error::FacilitatorError;

/// Shared application state for the facilitator service.
pub type FacilitatorState = Arc<FacilitatorRegistry>;

/// `GET /supported`: kinds, extensions, and signers of every registration.
pub async fn get_supported(State(registry): State<FacilitatorState>) -> Json<SupportedResponse> {
    Json(registry.get_supported())
}

/// `POST /verify`: dry-run check of a payment.
///
/// # Errors
///
/// Returns 400 if the body is not a verify request.
pub async fn post_verify(
    State(registry): State<FacilitatorState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, FacilitatorError> {
    let Json(request) = body?;
    let response = registry
        .verify(&request.payment_payload, &request.payment_requirements)
        .await;
    tracing::info!(
        network = %request.payment_requirements.network,
        valid = response.is_valid,
        reason = ?response.invalid_reason,
        "verify"
    );
    Ok(Json(response))
}

/// `POST /settle`: broadcasts a payment.
///
/// # Errors
///
/// Returns 400 if the body is not a settle request.
pub async fn post_settle(
    State(registry): State<FacilitatorState>,
    body: Result<Json<SettleRequest>, JsonRejection>,
) -> Result<Json<SettleResponse>, FacilitatorError> {
    let Json(request) = body?;
    let response = registry
        .settle(&request.payment_payload, &request.payment_requirements)
        .await;
    tracing::info!(
        network = %response.network,
        success = response.success,
        digest = %response.transaction,
        reason = ?response.error_reason,
        "settle"
    );
    Ok(Json(response))
}

/// `GET /health`: liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Creates the facilitator router.
///
/// - `GET /supported`
/// - `POST /verify`
/// - `POST /settle`
/// - `GET /health`
pub fn facilitator_router(state: FacilitatorState) -> Router {
    Router::new()
        .route("/supported", get(get_supported))
        .route("/verify", post(post_verify))
        .route("/settle", post(post_settle))
        .route("/health", get(health))
        .with_state(state)
}
