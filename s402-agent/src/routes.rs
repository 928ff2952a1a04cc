//! Axum surface of the payment agent.
//!
//! | Method | Path        | Operation                       |
//! |--------|-------------|---------------------------------|
//! | GET    | `/info`     | [`PaymentAgent::info`]          |
//! | GET    | `/balance`  | [`PaymentAgent::balance`]       |
//! | POST   | `/fetch`    | [`PaymentAgent::fetch`]         |
//! | GET    | `/spending` | [`PaymentAgent::list_spending`] |
//! | POST   | `/budget`   | [`PaymentAgent::set_budget`]    |
//!
//! [`PaymentAgent::info`]: crate::agent::PaymentAgent::info
//! [`PaymentAgent::balance`]: crate::agent::PaymentAgent::balance
//! [`PaymentAgent::fetch`]: crate::agent::PaymentAgent::fetch
//! [`PaymentAgent::list_spending`]: crate::agent::PaymentAgent::list_spending
//! [`PaymentAgent::set_budget`]: crate::agent::PaymentAgent::set_budget

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::header::{CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING};
use axum::http::{HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::agent::{AgentBalance, AgentInfo, FetchOutcome, FetchRequest, SpendingPage};
use crate::error::AgentError;
use crate::gate::AgentGate;

/// `paid` or `none`.
pub const PAYMENT_STATUS_HEADER: HeaderName = HeaderName::from_static("x-payment-status");

/// Base units paid, on paid responses.
pub const PAYMENT_AMOUNT_HEADER: HeaderName = HeaderName::from_static("x-payment-amount");

/// Settlement digest, on paid responses.
pub const PAYMENT_DIGEST_HEADER: HeaderName = HeaderName::from_static("x-payment-digest");

const ENDPOINTS: [&str; 5] = [
    "GET /info",
    "GET /balance",
    "POST /fetch",
    "GET /spending",
    "POST /budget",
];

/// Query of `GET /spending`.
#[derive(Debug, Default, Deserialize)]
pub struct SpendingQuery {
    limit: Option<u32>,
    offset: Option<u32>,
}

/// Body of `POST /budget`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRequest {
    max_spend_mist: Value,
}

async fn info(State(gate): State<AgentGate>) -> Result<Json<AgentInfo>, AgentError> {
    Ok(Json(gate.agent().await?.info()?))
}

async fn balance(State(gate): State<AgentGate>) -> Result<Json<AgentBalance>, AgentError> {
    Ok(Json(gate.agent().await?.balance().await?))
}

async fn fetch(
    State(gate): State<AgentGate>,
    body: Result<Json<FetchRequest>, JsonRejection>,
) -> Result<Response, AgentError> {
    let agent = gate.agent().await?;
    let Json(request) = body.map_err(|e| AgentError::InvalidRequest(e.body_text()))?;
    Ok(relay(agent.fetch(request).await?))
}

async fn spending(
    State(gate): State<AgentGate>,
    query: Result<Query<SpendingQuery>, QueryRejection>,
) -> Result<Json<SpendingPage>, AgentError> {
    let agent = gate.agent().await?;
    let Query(query) = query.map_err(|e| AgentError::InvalidRequest(e.body_text()))?;
    Ok(Json(agent.list_spending(query.limit, query.offset)?))
}

async fn budget(
    State(gate): State<AgentGate>,
    body: Result<Json<BudgetRequest>, JsonRejection>,
) -> Result<Json<AgentInfo>, AgentError> {
    let agent = gate.agent().await?;
    let Json(request) = body.map_err(|e| AgentError::InvalidRequest(e.body_text()))?;
    let max_spend = match request.max_spend_mist {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        other => {
            return Err(AgentError::InvalidBudget(format!(
                "maxSpendMist must be a string or an integer, got {other}"
            )));
        }
    };
    Ok(Json(agent.set_budget(&max_spend)?))
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "not_found",
            "message": format!("no endpoint at {}", uri.path()),
            "endpoints": ENDPOINTS,
        })),
    )
}

async fn method_not_allowed(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({
            "error": "method_not_allowed",
            "message": format!("wrong method for {}", uri.path()),
            "endpoints": ENDPOINTS,
        })),
    )
}

/// Turns a fetch outcome into the caller's response.
///
/// Status, headers, and body are the target's; framing headers are
/// recomputed and the `x-payment-*` headers are added.
fn relay(outcome: FetchOutcome) -> Response {
    let FetchOutcome {
        status,
        mut headers,
        body,
        payment,
    } = outcome;
    for name in [CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING] {
        headers.remove(name);
    }
    match payment {
        Some(entry) => {
            headers.insert(PAYMENT_STATUS_HEADER, HeaderValue::from_static("paid"));
            if let Ok(amount) = HeaderValue::from_str(&entry.amount) {
                headers.insert(PAYMENT_AMOUNT_HEADER, amount);
            }
            if let Ok(digest) = HeaderValue::from_str(&entry.digest) {
                headers.insert(PAYMENT_DIGEST_HEADER, digest);
            }
        }
        None => {
            headers.insert(PAYMENT_STATUS_HEADER, HeaderValue::from_static("none"));
        }
    }
    (status, headers, body).into_response()
}

/// Builds the agent router over `gate`.
pub fn agent_router(gate: AgentGate) -> Router {
    Router::new()
        .route("/info", get(info))
        .route("/balance", get(balance))
        .route("/fetch", post(fetch))
        .route("/spending", get(spending))
        .route("/budget", post(budget))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(gate)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::agent::tests::{agent_with, paid_resource};
    use crate::ledger::{Ledger, LedgerError};

    fn app(max_spend: u128) -> Router {
        let agent = agent_with(Arc::default(), Ledger::open_in_memory().unwrap(), max_spend);
        agent_router(AgentGate::ready(agent))
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_paid_fetch_is_annotated() {
        let server = MockServer::start().await;
        paid_resource(&server, "100", Some("Digest9")).await;
        let app = app(1_000);

        let response = app
            .clone()
            .oneshot(post_json(
                "/fetch",
                &json!({ "url": format!("{}/paid", server.uri()) }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[&PAYMENT_STATUS_HEADER], "paid");
        assert_eq!(response.headers()[&PAYMENT_AMOUNT_HEADER], "100");
        assert_eq!(response.headers()[&PAYMENT_DIGEST_HEADER], "Digest9");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"premium content");

        let page = json_body(app.clone().oneshot(get("/spending?limit=1")).await.unwrap()).await;
        assert_eq!(page["limit"], 1);
        assert_eq!(page["entries"][0]["amount"], "100");
        assert_eq!(page["entries"][0]["digest"], "Digest9");

        let info = json_body(app.oneshot(get("/info")).await.unwrap()).await;
        assert_eq!(info["totalSpent"], "100");
        assert_eq!(info["maxSpend"], "1000");
        assert_eq!(info["network"], "sui:testnet");
    }

    #[tokio::test]
    async fn test_unpaid_fetch_passes_status_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
            .mount(&server)
            .await;

        let response = app(1_000)
            .oneshot(post_json(
                "/fetch",
                &json!({ "url": format!("{}/missing", server.uri()), "method": "GET" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[&PAYMENT_STATUS_HEADER], "none");
        assert!(response.headers().get(&PAYMENT_AMOUNT_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_exhausted_budget_is_503() {
        let response = app(0)
            .oneshot(post_json("/fetch", &json!({ "url": "http://127.0.0.1:9/" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["error"], "budget_exhausted");
    }

    #[tokio::test]
    async fn test_budget_accepts_string_or_integer() {
        let app = app(1_000);
        for (value, expected) in [(json!(500), "500"), (json!("600"), "600")] {
            let response = app
                .clone()
                .oneshot(post_json("/budget", &json!({ "maxSpendMist": value })))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(json_body(response).await["maxSpend"], expected);
        }

        for value in [json!("abc"), json!(-5), json!(1.5), json!(null)] {
            let response = app
                .clone()
                .oneshot(post_json("/budget", &json!({ "maxSpendMist": value })))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_body(response).await["error"], "invalid_budget");
        }

        let response = app.oneshot(post_json("/budget", &json!({}))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_bad_spending_query_is_400() {
        let response = app(1_000)
            .oneshot(get("/spending?limit=many"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_unknown_path_lists_endpoints() {
        let response = app(1_000).oneshot(get("/nowhere")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["endpoints"].as_array().unwrap().len(), ENDPOINTS.len());
        assert!(
            body["endpoints"]
                .as_array()
                .unwrap()
                .contains(&json!("POST /fetch"))
        );
    }

    #[tokio::test]
    async fn test_wrong_method_is_405() {
        let app = app(1_000);
        let response = app.clone().oneshot(get("/fetch")).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(json_body(response).await["error"], "method_not_allowed");

        let response = app
            .oneshot(post_json("/info", &json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_failed_startup_is_503() {
        let (opener, gate) = AgentGate::new();
        opener.resolve(Err(AgentError::Storage(LedgerError::Poisoned)));
        let response = agent_router(gate).oneshot(get("/info")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["error"], "agent_not_ready");
    }
}
