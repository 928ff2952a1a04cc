//! Client for a remote facilitator's HTTP surface.
//!
//! Resource servers that do not run verification themselves call a
//! facilitator over `GET /supported`, `POST /verify`, and `POST /settle`.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use s402::proto::{
    PaymentPayload, PaymentRequirements, SettleRequest, SettleResponse, SupportedResponse,
    VerifyRequest, VerifyResponse,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::HttpError;

/// Request timeout used when none is configured.
pub const DEFAULT_FACILITATOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Talks to one facilitator over HTTP.
#[derive(Clone)]
pub struct HttpFacilitatorClient {
    base_url: Url,
    headers: HeaderMap,
    client: reqwest::Client,
}

impl HttpFacilitatorClient {
    /// Creates a client for the facilitator at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: Url) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_FACILITATOR_TIMEOUT)
            .build()?;
        Ok(Self::with_http_client(base_url, client))
    }

    /// Creates a client that sends requests through `client`.
    #[must_use]
    pub fn with_http_client(mut base_url: Url, client: reqwest::Client) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            headers: HeaderMap::new(),
            client,
        }
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::InvalidHeader`] if the token is not a valid
    /// header value.
    pub fn with_bearer_token(mut self, token: &str) -> Result<Self, HttpError> {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| HttpError::InvalidHeader("authorization"))?;
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    /// Returns the facilitator base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, HttpError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, HttpError> {
        let url = self.base_url.join(endpoint)?;
        let response = self
            .client
            .post(url)
            .headers(self.headers.clone())
            .json(body)
            .send()
            .await?;
        Self::read(response).await
    }

    /// Asks the facilitator to verify `payload` against `requirements`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] on transport failure, a non-2xx status, or an
    /// unparsable body. Rejections arrive as `Ok` with `isValid: false`.
    pub async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, HttpError> {
        let request = VerifyRequest {
            payment_payload: payload.clone(),
            payment_requirements: requirements.clone(),
        };
        self.post("verify", &request).await
    }

    /// Asks the facilitator to settle `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] on transport failure, a non-2xx status, or an
    /// unparsable body.
    pub async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, HttpError> {
        let request = SettleRequest {
            payment_payload: payload.clone(),
            payment_requirements: requirements.clone(),
        };
        let response: SettleResponse = self.post("settle", &request).await?;
        #[cfg(feature = "telemetry")]
        tracing::debug!(success = response.success, digest = %response.transaction, "facilitator settle");
        Ok(response)
    }

    /// Fetches the facilitator's supported kinds and signers.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] on transport failure, a non-2xx status, or an
    /// unparsable body.
    pub async fn supported(&self) -> Result<SupportedResponse, HttpError> {
        let url = self.base_url.join("supported")?;
        let response = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .send()
            .await?;
        Self::read(response).await
    }
}

impl std::fmt::Debug for HttpFacilitatorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFacilitatorClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.headers.contains_key(AUTHORIZATION))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn requirements() -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".into(),
            network: "sui:testnet".into(),
            asset: "0x2::sui::SUI".into(),
            amount: "1000".into(),
            pay_to: format!("0x{}", "aa".repeat(32)),
            max_timeout_seconds: 60,
            extra: json!({}),
        }
    }

    fn payload() -> PaymentPayload {
        PaymentPayload::new(
            2,
            json!({ "signature": "c2ln", "transaction": "AQID" }),
            requirements(),
        )
    }

    #[tokio::test]
    async fn test_verify_posts_camel_case_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/facilitator/verify"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(json!({
                "paymentRequirements": { "payTo": format!("0x{}", "aa".repeat(32)) },
                "paymentPayload": { "x402Version": 2 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "isValid": false,
                "invalidReason": "insufficient_amount",
                "invalidMessage": "credited 1, required 1000"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let base = Url::parse(&format!("{}/facilitator", server.uri())).unwrap();
        let client = HttpFacilitatorClient::new(base)
            .unwrap()
            .with_bearer_token("secret")
            .unwrap();
        let response = client.verify(&payload(), &requirements()).await.unwrap();
        assert!(!response.is_valid);
        assert_eq!(response.invalid_reason.as_deref(), Some("insufficient_amount"));
    }

    #[tokio::test]
    async fn test_settle_and_supported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/settle"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "transaction": "Digest1",
                "network": "sui:testnet"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/supported"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kinds": [{ "x402Version": 2, "scheme": "exact", "network": "sui:testnet" }],
                "extensions": [],
                "signers": { "sui:*": ["0xfac"] }
            })))
            .mount(&server)
            .await;

        let client = HttpFacilitatorClient::new(Url::parse(&server.uri()).unwrap()).unwrap();
        let settled = client.settle(&payload(), &requirements()).await.unwrap();
        assert!(settled.success);
        assert_eq!(settled.transaction, "Digest1");

        let supported = client.supported().await.unwrap();
        assert!(supported.kind_for("exact", "sui:testnet").is_some());
    }

    #[tokio::test]
    async fn test_error_status_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad body"))
            .mount(&server)
            .await;

        let client = HttpFacilitatorClient::new(Url::parse(&server.uri()).unwrap()).unwrap();
        let err = client.verify(&payload(), &requirements()).await.unwrap_err();
        assert!(matches!(err, HttpError::Status { status: 400, ref body } if body == "bad body"));
    }
}
