//! JSON-RPC client for Sui full nodes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use s402::encoding::Base64Bytes;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
#[cfg(feature = "telemetry")]
use tracing::instrument;
use url::Url;

use super::rpc::{RpcError, SuiRpc, select_coins};
use super::types::{
    BalanceChange, Coin, ExecutionStatus, SuiAddress, TransactionOutcome, TransferRequest,
    coin_types_match,
};
use crate::networks::SUI_COIN_TYPE;

/// Per-request timeout of [`SuiRpcClient::new`].
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Coins requested per `suix_getCoins` page.
const COINS_PAGE_LIMIT: u32 = 50;

/// Upper bound on pages walked while listing coins.
const MAX_COIN_PAGES: usize = 20;

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoinPage {
    data: Vec<Coin>,
    #[serde(default)]
    next_cursor: Option<String>,
    #[serde(default)]
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionBlockBytes {
    tx_bytes: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Effects {
    status: ExecutionStatus,
    #[serde(default)]
    transaction_digest: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionResponse {
    #[serde(default)]
    digest: Option<String>,
    effects: Effects,
    #[serde(default)]
    balance_changes: Vec<BalanceChange>,
}

impl From<TransactionResponse> for TransactionOutcome {
    fn from(response: TransactionResponse) -> Self {
        Self {
            digest: response
                .digest
                .or(response.effects.transaction_digest)
                .unwrap_or_default(),
            status: response.effects.status,
            balance_changes: response.balance_changes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Balance {
    total_balance: String,
}

/// A [`SuiRpc`] implementation speaking JSON-RPC 2.0 over HTTP.
///
/// Transfers are built with the node's `unsafe_paySui` / `unsafe_pay`
/// builders, so no Move or BCS tooling is needed locally. Signing stays
/// with the caller.
#[derive(Debug, Clone)]
pub struct SuiRpcClient {
    http: reqwest::Client,
    url: Url,
    next_id: Arc<AtomicU64>,
}

impl SuiRpcClient {
    /// Creates a client for the node at `url` with [`DEFAULT_RPC_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Transport`] if the HTTP client cannot be built.
    pub fn new(url: Url) -> Result<Self, RpcError> {
        Self::with_timeout(url, DEFAULT_RPC_TIMEOUT)
    }

    /// Creates a client whose requests fail after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Transport`] if the HTTP client cannot be built.
    pub fn with_timeout(url: Url, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_http_client(http, url))
    }

    /// Creates a client that sends requests through `http`.
    #[must_use]
    pub fn with_http_client(http: reqwest::Client, url: Url) -> Self {
        Self {
            http,
            url,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Returns the node endpoint.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response: JsonRpcResponse = self
            .http
            .post(self.url.clone())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            #[cfg(feature = "telemetry")]
            tracing::debug!(method, code = error.code, message = %error.message, "rpc error");
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        let result = response
            .result
            .ok_or_else(|| RpcError::InvalidResponse(format!("{method}: missing result")))?;
        serde_json::from_value(result)
            .map_err(|e| RpcError::InvalidResponse(format!("{method}: {e}")))
    }
}

#[async_trait]
impl SuiRpc for SuiRpcClient {
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(owner = %owner)))]
    async fn get_coins(&self, owner: &SuiAddress, coin_type: &str) -> Result<Vec<Coin>, RpcError> {
        let mut coins = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0..MAX_COIN_PAGES {
            let page: CoinPage = self
                .call(
                    "suix_getCoins",
                    json!([owner, coin_type, cursor, COINS_PAGE_LIMIT]),
                )
                .await?;
            coins.extend(page.data);
            match page.next_cursor {
                Some(next) if page.has_next_page => cursor = Some(next),
                _ => break,
            }
        }
        Ok(coins)
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(
        sender = %request.sender,
        recipient = %request.recipient,
        amount = request.amount,
    )))]
    async fn build_transfer(&self, request: &TransferRequest) -> Result<Vec<u8>, RpcError> {
        let native = coin_types_match(&request.coin_type, SUI_COIN_TYPE);
        let coins = self.get_coins(&request.sender, &request.coin_type).await?;
        let target = if native {
            u128::from(request.amount) + u128::from(request.gas_budget)
        } else {
            u128::from(request.amount)
        };
        let inputs = select_coins(&coins, target)?;

        let recipients = [request.recipient];
        let amounts = [request.amount.to_string()];
        let gas_budget = request.gas_budget.to_string();
        let built: TransactionBlockBytes = if native {
            self.call(
                "unsafe_paySui",
                json!([request.sender, inputs, recipients, amounts, gas_budget]),
            )
            .await?
        } else {
            self.call(
                "unsafe_pay",
                json!([
                    request.sender,
                    inputs,
                    recipients,
                    amounts,
                    Value::Null,
                    gas_budget
                ]),
            )
            .await?
        };

        Base64Bytes::from(built.tx_bytes.as_str())
            .decode()
            .map_err(|e| RpcError::InvalidResponse(format!("txBytes: {e}")))
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err))]
    async fn dry_run(&self, tx_bytes: &[u8]) -> Result<TransactionOutcome, RpcError> {
        let tx = Base64Bytes::encode(tx_bytes);
        let response: TransactionResponse = self
            .call("sui_dryRunTransactionBlock", json!([tx.as_str()]))
            .await?;
        Ok(response.into())
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err))]
    async fn execute(
        &self,
        tx_bytes: &[u8],
        signature: &str,
    ) -> Result<TransactionOutcome, RpcError> {
        let tx = Base64Bytes::encode(tx_bytes);
        let response: TransactionResponse = self
            .call(
                "sui_executeTransactionBlock",
                json!([
                    tx.as_str(),
                    [signature],
                    { "showEffects": true, "showBalanceChanges": true },
                    "WaitForLocalExecution"
                ]),
            )
            .await?;
        Ok(response.into())
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(owner = %owner)))]
    async fn get_balance(&self, owner: &SuiAddress, coin_type: &str) -> Result<u128, RpcError> {
        let balance: Balance = self
            .call("suix_getBalance", json!([owner, coin_type]))
            .await?;
        balance
            .total_balance
            .parse()
            .map_err(|_| RpcError::InvalidResponse(format!("totalBalance {:?}", balance.total_balance)))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn rpc_result(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
    }

    fn address(byte: &str) -> SuiAddress {
        format!("0x{}", byte.repeat(32)).parse().unwrap()
    }

    async fn client(server: &MockServer) -> SuiRpcClient {
        SuiRpcClient::new(Url::parse(&server.uri()).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_get_coins_follows_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "suix_getCoins", "params": [address("bb"), "0x2::sui::SUI", null, 50] })))
            .respond_with(rpc_result(json!({
                "data": [{ "coinType": "0x2::sui::SUI", "coinObjectId": "0x1", "version": "1", "digest": "d", "balance": "10" }],
                "nextCursor": "0x1",
                "hasNextPage": true
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "suix_getCoins", "params": [address("bb"), "0x2::sui::SUI", "0x1", 50] })))
            .respond_with(rpc_result(json!({
                "data": [{ "coinType": "0x2::sui::SUI", "coinObjectId": "0x2", "version": "1", "digest": "d", "balance": "20" }],
                "nextCursor": null,
                "hasNextPage": false
            })))
            .mount(&server)
            .await;

        let coins = client(&server)
            .await
            .get_coins(&address("bb"), "0x2::sui::SUI")
            .await
            .unwrap();
        let ids: Vec<_> = coins.iter().map(|c| c.coin_object_id.as_str()).collect();
        assert_eq!(ids, ["0x1", "0x2"]);
    }

    #[tokio::test]
    async fn test_native_transfer_uses_pay_sui() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "suix_getCoins" })))
            .respond_with(rpc_result(json!({
                "data": [
                    { "coinType": "0x2::sui::SUI", "coinObjectId": "0xsmall", "version": "1", "digest": "d", "balance": "1000" },
                    { "coinType": "0x2::sui::SUI", "coinObjectId": "0xbig", "version": "1", "digest": "d", "balance": "500000000" }
                ],
                "nextCursor": null,
                "hasNextPage": false
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "unsafe_paySui",
                "params": [address("bb"), ["0xbig"], [address("aa")], ["100000000"], "10000000"]
            })))
            .respond_with(rpc_result(json!({ "txBytes": "AQID", "gas": [], "inputObjects": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let bytes = client(&server)
            .await
            .build_transfer(&TransferRequest {
                sender: address("bb"),
                recipient: address("aa"),
                coin_type: "0x2::sui::SUI".into(),
                amount: 100_000_000,
                gas_budget: 10_000_000,
            })
            .await
            .unwrap();
        assert_eq!(bytes, [1, 2, 3]);
    }

    #[tokio::test]
    async fn test_transfer_shortfall_is_insufficient_funds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "suix_getCoins" })))
            .respond_with(rpc_result(json!({
                "data": [{ "coinType": "0x2::sui::SUI", "coinObjectId": "0x1", "version": "1", "digest": "d", "balance": "100000000" }],
                "nextCursor": null,
                "hasNextPage": false
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .build_transfer(&TransferRequest {
                sender: address("bb"),
                recipient: address("aa"),
                coin_type: "0x2::sui::SUI".into(),
                amount: 100_000_000,
                gas_budget: 10_000_000,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::InsufficientFunds { required: 110_000_000, .. }));
    }

    #[tokio::test]
    async fn test_dry_run_parses_effects() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "sui_dryRunTransactionBlock", "params": ["AQID"] })))
            .respond_with(rpc_result(json!({
                "effects": {
                    "status": { "status": "success" },
                    "transactionDigest": "9xDigest"
                },
                "balanceChanges": [
                    { "owner": { "AddressOwner": address("aa") }, "coinType": "0x2::sui::SUI", "amount": "100000000" }
                ],
                "events": [],
                "objectChanges": []
            })))
            .mount(&server)
            .await;

        let outcome = client(&server).await.dry_run(&[1, 2, 3]).await.unwrap();
        assert!(outcome.status.is_success());
        assert_eq!(outcome.digest, "9xDigest");
        assert_eq!(outcome.credit_to(&address("aa"), "0x2::sui::SUI"), Some(100_000_000));
    }

    #[tokio::test]
    async fn test_rpc_error_object_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32002, "message": "Invalid user signature" }
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .execute(&[1, 2, 3], "sig")
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Rpc { code: -32002, ref message } if message == "Invalid user signature"));
    }

    #[tokio::test]
    async fn test_stalled_node_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_result(json!({})).set_delay(Duration::from_secs(600)))
            .mount(&server)
            .await;

        let client = SuiRpcClient::with_timeout(
            Url::parse(&server.uri()).unwrap(),
            Duration::from_millis(200),
        )
        .unwrap();
        let started = std::time::Instant::now();
        let err = client
            .get_coins(&address("bb"), "0x2::sui::SUI")
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Transport(ref e) if e.is_timeout()));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_get_balance_parses_total() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "suix_getBalance" })))
            .respond_with(rpc_result(json!({
                "coinType": "0x2::sui::SUI",
                "coinObjectCount": 2,
                "totalBalance": "1500000000",
                "lockedBalance": {}
            })))
            .mount(&server)
            .await;

        let balance = client(&server)
            .await
            .get_balance(&address("bb"), "0x2::sui::SUI")
            .await
            .unwrap();
        assert_eq!(balance, 1_500_000_000);
    }
}
