//! The payment agent: HTTP fetch with automatic 402 payment under a spend
//! ceiling.
//!
//! Every fetch holds the agent's payment lane from the first budget check
//! to the ledger commit, so concurrent fetches are serialized and can never
//! spend past the ceiling together.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use s402::network::NetworkId;
use s402::scheme::SchemeClient;
use s402_http::constants::{HTTP_STATUS_PAYMENT_REQUIRED, PAYMENT_SIGNATURE_HEADER};
use s402_http::headers::{encode_payment_signature, extract_payment_required, settlement_digest};
use s402_sui::exact::ExactSuiClient;
use s402_sui::networks::SUI_COIN_TYPE;
use s402_sui::{SuiAddress, SuiRpc, SuiRpcClient, SuiSigner};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AgentError;
use crate::ledger::{Ledger, LedgerError, NewPayment, SpendCounters, SpendingEntry};

/// Timeout for outbound requests without a payment-specific bound.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on building and signing one payment.
pub const DEFAULT_PAYMENT_BUILD_TIMEOUT: Duration = Duration::from_secs(30);

/// Default page size of [`PaymentAgent::list_spending`].
pub const DEFAULT_SPENDING_LIMIT: u32 = 50;

/// Largest page size of [`PaymentAgent::list_spending`].
pub const MAX_SPENDING_LIMIT: u32 = 500;

/// The paying side of the agent: a scheme client plus a balance source.
pub struct AgentWallet {
    address: SuiAddress,
    client: Arc<dyn SchemeClient>,
    rpc: Arc<dyn SuiRpc>,
    coin_type: String,
}

impl AgentWallet {
    /// Creates a wallet from its parts.
    pub fn new(
        address: SuiAddress,
        client: Arc<dyn SchemeClient>,
        rpc: Arc<dyn SuiRpc>,
        coin_type: impl Into<String>,
    ) -> Self {
        Self {
            address,
            client,
            rpc,
            coin_type: coin_type.into(),
        }
    }

    /// Creates a wallet paying native SUI through the `exact` scheme.
    #[must_use]
    pub fn sui(signer: SuiSigner, rpc: SuiRpcClient, network: NetworkId, gas_budget: u64) -> Self {
        let address = signer.address();
        let client = ExactSuiClient::new(Arc::new(signer), rpc.clone(), network)
            .with_gas_budget(gas_budget);
        Self::new(address, Arc::new(client), Arc::new(rpc), SUI_COIN_TYPE)
    }

    /// Returns the paying address.
    #[must_use]
    pub const fn address(&self) -> SuiAddress {
        self.address
    }
}

impl std::fmt::Debug for AgentWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentWallet")
            .field("address", &self.address)
            .field("scheme", &self.client.id())
            .field("coin_type", &self.coin_type)
            .finish_non_exhaustive()
    }
}

/// A request for [`PaymentAgent::fetch`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Absolute URL of the resource.
    pub url: String,
    /// HTTP method, `GET` when absent.
    #[serde(default)]
    pub method: Option<String>,
    /// Request body, sent as-is on both attempts.
    #[serde(default)]
    pub body: Option<String>,
    /// Extra request headers, sent on both attempts.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl FetchRequest {
    /// Creates a `GET` request for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// The final response of a fetch.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Status of the final response.
    pub status: StatusCode,
    /// Headers of the final response.
    pub headers: HeaderMap,
    /// Body of the final response.
    pub body: Vec<u8>,
    /// The ledger row written, when a payment was made.
    pub payment: Option<SpendingEntry>,
}

/// Read-only snapshot of the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInfo {
    /// Whether a signing key is configured.
    pub configured: bool,
    /// Paying address, when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Network payments are made on.
    pub network: String,
    /// Base units spent so far.
    pub total_spent: String,
    /// Spend ceiling in base units.
    pub max_spend: String,
    /// Base units left under the ceiling.
    pub remaining: String,
    /// Number of ledger rows.
    pub payments: u64,
}

/// On-chain balance of the paying address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentBalance {
    /// Paying address.
    pub address: String,
    /// Network the balance was read on.
    pub network: String,
    /// Coin type of the balance.
    pub coin_type: String,
    /// Balance in base units.
    pub balance: String,
}

/// A page of ledger rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingPage {
    /// Rows, newest first.
    pub entries: Vec<SpendingEntry>,
    /// Page size used.
    pub limit: u32,
    /// Rows skipped.
    pub offset: u32,
}

/// Pays for HTTP resources on a caller's behalf, up to a spend ceiling.
pub struct PaymentAgent {
    network: NetworkId,
    wallet: Option<AgentWallet>,
    http: reqwest::Client,
    ledger: Ledger,
    counters: Mutex<SpendCounters>,
    payments: tokio::sync::Mutex<()>,
    build_timeout: Duration,
}

impl std::fmt::Debug for PaymentAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentAgent")
            .field("network", &self.network)
            .field("wallet", &self.wallet)
            .finish_non_exhaustive()
    }
}

impl PaymentAgent {
    /// Creates an agent over `ledger`, reconciling its spend counter.
    ///
    /// `default_max_spend` applies only when the ledger has no stored
    /// ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Storage`] if reconciliation fails, or
    /// [`AgentError::UpstreamRequestFailed`] if the HTTP client cannot be
    /// built.
    pub fn new(
        network: NetworkId,
        wallet: Option<AgentWallet>,
        ledger: Ledger,
        default_max_spend: u128,
    ) -> Result<Self, AgentError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AgentError::UpstreamRequestFailed(e.to_string()))?;
        Self::with_http_client(network, wallet, ledger, default_max_spend, http)
    }

    /// Like [`new`](Self::new), sending requests through `http`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Storage`] if reconciliation fails.
    pub fn with_http_client(
        network: NetworkId,
        wallet: Option<AgentWallet>,
        ledger: Ledger,
        default_max_spend: u128,
        http: reqwest::Client,
    ) -> Result<Self, AgentError> {
        let counters = ledger.reconcile(default_max_spend)?;
        tracing::info!(
            network = %network,
            address = ?wallet.as_ref().map(AgentWallet::address),
            total_spent = %counters.total_spent,
            max_spend = %counters.max_spend,
            "Payment agent ready"
        );
        Ok(Self {
            network,
            wallet,
            http,
            ledger,
            counters: Mutex::new(counters),
            payments: tokio::sync::Mutex::new(()),
            build_timeout: DEFAULT_PAYMENT_BUILD_TIMEOUT,
        })
    }

    /// Bounds how long building and signing a payment may take.
    #[must_use]
    pub const fn with_build_timeout(mut self, timeout: Duration) -> Self {
        self.build_timeout = timeout;
        self
    }

    fn counters(&self) -> Result<SpendCounters, AgentError> {
        self.counters
            .lock()
            .map(|c| *c)
            .map_err(|_| AgentError::Storage(LedgerError::Poisoned))
    }

    fn ensure_budget(&self, requested: u128) -> Result<(), AgentError> {
        let SpendCounters {
            total_spent,
            max_spend,
        } = self.counters()?;
        let exhausted = total_spent >= max_spend
            || total_spent
                .checked_add(requested)
                .is_none_or(|next| next > max_spend);
        if exhausted {
            return Err(AgentError::BudgetExhausted {
                total_spent,
                max_spend,
                requested,
            });
        }
        Ok(())
    }

    /// Returns a snapshot of the agent's state.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Storage`] if the ledger cannot be read.
    pub fn info(&self) -> Result<AgentInfo, AgentError> {
        let counters = self.counters()?;
        Ok(AgentInfo {
            configured: self.wallet.is_some(),
            address: self.wallet.as_ref().map(|w| w.address.to_string()),
            network: self.network.to_string(),
            total_spent: counters.total_spent.to_string(),
            max_spend: counters.max_spend.to_string(),
            remaining: counters
                .max_spend
                .saturating_sub(counters.total_spent)
                .to_string(),
            payments: self.ledger.count()?,
        })
    }

    /// Reads the paying address's on-chain balance.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::NotConfigured`] without a wallet, or
    /// [`AgentError::BalanceUnavailable`] if the node cannot be read.
    pub async fn balance(&self) -> Result<AgentBalance, AgentError> {
        let wallet = self.wallet.as_ref().ok_or(AgentError::NotConfigured)?;
        let balance = wallet
            .rpc
            .get_balance(&wallet.address, &wallet.coin_type)
            .await
            .map_err(|e| AgentError::BalanceUnavailable(e.to_string()))?;
        Ok(AgentBalance {
            address: wallet.address.to_string(),
            network: self.network.to_string(),
            coin_type: wallet.coin_type.clone(),
            balance: balance.to_string(),
        })
    }

    /// Returns ledger rows, newest first.
    ///
    /// `limit` defaults to [`DEFAULT_SPENDING_LIMIT`] and is clamped to
    /// `1..=MAX_SPENDING_LIMIT`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Storage`] if the ledger cannot be read.
    pub fn list_spending(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<SpendingPage, AgentError> {
        let limit = limit
            .unwrap_or(DEFAULT_SPENDING_LIMIT)
            .clamp(1, MAX_SPENDING_LIMIT);
        let offset = offset.unwrap_or(0);
        Ok(SpendingPage {
            entries: self.ledger.list(limit, offset)?,
            limit,
            offset,
        })
    }

    /// Replaces the spend ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidBudget`] unless `max_spend` is a
    /// non-negative base-unit integer, or [`AgentError::Storage`] if it
    /// cannot be persisted.
    pub fn set_budget(&self, max_spend: &str) -> Result<AgentInfo, AgentError> {
        let value = max_spend.trim();
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AgentError::InvalidBudget(format!(
                "{max_spend:?} is not a non-negative integer"
            )));
        }
        let value: u128 = value
            .parse()
            .map_err(|_| AgentError::InvalidBudget(format!("{max_spend:?} is out of range")))?;

        {
            let mut counters = self
                .counters
                .lock()
                .map_err(|_| AgentError::Storage(LedgerError::Poisoned))?;
            self.ledger.set_max_spend(value)?;
            counters.max_spend = value;
        }
        tracing::info!(max_spend = %value, "Budget updated");
        self.info()
    }

    /// Fetches `request`, paying automatically when the server answers 402.
    ///
    /// A non-402 first response is returned untouched and records nothing.
    /// On 402 the first acceptable requirement is paid, the request is
    /// retried with the payment attached, and a successful retry is
    /// recorded in the ledger.
    ///
    /// # Errors
    ///
    /// - [`AgentError::NotConfigured`] without a wallet
    /// - [`AgentError::BudgetExhausted`] when the ceiling is reached, or
    ///   would be passed by the quoted price
    /// - [`AgentError::InvalidRequest`] for a bad URL, method, or header
    /// - [`AgentError::UpstreamRequestFailed`] if the target is unreachable
    /// - [`AgentError::AutoPaymentFailed`] if the payment cannot be built
    ///   in time or the paid retry does not succeed
    /// - [`AgentError::Storage`] if the ledger commit fails
    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchOutcome, AgentError> {
        let wallet = self.wallet.as_ref().ok_or(AgentError::NotConfigured)?;
        let target = Target::parse(&request)?;

        let _lane = self.payments.lock().await;
        self.ensure_budget(0)?;

        let first = target
            .builder(&self.http)
            .send()
            .await
            .map_err(|e| AgentError::UpstreamRequestFailed(e.to_string()))?;
        if first.status().as_u16() != HTTP_STATUS_PAYMENT_REQUIRED {
            tracing::debug!(url = %target.url, status = %first.status(), "No payment required");
            return read_outcome(first, None).await;
        }

        let challenge_headers = first.headers().clone();
        let challenge_body = first
            .bytes()
            .await
            .map_err(|e| AgentError::UpstreamRequestFailed(e.to_string()))?;
        let required = extract_payment_required(&challenge_headers, &challenge_body)
            .map_err(|e| AgentError::AutoPaymentFailed(e.to_string()))?;
        let requirements = required
            .accepts
            .iter()
            .find(|r| wallet.client.accepts(r))
            .ok_or_else(|| {
                AgentError::AutoPaymentFailed(format!(
                    "no acceptable requirements among {} offered",
                    required.accepts.len()
                ))
            })?;
        let amount: u128 = requirements.amount.parse().map_err(|_| {
            AgentError::AutoPaymentFailed(format!("amount {:?}", requirements.amount))
        })?;
        self.ensure_budget(amount)?;

        let build = wallet
            .client
            .create_payment_payload(Some(required.x402_version), requirements);
        let payload = tokio::time::timeout(self.build_timeout, build)
            .await
            .map_err(|_| {
                AgentError::AutoPaymentFailed(format!(
                    "building the payment timed out after {:?}",
                    self.build_timeout
                ))
            })?
            .map_err(|e| AgentError::AutoPaymentFailed(e.to_string()))?;
        let signature = encode_payment_signature(&payload)
            .map_err(|e| AgentError::AutoPaymentFailed(e.to_string()))?;

        let mut retry = target
            .builder(&self.http)
            .header(PAYMENT_SIGNATURE_HEADER, signature);
        if requirements.max_timeout_seconds > 0 {
            retry = retry.timeout(Duration::from_secs(requirements.max_timeout_seconds));
        }
        let paid = retry
            .send()
            .await
            .map_err(|e| AgentError::AutoPaymentFailed(format!("paid request failed: {e}")))?;
        if !paid.status().is_success() {
            return Err(AgentError::AutoPaymentFailed(format!(
                "paid request returned {}",
                paid.status()
            )));
        }

        let digest = settlement_digest(paid.headers()).unwrap_or_default();
        let entry = self.commit(&NewPayment {
            url: target.url.as_str(),
            amount,
            network: &requirements.network,
            digest: &digest,
        })?;
        tracing::info!(
            url = %entry.url,
            amount = %entry.amount,
            network = %entry.network,
            digest = %entry.digest,
            "Auto-payment recorded"
        );
        read_outcome(paid, Some(entry)).await
    }

    fn commit(&self, payment: &NewPayment<'_>) -> Result<SpendingEntry, AgentError> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| AgentError::Storage(LedgerError::Poisoned))?;
        let entry = self.ledger.record_payment(payment)?;
        counters.total_spent = counters.total_spent.saturating_add(payment.amount);
        Ok(entry)
    }
}

struct Target {
    url: Url,
    method: Method,
    headers: HeaderMap,
    body: Option<String>,
}

impl Target {
    fn parse(request: &FetchRequest) -> Result<Self, AgentError> {
        let url = Url::parse(&request.url)
            .map_err(|e| AgentError::InvalidRequest(format!("url {:?}: {e}", request.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AgentError::InvalidRequest(format!(
                "url {:?}: only http and https are supported",
                request.url
            )));
        }
        let method = match request.method.as_deref() {
            None => Method::GET,
            Some(m) => Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
                .map_err(|_| AgentError::InvalidRequest(format!("method {m:?}")))?,
        };
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| AgentError::InvalidRequest(format!("header name {name:?}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| AgentError::InvalidRequest(format!("header {name} value")))?;
            headers.insert(name, value);
        }
        Ok(Self {
            url,
            method,
            headers,
            body: request.body.clone(),
        })
    }

    fn builder(&self, http: &reqwest::Client) -> reqwest::RequestBuilder {
        let builder = http
            .request(self.method.clone(), self.url.clone())
            .headers(self.headers.clone());
        match &self.body {
            Some(body) => builder.body(body.clone()),
            None => builder,
        }
    }
}

async fn read_outcome(
    response: reqwest::Response,
    payment: Option<SpendingEntry>,
) -> Result<FetchOutcome, AgentError> {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .bytes()
        .await
        .map_err(|e| AgentError::UpstreamRequestFailed(e.to_string()))?;
    Ok(FetchOutcome {
        status,
        headers,
        body: body.to_vec(),
        payment,
    })
}
