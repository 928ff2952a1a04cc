//! Client adapter: builds and signs the transfer that pays a requirement.

use std::sync::Arc;

use s402::encoding::Base64Bytes;
use s402::error::ClientError;
use s402::network::NetworkId;
use s402::proto::{PaymentPayload, PaymentRequirements, X402_VERSION};
use s402::scheme::{BoxFuture, Scheme, SchemeClient, SchemeId};
#[cfg(feature = "telemetry")]
use tracing::instrument;

use super::{ExactSuiPayload, SuiExact};
use crate::chain::{RpcError, SuiAddress, SuiRpc, TransferRequest, coin_types_match};
use crate::networks::{DEFAULT_GAS_BUDGET, SUI_COIN_TYPE};
use crate::signer::SuiSigner;

/// Pays exact-scheme requirements on one Sui network.
///
/// Reads the signer's coins, asks the node to build a transfer, and signs
/// it locally. Nothing is broadcast; the facilitator settles the payload.
#[derive(Clone)]
pub struct ExactSuiClient<R> {
    signer: Arc<SuiSigner>,
    rpc: R,
    network: NetworkId,
    asset: String,
    gas_budget: u64,
}

impl<R> ExactSuiClient<R> {
    /// Creates a client paying native SUI on `network`.
    pub fn new(signer: Arc<SuiSigner>, rpc: R, network: NetworkId) -> Self {
        Self {
            signer,
            rpc,
            network,
            asset: SUI_COIN_TYPE.to_owned(),
            gas_budget: DEFAULT_GAS_BUDGET,
        }
    }

    /// Pays with `coin_type` instead of SUI. Gas is still paid in SUI.
    #[must_use]
    pub fn with_asset(mut self, coin_type: impl Into<String>) -> Self {
        self.asset = coin_type.into();
        self
    }

    /// Overrides the gas budget in MIST.
    #[must_use]
    pub const fn with_gas_budget(mut self, gas_budget: u64) -> Self {
        self.gas_budget = gas_budget;
        self
    }

    /// Returns the paying address.
    #[must_use]
    pub fn address(&self) -> SuiAddress {
        self.signer.address()
    }

    /// Returns the coin type this client pays with.
    #[must_use]
    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// Returns the network this client pays on.
    #[must_use]
    pub const fn network(&self) -> &NetworkId {
        &self.network
    }
}

impl<R> std::fmt::Debug for ExactSuiClient<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExactSuiClient")
            .field("address", &self.signer.address())
            .field("network", &self.network)
            .field("asset", &self.asset)
            .finish_non_exhaustive()
    }
}

impl<R: SuiRpc> ExactSuiClient<R> {
    fn transfer_request(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<TransferRequest, ClientError> {
        if !coin_types_match(&requirements.asset, &self.asset) {
            return Err(ClientError::UnsupportedAsset {
                expected: self.asset.clone(),
                actual: requirements.asset.clone(),
            });
        }
        let network: NetworkId = requirements
            .network
            .parse()
            .map_err(|_| ClientError::UnsupportedNetwork(requirements.network.clone()))?;
        if network != self.network {
            return Err(ClientError::UnsupportedNetwork(requirements.network.clone()));
        }
        let recipient: SuiAddress = requirements.pay_to.parse().map_err(|_| {
            ClientError::InvalidRequirements(format!("payTo {:?}", requirements.pay_to))
        })?;
        let amount: u64 = requirements.amount.parse().map_err(|_| {
            ClientError::InvalidRequirements(format!("amount {:?}", requirements.amount))
        })?;

        Ok(TransferRequest {
            sender: self.signer.address(),
            recipient,
            coin_type: self.asset.clone(),
            amount,
            gas_budget: self.gas_budget,
        })
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(
        network = %requirements.network,
        amount = %requirements.amount,
    )))]
    async fn build_payload(
        &self,
        x402_version: Option<u32>,
        requirements: &PaymentRequirements,
    ) -> Result<PaymentPayload, ClientError> {
        let request = self.transfer_request(requirements)?;
        let tx_bytes = self
            .rpc
            .build_transfer(&request)
            .await
            .map_err(|e| match e {
                RpcError::Transport(_) => ClientError::ChainUnavailable(e.to_string()),
                RpcError::Rpc { .. }
                | RpcError::InvalidResponse(_)
                | RpcError::InsufficientFunds { .. } => ClientError::BuildFailed(e.to_string()),
            })?;
        let signature = self.signer.sign_transaction(&tx_bytes);

        let payload = ExactSuiPayload {
            signature,
            transaction: Base64Bytes::encode(&tx_bytes).to_string(),
        };
        Ok(PaymentPayload::new(
            x402_version.unwrap_or(X402_VERSION),
            payload.into_value(),
            requirements.clone(),
        ))
    }
}

impl<R> SchemeId for ExactSuiClient<R> {
    fn namespace(&self) -> &str {
        SuiExact.namespace()
    }

    fn scheme(&self) -> Scheme {
        SuiExact.scheme()
    }
}

impl<R: SuiRpc> SchemeClient for ExactSuiClient<R> {
    fn create_payment_payload<'a>(
        &'a self,
        x402_version: Option<u32>,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<PaymentPayload, ClientError>> {
        Box::pin(self.build_payload(x402_version, requirements))
    }

    fn accepts(&self, requirements: &PaymentRequirements) -> bool {
        requirements.scheme == self.scheme().as_str()
            && requirements.network == self.network.to_string()
            && coin_types_match(&requirements.asset, &self.asset)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use url::Url;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::chain::SuiRpcClient;
    use crate::signer::verify_transaction_signature;

    const SEED_HEX: &str = "0202020202020202020202020202020202020202020202020202020202020202";

    fn requirements(asset: &str, amount: &str) -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".into(),
            network: "sui:testnet".into(),
            asset: asset.into(),
            amount: amount.into(),
            pay_to: format!("0x{}", "aa".repeat(32)),
            max_timeout_seconds: 60,
            extra: json!({}),
        }
    }

    fn rpc_result(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
    }

    fn client(server: &MockServer) -> ExactSuiClient<SuiRpcClient> {
        let signer = Arc::new(SuiSigner::from_key_material(SEED_HEX).unwrap());
        let rpc = SuiRpcClient::new(Url::parse(&server.uri()).unwrap()).unwrap();
        ExactSuiClient::new(signer, rpc, "sui:testnet".parse().unwrap())
    }

    #[tokio::test]
    async fn test_payload_carries_signed_transfer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "suix_getCoins" })))
            .respond_with(rpc_result(json!({
                "data": [{ "coinType": "0x2::sui::SUI", "coinObjectId": "0xc0", "version": "1", "digest": "d", "balance": "900000000" }],
                "nextCursor": null,
                "hasNextPage": false
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "unsafe_paySui" })))
            .respond_with(rpc_result(json!({ "txBytes": "AAECAwQ=" })))
            .mount(&server)
            .await;

        let client = client(&server);
        let reqs = requirements("0x2::sui::SUI", "100000000");
        let payload = client.create_payment_payload(None, &reqs).await.unwrap();

        assert_eq!(payload.x402_version, 2);
        assert_eq!(payload.accepted, reqs);
        let exact = ExactSuiPayload::from_value(&payload.payload).unwrap();
        assert_eq!(exact.transaction, "AAECAwQ=");
        let signer = verify_transaction_signature(&[0, 1, 2, 3, 4], &exact.signature).unwrap();
        assert_eq!(signer, client.address());
    }

    #[tokio::test]
    async fn test_foreign_asset_is_rejected_without_rpc() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server)
            .create_payment_payload(None, &requirements("0x5::usdc::USDC", "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedAsset { .. }));
    }

    #[tokio::test]
    async fn test_bad_requirements_are_rejected() {
        let server = MockServer::start().await;
        let client = client(&server);

        let mut reqs = requirements("0x2::sui::SUI", "-5");
        let err = client.create_payment_payload(None, &reqs).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequirements(_)));

        reqs.amount = "5".into();
        reqs.network = "sui:mainnet".into();
        let err = client.create_payment_payload(None, &reqs).await.unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedNetwork(_)));
    }

    #[tokio::test]
    async fn test_shortfall_is_build_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "suix_getCoins" })))
            .respond_with(rpc_result(json!({ "data": [], "nextCursor": null, "hasNextPage": false })))
            .mount(&server)
            .await;

        let err = client(&server)
            .create_payment_payload(Some(2), &requirements("0x2::sui::SUI", "100"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::BuildFailed(ref msg) if msg.contains("insufficient funds")));
    }

    #[test]
    fn test_accepts_matches_network_and_asset() {
        let signer = Arc::new(SuiSigner::from_key_material(SEED_HEX).unwrap());
        let rpc = SuiRpcClient::new(Url::parse("http://127.0.0.1:9").unwrap()).unwrap();
        let client = ExactSuiClient::new(signer, rpc, "sui:testnet".parse().unwrap());

        let long_form = requirements(
            "0x0000000000000000000000000000000000000000000000000000000000000002::sui::SUI",
            "1",
        );
        assert!(client.accepts(&long_form));

        let mut other_network = long_form.clone();
        other_network.network = "sui:mainnet".into();
        assert!(!client.accepts(&other_network));

        let mut other_scheme = long_form;
        other_scheme.scheme = "upto".into();
        assert!(!client.accepts(&other_scheme));
    }
}
