//! Facilitator adapter: verifies by dry run, settles by execution.
//!
//! Verification trusts nothing the client claims. The signature must verify
//! over the transaction bytes, and the recipient credit and the payer are
//! both read from the balance changes the node reports, so a payload whose
//! `accepted` copy lies about the amount or the sender cannot pass.

use std::sync::Arc;

use s402::error::{ErrorReason, PaymentProblem};
use s402::network::NetworkId;
use s402::proto::{PaymentPayload, PaymentRequirements, SettleResponse, VerifyResponse};
use s402::scheme::{BoxFuture, Scheme, SchemeFacilitator, SchemeId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
#[cfg(feature = "telemetry")]
use tracing::instrument;

use super::{ExactSuiPayload, SuiExact};
use crate::chain::{SuiAddress, SuiRpc, TransactionOutcome, coin_types_match};
use crate::networks::SUI_COIN_TYPE;
use crate::signer::{SuiSigner, verify_transaction_signature};

/// Tunables for [`ExactSuiFacilitator`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactSuiFacilitatorConfig {
    /// Dry-run the transaction before executing it in `settle`, and refuse
    /// to broadcast anything that would not verify.
    #[serde(default)]
    pub verify_before_settle: bool,
}

/// Verifies and settles Sui exact payments for one asset.
pub struct ExactSuiFacilitator<R> {
    rpc: R,
    signer: Arc<SuiSigner>,
    asset: String,
    config: ExactSuiFacilitatorConfig,
}

impl<R> ExactSuiFacilitator<R> {
    /// Creates a facilitator for native SUI with the default configuration.
    pub fn new(rpc: R, signer: Arc<SuiSigner>) -> Self {
        Self {
            rpc,
            signer,
            asset: SUI_COIN_TYPE.to_owned(),
            config: ExactSuiFacilitatorConfig::default(),
        }
    }

    /// Creates a facilitator from an optional JSON configuration block.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` does not deserialize.
    pub fn from_config(
        rpc: R,
        signer: Arc<SuiSigner>,
        config: Option<Value>,
    ) -> Result<Self, serde_json::Error> {
        let config = config
            .map(serde_json::from_value::<ExactSuiFacilitatorConfig>)
            .transpose()?
            .unwrap_or_default();
        Ok(Self::new(rpc, signer).with_config(config))
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ExactSuiFacilitatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Accepts `coin_type` instead of SUI.
    #[must_use]
    pub fn with_asset(mut self, coin_type: impl Into<String>) -> Self {
        self.asset = coin_type.into();
        self
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &ExactSuiFacilitatorConfig {
        &self.config
    }
}

impl<R> std::fmt::Debug for ExactSuiFacilitator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExactSuiFacilitator")
            .field("signer", &self.signer.address())
            .field("asset", &self.asset)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Checks a dry-run outcome against the recipient and amount.
///
/// Returns the payer, which is `None` when no debit of the asset shows up.
///
/// # Errors
///
/// Returns `simulation_failed`, `no_transfer`, or `insufficient_amount`.
pub fn check_outcome(
    outcome: &TransactionOutcome,
    asset: &str,
    pay_to: &SuiAddress,
    required: u128,
) -> Result<Option<SuiAddress>, PaymentProblem> {
    if !outcome.status.is_success() {
        return Err(PaymentProblem::new(
            ErrorReason::SimulationFailed,
            outcome.status.error().unwrap_or("dry run failed").to_owned(),
        ));
    }
    let credited = outcome.credit_to(pay_to, asset).ok_or_else(|| {
        PaymentProblem::new(
            ErrorReason::NoTransfer,
            format!("no credit of {asset} to {pay_to}"),
        )
    })?;
    if credited < required {
        return Err(PaymentProblem::new(
            ErrorReason::InsufficientAmount,
            format!("credited {credited}, required {required}"),
        ));
    }
    Ok(outcome.payer(asset))
}

impl<R: SuiRpc> ExactSuiFacilitator<R> {
    fn decode(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<(ExactSuiPayload, Vec<u8>), PaymentProblem> {
        let exact = ExactSuiPayload::from_value(&payload.payload)?;
        if !coin_types_match(&requirements.asset, &self.asset) {
            return Err(PaymentProblem::new(
                ErrorReason::UnsupportedAsset,
                format!("expected {}, got {}", self.asset, requirements.asset),
            ));
        }
        let tx_bytes = exact.transaction_bytes()?;
        verify_transaction_signature(&tx_bytes, &exact.signature).map_err(|e| {
            PaymentProblem::new(ErrorReason::InvalidPayload, e.to_string())
        })?;
        Ok((exact, tx_bytes))
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(
        network = %requirements.network,
        amount = %requirements.amount,
    )))]
    async fn check(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<Option<SuiAddress>, PaymentProblem> {
        let (_, tx_bytes) = self.decode(payload, requirements)?;
        let pay_to: SuiAddress = requirements.pay_to.parse().map_err(|_| {
            PaymentProblem::new(
                ErrorReason::InvalidRequirements,
                format!("payTo {:?} is not an address", requirements.pay_to),
            )
        })?;
        let required: u128 = requirements.amount.parse().map_err(|_| {
            PaymentProblem::new(
                ErrorReason::InvalidRequirements,
                format!("amount {:?} is not an integer", requirements.amount),
            )
        })?;

        let outcome = self
            .rpc
            .dry_run(&tx_bytes)
            .await
            .map_err(|e| PaymentProblem::new(ErrorReason::VerificationError, e.to_string()))?;
        check_outcome(&outcome, &self.asset, &pay_to, required)
    }

    async fn verify_payment(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> VerifyResponse {
        match self.check(payload, requirements).await {
            Ok(payer) => VerifyResponse::valid(payer.map(|p| p.to_string())),
            Err(problem) => problem.into_verify_response(),
        }
    }

    async fn settle_payment(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> SettleResponse {
        let network = requirements.network.clone();
        if self.config.verify_before_settle {
            if let Err(problem) = self.check(payload, requirements).await {
                return problem.into_settle_response(network);
            }
        }
        let (exact, tx_bytes) = match self.decode(payload, requirements) {
            Ok(decoded) => decoded,
            Err(problem) => return problem.into_settle_response(network),
        };

        match self.rpc.execute(&tx_bytes, &exact.signature).await {
            Err(e) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(error = %e, "settlement broadcast failed");
                SettleResponse::error(ErrorReason::SettlementError.as_str(), e.to_string(), network)
            }
            Ok(outcome) if !outcome.status.is_success() => SettleResponse::failed(
                ErrorReason::ExecutionFailed.as_str(),
                outcome.status.error().unwrap_or("execution failed"),
                outcome.digest,
                network,
            ),
            Ok(outcome) => {
                let payer = outcome.payer(&self.asset).map(|p| p.to_string());
                #[cfg(feature = "telemetry")]
                tracing::info!(digest = %outcome.digest, payer = ?payer, "payment settled");
                SettleResponse::success(outcome.digest, network, payer)
            }
        }
    }
}

impl<R> SchemeId for ExactSuiFacilitator<R> {
    fn namespace(&self) -> &str {
        SuiExact.namespace()
    }

    fn scheme(&self) -> Scheme {
        SuiExact.scheme()
    }
}

impl<R: SuiRpc> SchemeFacilitator for ExactSuiFacilitator<R> {
    fn verify<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, VerifyResponse> {
        Box::pin(self.verify_payment(payload, requirements))
    }

    fn settle<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, SettleResponse> {
        Box::pin(self.settle_payment(payload, requirements))
    }

    fn get_signers(&self, _network: &NetworkId) -> Vec<String> {
        self.signer
            .addresses()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn get_extra(&self, _network: &NetworkId) -> Option<Value> {
        Some(json!({ "facilitator": self.signer.address() }))
    }
}
