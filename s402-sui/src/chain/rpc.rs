//! The chain seam used by the Sui scheme adapters.

use std::sync::Arc;

use async_trait::async_trait;

use super::types::{Coin, SuiAddress, TransactionOutcome, TransferRequest};

/// Errors from talking to a Sui full node.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The request never produced a JSON-RPC response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The node answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message from the node.
        message: String,
    },

    /// The node answered with something that does not parse.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    /// The sender's coins cannot cover the transfer.
    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds {
        /// Base units needed, including gas for native SUI.
        required: u128,
        /// Base units available across all coins of the type.
        available: u128,
    },
}

/// Read, build, simulate, and execute operations against a Sui node.
///
/// [`SuiRpcClient`](super::SuiRpcClient) is the JSON-RPC implementation.
/// Tests substitute in-memory implementations.
#[async_trait]
pub trait SuiRpc: Send + Sync {
    /// Lists every coin of `coin_type` owned by `owner`.
    async fn get_coins(&self, owner: &SuiAddress, coin_type: &str) -> Result<Vec<Coin>, RpcError>;

    /// Builds unsigned transaction bytes for `request`.
    async fn build_transfer(&self, request: &TransferRequest) -> Result<Vec<u8>, RpcError>;

    /// Simulates `tx_bytes` without broadcasting.
    async fn dry_run(&self, tx_bytes: &[u8]) -> Result<TransactionOutcome, RpcError>;

    /// Broadcasts `tx_bytes` with a serialized `signature` and waits for
    /// local execution.
    async fn execute(&self, tx_bytes: &[u8], signature: &str)
    -> Result<TransactionOutcome, RpcError>;

    /// Returns the total balance of `coin_type` owned by `owner`.
    async fn get_balance(&self, owner: &SuiAddress, coin_type: &str) -> Result<u128, RpcError>;
}

#[async_trait]
impl<T: SuiRpc + ?Sized> SuiRpc for Arc<T> {
    async fn get_coins(&self, owner: &SuiAddress, coin_type: &str) -> Result<Vec<Coin>, RpcError> {
        (**self).get_coins(owner, coin_type).await
    }

    async fn build_transfer(&self, request: &TransferRequest) -> Result<Vec<u8>, RpcError> {
        (**self).build_transfer(request).await
    }

    async fn dry_run(&self, tx_bytes: &[u8]) -> Result<TransactionOutcome, RpcError> {
        (**self).dry_run(tx_bytes).await
    }

    async fn execute(
        &self,
        tx_bytes: &[u8],
        signature: &str,
    ) -> Result<TransactionOutcome, RpcError> {
        (**self).execute(tx_bytes, signature).await
    }

    async fn get_balance(&self, owner: &SuiAddress, coin_type: &str) -> Result<u128, RpcError> {
        (**self).get_balance(owner, coin_type).await
    }
}

/// Picks coins by descending balance until their sum reaches `target`.
///
/// Returns the selected object IDs.
///
/// # Errors
///
/// Returns [`RpcError::InsufficientFunds`] when all coins together fall
/// short of `target`.
pub fn select_coins(coins: &[Coin], target: u128) -> Result<Vec<String>, RpcError> {
    let mut sorted: Vec<&Coin> = coins.iter().collect();
    sorted.sort_by_key(|coin| std::cmp::Reverse(coin.balance()));

    let mut selected = Vec::new();
    let mut total: u128 = 0;
    for coin in sorted {
        if total >= target && !selected.is_empty() {
            break;
        }
        total = total.saturating_add(coin.balance());
        selected.push(coin.coin_object_id.clone());
    }

    if total < target || selected.is_empty() {
        return Err(RpcError::InsufficientFunds {
            required: target,
            available: total,
        });
    }
    Ok(selected)
}
