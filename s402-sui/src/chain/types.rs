//! Sui value types shared by the RPC layer and the scheme adapters.

use std::fmt;
use std::str::FromStr;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{DeserializeFromStr, SerializeDisplay};

type Blake2b256 = Blake2b<U32>;

/// Hashes the concatenation of `parts` with BLAKE2b-256.
#[must_use]
pub fn blake2b256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Error returned when text is not a Sui address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid Sui address {0:?}")]
pub struct AddressParseError(String);

/// A 32-byte Sui account address.
///
/// Parses `0x`-prefixed hex of up to 64 digits, left-padding short forms
/// such as `0x2`. Displays as `0x` followed by 64 lowercase hex digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr)]
pub struct SuiAddress([u8; 32]);

impl SuiAddress {
    /// Address length in bytes.
    pub const LENGTH: usize = 32;

    /// Wraps raw address bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw address bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derives the address of an Ed25519 public key:
    /// `blake2b256(0x00 || public_key)`.
    #[must_use]
    pub fn from_ed25519_public_key(public_key: &[u8; 32]) -> Self {
        Self(blake2b256(&[&[0x00], public_key]))
    }
}

impl FromStr for SuiAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| AddressParseError(s.to_owned()))?;
        if digits.is_empty() || digits.len() > Self::LENGTH * 2 {
            return Err(AddressParseError(s.to_owned()));
        }
        let padded = format!("{digits:0>64}");
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&padded, &mut bytes).map_err(|_| AddressParseError(s.to_owned()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for SuiAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for SuiAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Normalizes the package address of a coin type to its long form, so
/// `0x2::sui::SUI` and `0x000..002::sui::SUI` compare equal.
///
/// Text that does not start with an address is returned unchanged.
#[must_use]
pub fn normalize_coin_type(coin_type: &str) -> String {
    match coin_type.split_once("::") {
        Some((package, rest)) => match package.parse::<SuiAddress>() {
            Ok(address) => format!("{address}::{rest}"),
            Err(_) => coin_type.to_owned(),
        },
        None => coin_type.to_owned(),
    }
}

/// Returns whether two coin types name the same coin.
#[must_use]
pub fn coin_types_match(a: &str, b: &str) -> bool {
    normalize_coin_type(a) == normalize_coin_type(b)
}

/// A coin object owned by an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coin {
    /// Coin type (e.g., `0x2::sui::SUI`).
    pub coin_type: String,
    /// Object ID of the coin.
    pub coin_object_id: String,
    /// Balance in base units, as a decimal string.
    pub balance: String,
}

impl Coin {
    /// Parses the balance. Unparsable balances count as zero.
    #[must_use]
    pub fn balance(&self) -> u128 {
        self.balance.parse().unwrap_or(0)
    }
}

/// One signed balance delta produced by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChange {
    /// Owner of the changed balance, e.g. `{"AddressOwner": "0x.."}`.
    pub owner: Value,
    /// Coin type whose balance changed.
    pub coin_type: String,
    /// Signed delta in base units, as a decimal string.
    pub amount: String,
}

impl BalanceChange {
    /// Returns the owning address when the owner is a plain address.
    #[must_use]
    pub fn address_owner(&self) -> Option<SuiAddress> {
        self.owner.get("AddressOwner")?.as_str()?.parse().ok()
    }

    /// Parses the signed delta.
    #[must_use]
    pub fn delta(&self) -> Option<i128> {
        self.amount.parse().ok()
    }

    /// Returns whether this change is of `coin_type`.
    #[must_use]
    pub fn is_coin(&self, coin_type: &str) -> bool {
        coin_types_match(&self.coin_type, coin_type)
    }
}

/// Execution status reported in transaction effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// The transaction executed successfully.
    Success,
    /// The transaction aborted.
    Failure {
        /// Abort description from the node.
        #[serde(default)]
        error: String,
    },
}

impl ExecutionStatus {
    /// Returns whether the transaction succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns the failure description, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success => None,
            Self::Failure { error } => Some(error),
        }
    }
}

/// What a dry run or an execution reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
    /// Transaction digest. Empty when the node did not report one.
    pub digest: String,
    /// Execution status from the effects.
    pub status: ExecutionStatus,
    /// Balance deltas, in the order the node reported them.
    pub balance_changes: Vec<BalanceChange>,
}

impl TransactionOutcome {
    /// Returns the first change crediting `recipient` a positive amount of
    /// `coin_type`, with its amount.
    #[must_use]
    pub fn credit_to(&self, recipient: &SuiAddress, coin_type: &str) -> Option<u128> {
        self.balance_changes.iter().find_map(|change| {
            let delta = change.delta()?;
            (delta > 0 && change.is_coin(coin_type) && change.address_owner() == Some(*recipient))
                .then_some(delta.unsigned_abs())
        })
    }

    /// Returns the owner of the first strict decrease of `coin_type`.
    #[must_use]
    pub fn payer(&self, coin_type: &str) -> Option<SuiAddress> {
        self.balance_changes.iter().find_map(|change| {
            let delta = change.delta()?;
            if delta < 0 && change.is_coin(coin_type) {
                change.address_owner()
            } else {
                None
            }
        })
    }
}

/// Parameters for building an unsigned single-recipient transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Address that owns the input coins and signs the transaction.
    pub sender: SuiAddress,
    /// Address credited with `amount`.
    pub recipient: SuiAddress,
    /// Coin type to transfer.
    pub coin_type: String,
    /// Amount in base units.
    pub amount: u64,
    /// Gas budget in MIST.
    pub gas_budget: u64,
}
