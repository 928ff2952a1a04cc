//! Ed25519 signing for Sui transactions.
//!
//! Sui signs `blake2b256(intent || tx_bytes)` where the transaction intent
//! is `[0, 0, 0]`, and serializes signatures as
//! `base64(flag || signature || public_key)` with flag `0x00` for Ed25519.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use s402::encoding::Base64Bytes;

use crate::chain::{SuiAddress, blake2b256};

/// Signature scheme flag for Ed25519.
const ED25519_FLAG: u8 = 0x00;

/// Intent prefix for transaction data: scope, version, app id.
const TRANSACTION_INTENT: [u8; 3] = [0, 0, 0];

const SEED_LENGTH: usize = 32;
const SIGNATURE_LENGTH: usize = 64;
const SERIALIZED_SIGNATURE_LENGTH: usize = 1 + SIGNATURE_LENGTH + SEED_LENGTH;

/// Errors raised while loading keys or checking signatures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    /// The key text is not a supported Ed25519 private key encoding.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// A serialized signature is malformed or does not verify.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

/// An Ed25519 keypair and the Sui address it controls.
///
/// Cloning copies the key; share it behind an `Arc` instead.
#[derive(Clone)]
pub struct SuiSigner {
    signing_key: SigningKey,
    address: SuiAddress,
}

impl SuiSigner {
    /// Creates a signer from a 32-byte Ed25519 seed.
    #[must_use]
    pub fn from_seed(seed: &[u8; SEED_LENGTH]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let address = SuiAddress::from_ed25519_public_key(signing_key.verifying_key().as_bytes());
        Self {
            signing_key,
            address,
        }
    }

    /// Loads a private key from text.
    ///
    /// Accepts 64 hex digits (optionally `0x`-prefixed), or standard base64
    /// of either the 32-byte seed or the 33-byte `flag || seed` form that
    /// `sui keytool` exports.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::InvalidKeyMaterial`] for anything else,
    /// including Bech32 `suiprivkey` strings and non-Ed25519 flags.
    pub fn from_key_material(text: &str) -> Result<Self, SignerError> {
        let text = text.trim();
        if text.starts_with("suiprivkey") {
            return Err(SignerError::InvalidKeyMaterial(
                "bech32 keys are not supported, export the key as hex or base64".into(),
            ));
        }

        let hex_digits = text.strip_prefix("0x").unwrap_or(text);
        if hex_digits.len() == SEED_LENGTH * 2 {
            let mut seed = [0u8; SEED_LENGTH];
            if hex::decode_to_slice(hex_digits, &mut seed).is_ok() {
                return Ok(Self::from_seed(&seed));
            }
        }

        let bytes = Base64Bytes::from(text).decode().map_err(|_| {
            SignerError::InvalidKeyMaterial("expected 32-byte hex or base64".into())
        })?;
        let seed = match bytes.as_slice() {
            [ED25519_FLAG, seed @ ..] if seed.len() == SEED_LENGTH => seed,
            [flag, rest @ ..] if rest.len() == SEED_LENGTH => {
                return Err(SignerError::InvalidKeyMaterial(format!(
                    "unsupported signature scheme flag {flag:#04x}"
                )));
            }
            seed if seed.len() == SEED_LENGTH => seed,
            other => {
                return Err(SignerError::InvalidKeyMaterial(format!(
                    "decoded key has {} bytes",
                    other.len()
                )));
            }
        };
        let mut buf = [0u8; SEED_LENGTH];
        buf.copy_from_slice(seed);
        Ok(Self::from_seed(&buf))
    }

    /// Returns the address this key controls.
    #[must_use]
    pub const fn address(&self) -> SuiAddress {
        self.address
    }

    /// Returns every address this signer can act for.
    #[must_use]
    pub fn addresses(&self) -> Vec<SuiAddress> {
        vec![self.address]
    }

    /// Returns the raw Ed25519 public key.
    #[must_use]
    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Signs transaction bytes and returns the serialized Sui signature.
    #[must_use]
    pub fn sign_transaction(&self, tx_bytes: &[u8]) -> String {
        let digest = blake2b256(&[&TRANSACTION_INTENT, tx_bytes]);
        let signature = self.signing_key.sign(&digest);

        let mut serialized = Vec::with_capacity(SERIALIZED_SIGNATURE_LENGTH);
        serialized.push(ED25519_FLAG);
        serialized.extend_from_slice(&signature.to_bytes());
        serialized.extend_from_slice(&self.public_key());
        Base64Bytes::encode(serialized).to_string()
    }
}

impl FromStr for SuiSigner {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key_material(s)
    }
}

impl fmt::Debug for SuiSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Checks a serialized Ed25519 signature over `tx_bytes` and returns the
/// signing address.
///
/// # Errors
///
/// Returns [`SignerError::InvalidSignature`] if the signature is malformed,
/// uses another scheme, or does not verify.
pub fn verify_transaction_signature(
    tx_bytes: &[u8],
    signature: &str,
) -> Result<SuiAddress, SignerError> {
    let bytes = Base64Bytes::from(signature)
        .decode()
        .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;
    if bytes.len() != SERIALIZED_SIGNATURE_LENGTH || bytes[0] != ED25519_FLAG {
        return Err(SignerError::InvalidSignature(
            "expected an ed25519 signature".into(),
        ));
    }
    let (sig_bytes, pk_bytes) = bytes[1..].split_at(SIGNATURE_LENGTH);
    let signature = Signature::from_slice(sig_bytes)
        .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;
    let mut public_key = [0u8; SEED_LENGTH];
    public_key.copy_from_slice(pk_bytes);
    let verifying_key = VerifyingKey::from_bytes(&public_key)
        .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;

    let digest = blake2b256(&[&TRANSACTION_INTENT, tx_bytes]);
    verifying_key
        .verify(&digest, &signature)
        .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;
    Ok(SuiAddress::from_ed25519_public_key(&public_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED_HEX: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    #[test]
    fn test_hex_and_base64_keys_agree() {
        let from_hex = SuiSigner::from_key_material(SEED_HEX).unwrap();
        let prefixed = SuiSigner::from_key_material(&format!("0x{SEED_HEX}")).unwrap();

        let mut flagged = vec![ED25519_FLAG];
        flagged.extend_from_slice(&[1u8; 32]);
        let from_b64 = SuiSigner::from_key_material(&Base64Bytes::encode(&flagged).to_string())
            .unwrap();
        let raw_b64 =
            SuiSigner::from_key_material(&Base64Bytes::encode([1u8; 32]).to_string()).unwrap();

        assert_eq!(from_hex.address(), prefixed.address());
        assert_eq!(from_hex.address(), from_b64.address());
        assert_eq!(from_hex.address(), raw_b64.address());
    }

    #[test]
    fn test_address_is_blake2b_of_flagged_public_key() {
        let signer = SuiSigner::from_key_material(SEED_HEX).unwrap();
        let mut flagged = vec![0u8];
        flagged.extend_from_slice(&signer.public_key());
        assert_eq!(
            signer.address(),
            SuiAddress::from_bytes(blake2b256(&[&flagged]))
        );
        assert_eq!(signer.address().to_string().len(), 66);
        assert_eq!(signer.addresses(), vec![signer.address()]);
    }

    #[test]
    fn test_rejects_unusable_key_material() {
        for bad in ["", "0x1234", "suiprivkey1qq", "not base64 !!"] {
            assert!(matches!(
                SuiSigner::from_key_material(bad),
                Err(SignerError::InvalidKeyMaterial(_))
            ));
        }
        let mut secp = vec![0x01u8];
        secp.extend_from_slice(&[1u8; 32]);
        assert!(SuiSigner::from_key_material(&Base64Bytes::encode(&secp).to_string()).is_err());
    }

    #[test]
    fn test_signature_layout_and_verification() {
        let signer: SuiSigner = SEED_HEX.parse().unwrap();
        let tx = b"transaction bytes";
        let signature = signer.sign_transaction(tx);

        let raw = Base64Bytes::from(signature.as_str()).decode().unwrap();
        assert_eq!(raw.len(), 97);
        assert_eq!(raw[0], 0x00);
        assert_eq!(&raw[65..], &signer.public_key());

        assert_eq!(
            verify_transaction_signature(tx, &signature).unwrap(),
            signer.address()
        );
        assert!(verify_transaction_signature(b"other bytes", &signature).is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let signer: SuiSigner = SEED_HEX.parse().unwrap();
        let debug = format!("{signer:?}");
        assert!(debug.contains(&signer.address().to_string()));
        assert!(!debug.contains(SEED_HEX));
    }
}
