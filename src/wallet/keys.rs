use alloy_primitives::{keccak256, Address, B256, U256};
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use std::fmt;

use crate::error::{AppError, AppResult, ExecutionError};

/// secp256k1 key pair with its derived account address
#[derive(Clone)]
pub struct LocalKey {
    signing_key: SigningKey,
    address: Address,
}

/// Recoverable ECDSA signature over a 32-byte hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub r: U256,
    pub s: U256,
    pub recovery_id: u8,
}

impl LocalKey {
    /// Generate a fresh key from the OS random source
    pub fn random() -> Self {
        loop {
            let bytes: [u8; 32] = rand::random();
            // Out-of-range scalars are astronomically rare; draw again.
            if let Ok(signing_key) = SigningKey::from_slice(&bytes) {
                return Self::from_signing_key(signing_key);
            }
        }
    }

    pub fn from_hex(private_key: &str) -> AppResult<Self> {
        let raw = private_key.trim().trim_start_matches("0x");
        let bytes = hex::decode(raw)
            .map_err(|e| AppError::InvalidInput(format!("Private key is not hex: {}", e)))?;
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|_| AppError::InvalidInput("Private key is not a valid secp256k1 scalar".to_string()))?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let public_key = PublicKey::from(signing_key.verifying_key());
        let encoded = public_key.to_encoded_point(false);
        // Uncompressed SEC1 is 0x04 || X || Y; the address hashes X || Y.
        let digest = keccak256(&encoded.as_bytes()[1..]);
        let address = Address::from_slice(&digest[12..]);
        Self {
            signing_key,
            address,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// EIP-55 mixed-case address
    pub fn checksum_address(&self) -> String {
        self.address.to_checksum(None)
    }

    pub fn private_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signing_key.to_bytes()))
    }

    pub fn sign_hash(&self, hash: &B256) -> AppResult<RecoverableSignature> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(hash.as_slice())
            .map_err(|e| ExecutionError::Signing(e.to_string()))?;

        let bytes = signature.to_bytes();
        Ok(RecoverableSignature {
            r: U256::from_be_slice(&bytes[..32]),
            s: U256::from_be_slice(&bytes[32..]),
            recovery_id: recovery_id.to_byte(),
        })
    }
}

impl fmt::Debug for LocalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalKey")
            .field("address", &self.checksum_address())
            .finish_non_exhaustive()
    }
}
