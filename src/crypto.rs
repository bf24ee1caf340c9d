// Cryptographic operations for the distributor
// - Sender key management
// - Transaction signing

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use crate::types::{SignedTransaction, Transaction, TransactionCall};

/// Domain separator for transaction signatures (must match kratos-core)
const DOMAIN_TRANSACTION: &[u8] = b"KRATOS_TRANSACTION_V1:";

/// Create a domain-separated message for signing
#[inline]
fn domain_separate(domain: &[u8], message: &[u8]) -> Vec<u8> {
    let mut separated = Vec::with_capacity(domain.len() + message.len());
    separated.extend_from_slice(domain);
    separated.extend_from_slice(message);
    separated
}

/// One sender identity from the rotation pool (secret + public)
pub struct SenderKeys {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl SenderKeys {
    /// Generate new random keys
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Create from existing secret key bytes
    pub fn from_secret(secret: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&secret);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Create from a hex-encoded 32-byte seed as it appears in configuration
    pub fn from_seed_hex(seed: &str) -> anyhow::Result<Self> {
        let seed = seed.strip_prefix("0x").unwrap_or(seed);
        let bytes = hex::decode(seed)?;
        if bytes.len() != 32 {
            anyhow::bail!("sender seed must be 32 bytes, got {}", bytes.len());
        }
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&bytes);
        Ok(Self::from_secret(secret))
    }

    /// Get account ID (public key) as hex string
    pub fn account_id_hex(&self) -> String {
        hex::encode(self.verifying_key.to_bytes())
    }

    /// Get account ID as bytes
    pub fn account_id_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        let signature = self.signing_key.sign(message);
        signature.to_bytes()
    }

    /// Create and sign a transfer transaction
    pub fn create_transfer(&self, to: [u8; 32], amount: u128, nonce: u64) -> SignedTransaction {
        let transaction = Transaction {
            sender: self.account_id_bytes().into(),
            nonce,
            call: TransactionCall::Transfer {
                to: to.into(),
                amount,
            },
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_secs(),
        };

        // Serialize for signing with domain separation
        let tx_bytes = bincode::serialize(&transaction).unwrap();
        let message = domain_separate(DOMAIN_TRANSACTION, &tx_bytes);
        let signature = self.sign(&message);

        SignedTransaction {
            transaction,
            signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_generation() {
        let keys = SenderKeys::generate();
        assert_eq!(keys.account_id_hex().len(), 64);
    }

    #[test]
    fn test_key_from_seed_hex() {
        let seed = hex::encode([7u8; 32]);
        let keys = SenderKeys::from_seed_hex(&seed).unwrap();
        let keys2 = SenderKeys::from_seed_hex(&format!("0x{}", seed)).unwrap();
        assert_eq!(keys.account_id_hex(), keys2.account_id_hex());
    }

    #[test]
    fn test_bad_seed_rejected() {
        assert!(SenderKeys::from_seed_hex("deadbeef").is_err());
        assert!(SenderKeys::from_seed_hex("not hex at all").is_err());
    }

    #[test]
    fn test_signing() {
        let keys = SenderKeys::generate();
        let message = b"test message";
        let signature = keys.sign(message);
        assert_eq!(signature.len(), 64);
    }

    #[test]
    fn test_create_transfer() {
        let keys = SenderKeys::from_secret([3u8; 32]);
        let signed = keys.create_transfer([9u8; 32], 1_000_000_000_000, 5);

        assert_eq!(signed.transaction.nonce, 5);
        assert_eq!(signed.transaction.sender.0, keys.account_id_bytes());
        match signed.transaction.call {
            TransactionCall::Transfer { to, amount } => {
                assert_eq!(to.0, [9u8; 32]);
                assert_eq!(amount, 1_000_000_000_000);
            }
        }
    }
}
