// Types for the distributor - Compatible with kratos-core

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::RpcError;

/// AccountId wrapper that serializes as bytes (compatible with kratos-core AccountId)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountId32(pub [u8; 32]);

impl Serialize for AccountId32 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for AccountId32 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        struct AccountId32Visitor;

        impl<'de> serde::de::Visitor<'de> for AccountId32Visitor {
            type Value = AccountId32;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("32 bytes")
            }

            fn visit_bytes<E>(self, value: &[u8]) -> Result<Self::Value, E>
            where
                E: Error,
            {
                if value.len() != 32 {
                    return Err(E::custom(format!("Expected 32 bytes, got {}", value.len())));
                }
                let mut arr = [0u8; 32];
                arr.copy_from_slice(value);
                Ok(AccountId32(arr))
            }
        }

        deserializer.deserialize_bytes(AccountId32Visitor)
    }
}

impl From<[u8; 32]> for AccountId32 {
    fn from(bytes: [u8; 32]) -> Self {
        AccountId32(bytes)
    }
}

impl AsRef<[u8; 32]> for AccountId32 {
    fn as_ref(&self) -> &[u8; 32] {
        &self.0
    }
}

/// A recipient address: an opaque, lowercase-normalized, non-empty string.
///
/// No structural validation beyond non-emptiness; decoding to an on-chain
/// account id happens at transfer time and failures there are contained to
/// the attempt.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(String);

impl Address {
    /// Normalize a raw line into an address. Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transaction call types - Transfer must stay at variant index 0 for bincode
/// compatibility with kratos-core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TransactionCall {
    /// Simple balance transfer
    Transfer { to: AccountId32, amount: u128 },
}

/// Unsigned transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: AccountId32,
    pub nonce: u64,
    pub call: TransactionCall,
    pub timestamp: u64,
}

/// Signed transaction
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: [u8; 64],
}

/// Transaction submission result
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionSubmitResult {
    pub hash: String,
    pub message: String,
}

/// Response from state_getTransactionStatus
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxStatusResponse {
    /// "pending" | "included" | "rejected"
    pub status: String,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Decoded on-chain status of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    /// Still in the mempool
    Pending,
    /// Included in a block, possibly not yet at the required depth
    Included { block: u64 },
    /// Dropped by the chain
    Rejected { reason: String },
}

impl TxStatusResponse {
    /// Decode the wire triple into a [`TxStatus`].
    pub fn decode(&self) -> Result<TxStatus, RpcError> {
        match self.status.as_str() {
            "pending" => Ok(TxStatus::Pending),
            "included" => {
                let block = self.block_number.ok_or_else(|| {
                    RpcError::InvalidResponse("included status without blockNumber".to_string())
                })?;
                Ok(TxStatus::Included { block })
            }
            "rejected" => Ok(TxStatus::Rejected {
                reason: self
                    .reason
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
            }),
            other => Err(RpcError::InvalidResponse(format!(
                "unknown transaction status '{}'",
                other
            ))),
        }
    }
}

/// Chain information
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    pub chain_name: String,
    pub height: u64,
    pub best_hash: String,
    pub genesis_hash: String,
    pub is_synced: bool,
}

/// Outcome counts for one distribution run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Recipients visited (gated, attempted or interrupted mid-attempt)
    pub attempted: usize,
    /// Transfers confirmed at the required depth
    pub succeeded: usize,
    /// Recipients deferred or failed, queued for retry
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_normalization() {
        let addr = Address::parse("  0xABCdef01  ").unwrap();
        assert_eq!(addr.as_str(), "0xabcdef01");
    }

    #[test]
    fn test_blank_address_rejected() {
        assert!(Address::parse("").is_none());
        assert!(Address::parse("   \t ").is_none());
    }

    #[test]
    fn test_transaction_call_serialize() {
        let call = TransactionCall::Transfer {
            to: [1u8; 32].into(),
            amount: 1000,
        };

        let serialized = bincode::serialize(&call).unwrap();
        let deserialized: TransactionCall = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            TransactionCall::Transfer { to, amount } => {
                assert_eq!(to, AccountId32([1u8; 32]));
                assert_eq!(amount, 1000);
            }
        }
    }

    #[test]
    fn test_status_decode() {
        let resp = TxStatusResponse {
            status: "included".to_string(),
            block_number: Some(42),
            reason: None,
        };
        assert_eq!(resp.decode().unwrap(), TxStatus::Included { block: 42 });

        let resp = TxStatusResponse {
            status: "rejected".to_string(),
            block_number: None,
            reason: Some("bad nonce".to_string()),
        };
        assert_eq!(
            resp.decode().unwrap(),
            TxStatus::Rejected {
                reason: "bad nonce".to_string()
            }
        );
    }

    #[test]
    fn test_status_decode_invalid() {
        let resp = TxStatusResponse {
            status: "included".to_string(),
            block_number: None,
            reason: None,
        };
        assert!(resp.decode().is_err());

        let resp = TxStatusResponse {
            status: "finalized".to_string(),
            block_number: None,
            reason: None,
        };
        assert!(resp.decode().is_err());
    }
}
