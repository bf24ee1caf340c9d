// RPC client for communicating with the KratOs node

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::RpcError;
use crate::types::{
    ChainInfo, SignedTransaction, TransactionCall, TransactionSubmitResult, TxStatus,
    TxStatusResponse,
};

/// JSON-RPC request
#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    method: String,
    params: serde_json::Value,
    id: u64,
}

/// JSON-RPC response
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    #[allow(dead_code)]
    jsonrpc: String,
    result: Option<T>,
    error: Option<JsonRpcError>,
    #[allow(dead_code)]
    id: u64,
}

/// JSON-RPC error
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    #[allow(dead_code)]
    code: i32,
    message: String,
}

/// Chain operations the engine depends on.
///
/// Implemented by [`RpcClient`] against a live node; tests substitute mocks.
#[async_trait]
pub trait ChainApi: Send + Sync {
    /// Current nonce for an account
    async fn get_nonce(&self, address: &str) -> Result<u64, RpcError>;

    /// Submit a signed transaction to the mempool
    async fn submit_transaction(
        &self,
        tx: &SignedTransaction,
    ) -> Result<TransactionSubmitResult, RpcError>;

    /// Status of a previously submitted transaction
    async fn transaction_status(&self, hash: &str) -> Result<TxStatus, RpcError>;

    /// Current network fee rate (units per byte of transaction payload)
    async fn fee_rate(&self) -> Result<f64, RpcError>;

    /// Best known block height
    async fn best_height(&self) -> Result<u64, RpcError>;
}

/// JSON-RPC client for a KratOs node
pub struct RpcClient {
    url: String,
    client: Client,
    request_id: AtomicU64,
}

impl RpcClient {
    /// Create a new RPC client with an explicit per-call timeout
    pub fn new(url: &str, timeout: Duration) -> Result<Self, RpcError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.to_string(),
            client,
            request_id: AtomicU64::new(1),
        })
    }

    /// Get next request ID
    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Make a JSON-RPC call
    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: method.to_string(),
            params,
            id: self.next_id(),
        };

        let response = self.client.post(&self.url).json(&request).send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(RpcError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(RpcError::Http(response.status()));
        }

        let json_response: JsonRpcResponse<T> = response
            .json()
            .await
            .map_err(|e| RpcError::InvalidResponse(e.to_string()))?;

        if let Some(error) = json_response.error {
            return Err(RpcError::Rpc(error.message));
        }

        json_response
            .result
            .ok_or_else(|| RpcError::InvalidResponse("empty result".to_string()))
    }
}

/// Ensure an address carries the 0x prefix the node expects
fn ensure_prefixed(address: &str) -> String {
    if address.starts_with("0x") {
        address.to_string()
    } else {
        format!("0x{}", address)
    }
}

#[async_trait]
impl ChainApi for RpcClient {
    async fn get_nonce(&self, address: &str) -> Result<u64, RpcError> {
        let address = ensure_prefixed(address);
        self.call("state_getNonce", serde_json::json!([address]))
            .await
    }

    async fn submit_transaction(
        &self,
        tx: &SignedTransaction,
    ) -> Result<TransactionSubmitResult, RpcError> {
        // Convert to the JSON format expected by the node
        let TransactionCall::Transfer { to, amount } = &tx.transaction.call;
        let tx_json = serde_json::json!({
            "transaction": {
                "sender": format!("0x{}", hex::encode(tx.transaction.sender.0)),
                "nonce": tx.transaction.nonce,
                "call": {
                    "Transfer": {
                        "to": format!("0x{}", hex::encode(to.0)),
                        "amount": amount
                    }
                },
                "timestamp": tx.transaction.timestamp
            },
            "signature": format!("0x{}", hex::encode(tx.signature))
        });

        self.call("author_submitTransaction", serde_json::json!([tx_json]))
            .await
    }

    async fn transaction_status(&self, hash: &str) -> Result<TxStatus, RpcError> {
        let response: TxStatusResponse = self
            .call("state_getTransactionStatus", serde_json::json!([hash]))
            .await?;
        response.decode()
    }

    async fn fee_rate(&self) -> Result<f64, RpcError> {
        self.call("chain_getFeeRate", serde_json::Value::Null).await
    }

    async fn best_height(&self) -> Result<u64, RpcError> {
        let info: ChainInfo = self.call("chain_getInfo", serde_json::Value::Null).await?;
        Ok(info.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_client_creation() {
        let client = RpcClient::new("http://127.0.0.1:9933", Duration::from_secs(30)).unwrap();
        assert_eq!(client.url, "http://127.0.0.1:9933");
    }

    #[test]
    fn test_request_id_increment() {
        let client = RpcClient::new("http://localhost", Duration::from_secs(30)).unwrap();
        assert_eq!(client.next_id(), 1);
        assert_eq!(client.next_id(), 2);
        assert_eq!(client.next_id(), 3);
    }

    #[test]
    fn test_ensure_prefixed() {
        assert_eq!(ensure_prefixed("0xabc"), "0xabc");
        assert_eq!(ensure_prefixed("abc"), "0xabc");
    }
}
