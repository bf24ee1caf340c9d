//! Transfer Executor
//!
//! One transfer attempt in two phases: submit a signed transfer to the node,
//! then poll until it is buried under the configured confirmation depth.
//! Submission failures are terminal for the attempt; transient polling
//! failures are retried a bounded number of times with a fixed backoff.
//!
//! This component does not guarantee idempotency: executing twice for the
//! same logical payment sends twice. Duplicate prevention lives entirely in
//! the scheduler's bookkeeping.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::DistributorConfig;
use crate::crypto::SenderKeys;
use crate::error::{RpcError, TransferError};
use crate::rpc::ChainApi;
use crate::shutdown::Shutdown;
use crate::types::{Address, TxStatus};

/// A transfer confirmed at the required depth
#[derive(Debug, Clone)]
pub struct Confirmed {
    pub hash: String,
    pub sender: String,
    pub amount: u64,
}

/// Result of one confirmation poll
enum Poll {
    /// Buried at the required depth
    Final,
    /// In the mempool or not yet deep enough; keep waiting
    Waiting,
    /// Dropped by the chain
    Rejected(String),
}

pub struct TransferExecutor {
    chain: Arc<dyn ChainApi>,
    config: Arc<DistributorConfig>,
}

impl TransferExecutor {
    pub fn new(chain: Arc<dyn ChainApi>, config: Arc<DistributorConfig>) -> Self {
        Self { chain, config }
    }

    /// Run one full attempt for (sender, recipient, amount)
    pub async fn execute(
        &self,
        sender: &SenderKeys,
        recipient: &Address,
        amount: u64,
        shutdown: &mut Shutdown,
    ) -> Result<Confirmed, TransferError> {
        let to = decode_account(recipient)?;

        // Phase 1: submit. Errors here are terminal for the attempt.
        let nonce = self
            .chain
            .get_nonce(&sender.account_id_hex())
            .await
            .map_err(TransferError::Submit)?;
        let signed = sender.create_transfer(to, amount as u128, nonce);
        let result = self
            .chain
            .submit_transaction(&signed)
            .await
            .map_err(TransferError::Submit)?;

        info!(
            "🚀 Submitted transfer of {} to {} from 0x{} (tx {})",
            amount,
            recipient,
            sender.account_id_hex(),
            result.hash
        );

        // Phase 2: wait for finality.
        self.await_confirmation(&result.hash, shutdown).await?;

        Ok(Confirmed {
            hash: result.hash,
            sender: sender.account_id_hex(),
            amount,
        })
    }

    /// Poll the transaction status until it reaches the configured depth,
    /// bounded by the confirmation timeout. "Not yet final" is a wait-state,
    /// not a failure.
    async fn await_confirmation(
        &self,
        hash: &str,
        shutdown: &mut Shutdown,
    ) -> Result<(), TransferError> {
        let deadline = Instant::now() + Duration::from_secs(self.config.confirm_timeout_secs);
        let poll_interval = Duration::from_secs(self.config.confirm_poll_interval_secs);
        let backoff = Duration::from_secs(self.config.confirm_retry_backoff_secs);
        let mut transient_failures = 0u32;

        loop {
            if Instant::now() >= deadline {
                return Err(TransferError::ConfirmTimeout {
                    hash: hash.to_string(),
                });
            }

            match self.poll_once(hash).await {
                Ok(Poll::Final) => return Ok(()),
                Ok(Poll::Rejected(reason)) => {
                    return Err(TransferError::Rejected {
                        hash: hash.to_string(),
                        reason,
                    });
                }
                Ok(Poll::Waiting) => {
                    if !shutdown.sleep(poll_interval).await {
                        return Err(TransferError::Cancelled);
                    }
                }
                Err(e) if e.is_transient() => {
                    transient_failures += 1;
                    if transient_failures > self.config.confirm_retry_limit {
                        warn!(
                            "Confirmation polling for {} exhausted {} retries",
                            hash, self.config.confirm_retry_limit
                        );
                        return Err(TransferError::ConfirmTimeout {
                            hash: hash.to_string(),
                        });
                    }
                    warn!(
                        "🔁 Transient RPC failure confirming {} ({}), retry {}/{} in {}s",
                        hash,
                        e,
                        transient_failures,
                        self.config.confirm_retry_limit,
                        backoff.as_secs()
                    );
                    if !shutdown.sleep(backoff).await {
                        return Err(TransferError::Cancelled);
                    }
                }
                Err(e) => {
                    warn!("Permanent RPC failure confirming {}: {}", hash, e);
                    return Err(TransferError::ConfirmTimeout {
                        hash: hash.to_string(),
                    });
                }
            }
        }
    }

    /// One status poll
    async fn poll_once(&self, hash: &str) -> Result<Poll, RpcError> {
        match self.chain.transaction_status(hash).await? {
            TxStatus::Pending => Ok(Poll::Waiting),
            TxStatus::Rejected { reason } => Ok(Poll::Rejected(reason)),
            TxStatus::Included { block } => {
                let height = self.chain.best_height().await?;
                let confirmations = height.saturating_sub(block) + 1;
                if confirmations >= self.config.confirm_depth {
                    Ok(Poll::Final)
                } else {
                    debug!(
                        "tx {} at {}/{} confirmations",
                        hash, confirmations, self.config.confirm_depth
                    );
                    Ok(Poll::Waiting)
                }
            }
        }
    }
}

/// Decode a recipient address into a 32-byte account id
fn decode_account(address: &Address) -> Result<[u8; 32], TransferError> {
    let raw = address.as_str().strip_prefix("0x").unwrap_or(address.as_str());
    let bytes = hex::decode(raw).map_err(|_| TransferError::InvalidRecipient {
        address: address.to_string(),
    })?;
    if bytes.len() != 32 {
        return Err(TransferError::InvalidRecipient {
            address: address.to_string(),
        });
    }

    let mut account = [0u8; 32];
    account.copy_from_slice(&bytes);
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown;
    use crate::types::{SignedTransaction, TransactionSubmitResult};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedChain {
        /// Status results handed out in order; `default_status` repeats after
        statuses: Mutex<VecDeque<Result<TxStatus, RpcError>>>,
        default_status: TxStatus,
        height: u64,
        fail_submit: bool,
        submitted: Mutex<u32>,
    }

    impl ScriptedChain {
        fn new(script: Vec<Result<TxStatus, RpcError>>, default_status: TxStatus) -> Self {
            Self {
                statuses: Mutex::new(script.into()),
                default_status,
                height: 100,
                fail_submit: false,
                submitted: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ChainApi for ScriptedChain {
        async fn get_nonce(&self, _address: &str) -> Result<u64, RpcError> {
            Ok(7)
        }

        async fn submit_transaction(
            &self,
            _tx: &SignedTransaction,
        ) -> Result<TransactionSubmitResult, RpcError> {
            if self.fail_submit {
                return Err(RpcError::Rpc("insufficient balance".to_string()));
            }
            *self.submitted.lock().unwrap() += 1;
            Ok(TransactionSubmitResult {
                hash: "0xabc".to_string(),
                message: "accepted".to_string(),
            })
        }

        async fn transaction_status(&self, _hash: &str) -> Result<TxStatus, RpcError> {
            let mut script = self.statuses.lock().unwrap();
            match script.pop_front() {
                Some(result) => result,
                None => Ok(self.default_status.clone()),
            }
        }

        async fn fee_rate(&self) -> Result<f64, RpcError> {
            Ok(1.0)
        }

        async fn best_height(&self) -> Result<u64, RpcError> {
            Ok(self.height)
        }
    }

    fn test_config() -> Arc<DistributorConfig> {
        Arc::new(DistributorConfig {
            confirm_timeout_secs: 30,
            confirm_poll_interval_secs: 1,
            confirm_depth: 2,
            confirm_retry_limit: 3,
            confirm_retry_backoff_secs: 1,
            ..DistributorConfig::default()
        })
    }

    fn recipient() -> Address {
        Address::parse(&format!("0x{}", hex::encode([9u8; 32]))).unwrap()
    }

    fn executor(chain: Arc<ScriptedChain>) -> TransferExecutor {
        TransferExecutor::new(chain, test_config())
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmed_transfer() {
        let chain = Arc::new(ScriptedChain::new(
            vec![Ok(TxStatus::Pending), Ok(TxStatus::Included { block: 50 })],
            TxStatus::Included { block: 50 },
        ));
        let (_trigger, mut shutdown) = shutdown::channel();
        let sender = SenderKeys::from_secret([1u8; 32]);

        let confirmed = executor(chain.clone())
            .execute(&sender, &recipient(), 1000, &mut shutdown)
            .await
            .unwrap();

        assert_eq!(confirmed.hash, "0xabc");
        assert_eq!(confirmed.amount, 1000);
        assert_eq!(*chain.submitted.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_failure_is_terminal() {
        let mut chain = ScriptedChain::new(vec![], TxStatus::Pending);
        chain.fail_submit = true;
        let chain = Arc::new(chain);
        let (_trigger, mut shutdown) = shutdown::channel();
        let sender = SenderKeys::from_secret([1u8; 32]);

        let err = executor(chain.clone())
            .execute(&sender, &recipient(), 1000, &mut shutdown)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::Submit(_)));
        assert_eq!(*chain.submitted.lock().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_surfaces_reason() {
        let chain = Arc::new(ScriptedChain::new(
            vec![Ok(TxStatus::Rejected {
                reason: "bad nonce".to_string(),
            })],
            TxStatus::Pending,
        ));
        let (_trigger, mut shutdown) = shutdown::channel();
        let sender = SenderKeys::from_secret([1u8; 32]);

        let err = executor(chain)
            .execute(&sender, &recipient(), 1000, &mut shutdown)
            .await
            .unwrap_err();

        match err {
            TransferError::Rejected { reason, .. } => assert_eq!(reason, "bad nonce"),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_confirmed_times_out() {
        let chain = Arc::new(ScriptedChain::new(vec![], TxStatus::Pending));
        let (_trigger, mut shutdown) = shutdown::channel();
        let sender = SenderKeys::from_secret([1u8; 32]);

        let err = executor(chain)
            .execute(&sender, &recipient(), 1000, &mut shutdown)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::ConfirmTimeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let chain = Arc::new(ScriptedChain::new(
            vec![
                Err(RpcError::RateLimited),
                Err(RpcError::RateLimited),
                Ok(TxStatus::Included { block: 50 }),
            ],
            TxStatus::Included { block: 50 },
        ));
        let (_trigger, mut shutdown) = shutdown::channel();
        let sender = SenderKeys::from_secret([1u8; 32]);

        let confirmed = executor(chain)
            .execute(&sender, &recipient(), 1000, &mut shutdown)
            .await;
        assert!(confirmed.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_escalates() {
        // retry_limit = 3, so the fourth consecutive transient failure gives up
        let chain = Arc::new(ScriptedChain::new(
            vec![
                Err(RpcError::RateLimited),
                Err(RpcError::RateLimited),
                Err(RpcError::RateLimited),
                Err(RpcError::RateLimited),
            ],
            TxStatus::Included { block: 50 },
        ));
        let (_trigger, mut shutdown) = shutdown::channel();
        let sender = SenderKeys::from_secret([1u8; 32]);

        let err = executor(chain)
            .execute(&sender, &recipient(), 1000, &mut shutdown)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::ConfirmTimeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_depth() {
        // Included at the tip (1 confirmation) first, then deep enough
        let chain = Arc::new(ScriptedChain::new(
            vec![Ok(TxStatus::Included { block: 100 })],
            TxStatus::Included { block: 50 },
        ));
        let (_trigger, mut shutdown) = shutdown::channel();
        let sender = SenderKeys::from_secret([1u8; 32]);

        let confirmed = executor(chain.clone())
            .execute(&sender, &recipient(), 1000, &mut shutdown)
            .await;

        assert!(confirmed.is_ok());
        // The shallow poll was consumed before success
        assert!(chain.statuses.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_mid_wait() {
        let chain = Arc::new(ScriptedChain::new(vec![], TxStatus::Pending));
        let (trigger, mut shutdown) = shutdown::channel();
        let sender = SenderKeys::from_secret([1u8; 32]);

        trigger.trigger();
        let err = executor(chain)
            .execute(&sender, &recipient(), 1000, &mut shutdown)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_recipient_fails_fast() {
        let chain = Arc::new(ScriptedChain::new(vec![], TxStatus::Pending));
        let (_trigger, mut shutdown) = shutdown::channel();
        let sender = SenderKeys::from_secret([1u8; 32]);
        let bad = Address::parse("0xnothex").unwrap();

        let err = executor(chain.clone())
            .execute(&sender, &bad, 1000, &mut shutdown)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::InvalidRecipient { .. }));
        assert_eq!(*chain.submitted.lock().unwrap(), 0);
    }

    #[test]
    fn test_decode_account() {
        let good = Address::parse(&format!("0x{}", hex::encode([5u8; 32]))).unwrap();
        assert_eq!(decode_account(&good).unwrap(), [5u8; 32]);

        let unprefixed = Address::parse(&hex::encode([5u8; 32])).unwrap();
        assert_eq!(decode_account(&unprefixed).unwrap(), [5u8; 32]);

        let short = Address::parse("0xdeadbeef").unwrap();
        assert!(decode_account(&short).is_err());
    }
}
