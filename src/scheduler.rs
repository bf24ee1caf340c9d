//! Distribution Scheduler
//!
//! One run end-to-end: fetch the eligibility list, compute the candidate set
//! against the durable records, cap it to a sampled quota, shuffle, and walk
//! the list strictly sequentially — delay, fee gate, transfer, bookkeeping.
//!
//! Failures are contained per recipient: any error moves that recipient to
//! the pending bucket and the run continues. Only a fetch failure aborts the
//! run (with no state mutation), and only a store failure is fatal.
//!
//! Policy: one confirmed payment per recipient per run. The sender for each
//! attempt comes from the rotation pool via a global attempt counter, so the
//! load spreads across the pool even though each recipient sees one sender.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::DistributorConfig;
use crate::error::{RunError, TransferError};
use crate::executor::TransferExecutor;
use crate::notify::Notifier;
use crate::roster::CandidateSource;
use crate::rotation::SenderPool;
use crate::shutdown::Shutdown;
use crate::store::{RecipientStore, SetKind};
use crate::throttle::FeeGate;
use crate::types::{Address, RunSummary};

/// How one recipient resolved
enum RecipientOutcome {
    /// Transfer confirmed; recorded as sent
    Paid,
    /// Throttle rejected or unavailable; queued for retry
    Deferred,
    /// Transfer attempt failed; queued for retry
    Failed,
    /// Shutdown interrupted the attempt; queued for retry
    Cancelled,
}

pub struct Scheduler {
    config: Arc<DistributorConfig>,
    source: Arc<dyn CandidateSource>,
    store: RecipientStore,
    pool: SenderPool,
    gate: FeeGate,
    executor: TransferExecutor,
    notifier: Arc<dyn Notifier>,
    /// Global attempt counter driving sender rotation, monotonic across runs
    attempt_counter: u64,
}

impl Scheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<DistributorConfig>,
        source: Arc<dyn CandidateSource>,
        store: RecipientStore,
        pool: SenderPool,
        gate: FeeGate,
        executor: TransferExecutor,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            source,
            store,
            pool,
            gate,
            executor,
            notifier,
            attempt_counter: 0,
        }
    }

    /// Execute one distribution run
    pub async fn run(&mut self, shutdown: &mut Shutdown) -> Result<RunSummary, RunError> {
        let fetched = match self.source.fetch().await {
            Ok(addresses) => addresses,
            Err(e) => {
                let msg = format!("❌ Candidate fetch failed, aborting run: {}", e);
                error!("{}", msg);
                self.notifier.notify(&msg).await;
                return Err(RunError::Fetch(e));
            }
        };
        info!("📋 Fetched {} eligible addresses", fetched.len());

        let mut sent = self.store.load(SetKind::Sent)?;
        let pending_prev = self.store.load(SetKind::Pending)?;

        let mut candidates = RecipientStore::candidates(&fetched, &sent, &pending_prev);
        if candidates.is_empty() {
            info!("✅ Every eligible address has already been paid");
            self.store.save(SetKind::Pending, &BTreeSet::new())?;
            return Ok(RunSummary::default());
        }

        let quota = self.sample_quota(candidates.len());
        info!(
            "🎯 Paying {} of {} candidates this run",
            quota,
            candidates.len()
        );

        candidates.shuffle(&mut rand::thread_rng());
        candidates.truncate(quota);

        let mut failed: Vec<Address> = Vec::new();
        let mut summary = RunSummary::default();

        for recipient in &candidates {
            if shutdown.is_cancelled() {
                info!("🛑 Run interrupted, persisting progress");
                break;
            }

            let delay = sample_secs(
                self.config.inter_recipient_delay_min_secs,
                self.config.inter_recipient_delay_max_secs,
            );
            info!("⌛ Waiting {}s before paying {}", delay.as_secs(), recipient);
            if !shutdown.sleep(delay).await {
                info!("🛑 Run interrupted, persisting progress");
                break;
            }

            summary.attempted += 1;
            match self.process_recipient(recipient, shutdown).await {
                RecipientOutcome::Paid => {
                    summary.succeeded += 1;
                    sent.insert(recipient.clone());
                    // Persist after every success: a crash loses at most the
                    // in-flight attempt.
                    self.store.save(SetKind::Sent, &sent)?;

                    let pause = sample_secs(
                        self.config.post_send_delay_min_secs,
                        self.config.post_send_delay_max_secs,
                    );
                    if !shutdown.sleep(pause).await {
                        break;
                    }
                }
                RecipientOutcome::Deferred | RecipientOutcome::Failed => {
                    summary.failed += 1;
                    failed.push(recipient.clone());
                }
                RecipientOutcome::Cancelled => {
                    summary.failed += 1;
                    failed.push(recipient.clone());
                    break;
                }
            }
        }

        // Wholesale replace: exactly this run's unresolved recipients.
        let pending_next: BTreeSet<Address> = failed.into_iter().collect();
        self.store.save(SetKind::Pending, &pending_next)?;

        let msg = format!(
            "📦 Distribution run finished. Succeeded: {}, Failed: {}",
            summary.succeeded, summary.failed
        );
        info!("{}", msg);
        self.notifier.notify(&msg).await;

        Ok(summary)
    }

    /// One recipient: gate, pick a sender, transfer. Errors are contained
    /// here and converted into an outcome.
    async fn process_recipient(
        &mut self,
        recipient: &Address,
        shutdown: &mut Shutdown,
    ) -> RecipientOutcome {
        // Sample immediately before the send so the reading is fresh.
        let reading = match self.gate.sample().await {
            Ok(reading) => reading,
            Err(e) => {
                let msg = format!("🚫 Fee rate unavailable, deferring {}: {}", recipient, e);
                warn!("{}", msg);
                self.notifier.notify(&msg).await;
                return RecipientOutcome::Deferred;
            }
        };
        if !self.gate.admit(reading) {
            let msg = format!(
                "🚫 Fee rate {} outside band [{}, {}], deferring {}",
                reading, self.config.fee_min, self.config.fee_max, recipient
            );
            self.notifier.notify(&msg).await;
            return RecipientOutcome::Deferred;
        }

        let attempt_index = self.attempt_counter;
        self.attempt_counter += 1;

        let sender = self.pool.get(attempt_index);
        let amount = sample_amount(self.config.amount_min, self.config.amount_max);

        match self
            .executor
            .execute(sender, recipient, amount, shutdown)
            .await
        {
            Ok(confirmed) => {
                let msg = format!(
                    "✅ Paid {} base units to {} from 0x{} (tx {})",
                    confirmed.amount, recipient, confirmed.sender, confirmed.hash
                );
                info!("{}", msg);
                self.notifier.notify(&msg).await;
                RecipientOutcome::Paid
            }
            Err(TransferError::Cancelled) => RecipientOutcome::Cancelled,
            Err(e) => {
                let msg = format!("❌ Transfer to {} failed: {}", recipient, e);
                error!("{}", msg);
                self.notifier.notify(&msg).await;
                RecipientOutcome::Failed
            }
        }
    }

    /// Uniform quota in the configured band, capped at the candidate count
    fn sample_quota(&self, candidate_count: usize) -> usize {
        let quota =
            rand::thread_rng().gen_range(self.config.quota_min..=self.config.quota_max) as usize;
        quota.min(candidate_count)
    }
}

/// Uniform per-transfer amount in base units
fn sample_amount(min: u64, max: u64) -> u64 {
    rand::thread_rng().gen_range(min..=max)
}

/// Uniform duration in whole seconds
fn sample_secs(min: u64, max: u64) -> Duration {
    Duration::from_secs(rand::thread_rng().gen_range(min..=max))
}
