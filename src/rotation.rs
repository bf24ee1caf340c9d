//! Sender Rotation
//!
//! A fixed ordered pool of sender identities handed out round-robin by
//! attempt index. The lookup is stateless given the index; the scheduler
//! supplies a global counter so consecutive attempts draw different senders.
//! The engine never skips a sender for balance or past failures; those
//! surface as transfer errors instead.

use anyhow::Context;

use crate::config::DistributorConfig;
use crate::crypto::SenderKeys;

/// Fixed pool of sender identities
pub struct SenderPool {
    senders: Vec<SenderKeys>,
}

impl SenderPool {
    /// Build the pool from the configured seeds, preserving order
    pub fn from_config(config: &DistributorConfig) -> anyhow::Result<Self> {
        let mut senders = Vec::with_capacity(config.sender_seeds.len());
        for (i, seed) in config.sender_seeds.iter().enumerate() {
            let keys = SenderKeys::from_seed_hex(seed)
                .with_context(|| format!("sender seed #{}", i + 1))?;
            senders.push(keys);
        }
        Self::new(senders)
    }

    pub fn new(senders: Vec<SenderKeys>) -> anyhow::Result<Self> {
        if senders.is_empty() {
            anyhow::bail!("at least one sender is required");
        }
        Ok(Self { senders })
    }

    /// Round-robin lookup: attempt index modulo pool size
    pub fn get(&self, attempt_index: u64) -> &SenderKeys {
        let slot = (attempt_index % self.senders.len() as u64) as usize;
        &self.senders[slot]
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}
