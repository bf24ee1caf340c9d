//! Fee Gate
//!
//! Samples the chain's fee rate immediately before each send and admits the
//! attempt only when the reading falls inside the configured closed band.
//! Per-attempt sampling avoids committing to stale pricing; the cost is one
//! extra RPC read per recipient.

use std::sync::Arc;
use tracing::warn;

use crate::config::DistributorConfig;
use crate::error::RpcError;
use crate::rpc::ChainApi;

/// Admission gate on the network fee rate
pub struct FeeGate {
    chain: Arc<dyn ChainApi>,
    fee_min: f64,
    fee_max: f64,
}

impl FeeGate {
    pub fn new(chain: Arc<dyn ChainApi>, config: &DistributorConfig) -> Self {
        Self {
            chain,
            fee_min: config.fee_min,
            fee_max: config.fee_max,
        }
    }

    /// Fetch the current fee rate from the node
    pub async fn sample(&self) -> Result<f64, RpcError> {
        self.chain.fee_rate().await
    }

    /// Closed-interval band check. Symmetric: too-low and too-high readings
    /// are both rejected, only the log line differs.
    pub fn admit(&self, reading: f64) -> bool {
        if reading < self.fee_min {
            warn!(
                "🚫 Fee rate {} below band [{}, {}]",
                reading, self.fee_min, self.fee_max
            );
            false
        } else if reading > self.fee_max {
            warn!(
                "🚫 Fee rate {} above band [{}, {}]",
                reading, self.fee_min, self.fee_max
            );
            false
        } else {
            true
        }
    }
}
