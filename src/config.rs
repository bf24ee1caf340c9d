//! Distributor Configuration
//!
//! Configurable parameters for the distribution service. Endpoints and sender
//! seeds have no usable defaults and must be provided; the process refuses to
//! start until `validate` passes. Everything else defaults to values matching
//! the production deployment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Base units per KRAT
pub const KRAT: u64 = 1_000_000_000_000;

/// Main configuration for the distribution service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributorConfig {
    // === Endpoints ===

    /// KratOs node JSON-RPC endpoint
    pub rpc_url: String,

    /// URL of the published eligibility list (newline-delimited addresses)
    pub candidates_url: String,

    // === Senders ===

    /// Hex-encoded ed25519 seeds of the sender accounts, in rotation order
    pub sender_seeds: Vec<String>,

    // === Amounts (base units, 10^12 = 1 KRAT) ===

    /// Lower bound of the per-transfer amount (inclusive)
    pub amount_min: u64,

    /// Upper bound of the per-transfer amount (inclusive)
    pub amount_max: u64,

    // === Fee gate ===

    /// Lower bound of the acceptable fee rate (inclusive)
    pub fee_min: f64,

    /// Upper bound of the acceptable fee rate (inclusive)
    pub fee_max: f64,

    // === Run quota ===

    /// Lower bound of the per-run recipient cap (inclusive)
    pub quota_min: u32,

    /// Upper bound of the per-run recipient cap (inclusive)
    pub quota_max: u32,

    // === Pacing (seconds) ===

    /// Minimum delay before each recipient's attempt
    pub inter_recipient_delay_min_secs: u64,

    /// Maximum delay before each recipient's attempt
    pub inter_recipient_delay_max_secs: u64,

    /// Minimum pause after a confirmed transfer
    pub post_send_delay_min_secs: u64,

    /// Maximum pause after a confirmed transfer
    pub post_send_delay_max_secs: u64,

    // === Confirmation ===

    /// Total time allowed for one transfer to reach the required depth
    pub confirm_timeout_secs: u64,

    /// Interval between status polls
    pub confirm_poll_interval_secs: u64,

    /// Confirmations required on top of inclusion before a transfer is final
    pub confirm_depth: u64,

    /// Transient poll failures tolerated before giving up on an attempt
    pub confirm_retry_limit: u32,

    /// Sleep between transient-failure retries
    pub confirm_retry_backoff_secs: u64,

    // === Daily trigger ===

    /// Hour of day the daily run starts (0-23)
    pub trigger_hour: u32,

    /// Minute of the trigger hour (0-59)
    pub trigger_minute: u32,

    /// Fixed UTC offset of the trigger wall clock, in hours
    pub utc_offset_hours: i32,

    /// Maximum random jitter added to the trigger instant
    pub trigger_jitter_max_secs: u64,

    // === External call timeouts (seconds) ===

    /// Timeout for each RPC call to the node
    pub rpc_timeout_secs: u64,

    /// Timeout for the eligibility list fetch
    pub fetch_timeout_secs: u64,

    // === Storage ===

    /// Directory holding the sent/pending address records
    pub data_dir: PathBuf,

    // === Notifications (optional) ===

    /// Telegram bot token for status messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_bot_token: Option<String>,

    /// Telegram chat id receiving status messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_chat_id: Option<String>,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            // Endpoints - no usable defaults, validate() rejects empties
            rpc_url: String::new(),
            candidates_url: String::new(),

            // Senders
            sender_seeds: vec![],

            // Amounts - 1 to 3 KRAT per transfer
            amount_min: KRAT,
            amount_max: 3 * KRAT,

            // Fee gate
            fee_min: 0.01,
            fee_max: 130.0,

            // Quota - roughly 300-330 recipients per day
            quota_min: 300,
            quota_max: 330,

            // Pacing
            inter_recipient_delay_min_secs: 60,
            inter_recipient_delay_max_secs: 180,
            post_send_delay_min_secs: 30,
            post_send_delay_max_secs: 70,

            // Confirmation
            confirm_timeout_secs: 90,
            confirm_poll_interval_secs: 3,
            confirm_depth: 2,
            confirm_retry_limit: 5,
            confirm_retry_backoff_secs: 5,

            // Daily trigger - 07:00 UTC+7
            trigger_hour: 7,
            trigger_minute: 0,
            utc_offset_hours: 7,
            trigger_jitter_max_secs: 30,

            // External call timeouts
            rpc_timeout_secs: 30,
            fetch_timeout_secs: 30,

            // Storage
            data_dir: PathBuf::from("./data"),

            // Notifications disabled until configured
            telegram_bot_token: None,
            telegram_chat_id: None,
        }
    }
}

impl DistributorConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    // Builder-style methods for CLI overrides

    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }

    pub fn with_rpc_url(mut self, rpc_url: Option<String>) -> Self {
        if let Some(url) = rpc_url {
            self.rpc_url = url;
        }
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc_url.is_empty() {
            anyhow::bail!("rpc_url is required");
        }
        if self.candidates_url.is_empty() {
            anyhow::bail!("candidates_url is required");
        }
        if self.sender_seeds.is_empty() {
            anyhow::bail!("at least one sender seed is required");
        }
        if self.amount_min == 0 {
            anyhow::bail!("amount_min must be positive");
        }
        if self.amount_min > self.amount_max {
            anyhow::bail!(
                "amount_min ({}) must not exceed amount_max ({})",
                self.amount_min,
                self.amount_max
            );
        }
        if !(self.fee_min.is_finite() && self.fee_max.is_finite()) || self.fee_min < 0.0 {
            anyhow::bail!("fee band must be finite and non-negative");
        }
        if self.fee_min > self.fee_max {
            anyhow::bail!(
                "fee_min ({}) must not exceed fee_max ({})",
                self.fee_min,
                self.fee_max
            );
        }
        if self.quota_min == 0 {
            anyhow::bail!("quota_min must be at least 1");
        }
        if self.quota_min > self.quota_max {
            anyhow::bail!(
                "quota_min ({}) must not exceed quota_max ({})",
                self.quota_min,
                self.quota_max
            );
        }
        if self.inter_recipient_delay_min_secs > self.inter_recipient_delay_max_secs {
            anyhow::bail!("inter-recipient delay range is inverted");
        }
        if self.post_send_delay_min_secs > self.post_send_delay_max_secs {
            anyhow::bail!("post-send delay range is inverted");
        }
        if self.confirm_poll_interval_secs == 0 {
            anyhow::bail!("confirm_poll_interval_secs must be at least 1");
        }
        if self.confirm_timeout_secs <= self.confirm_poll_interval_secs {
            anyhow::bail!(
                "confirm_timeout_secs ({}) must be greater than confirm_poll_interval_secs ({})",
                self.confirm_timeout_secs,
                self.confirm_poll_interval_secs
            );
        }
        if self.confirm_depth == 0 {
            anyhow::bail!("confirm_depth must be at least 1");
        }
        if self.trigger_hour > 23 {
            anyhow::bail!("trigger_hour must be 0-23");
        }
        if self.trigger_minute > 59 {
            anyhow::bail!("trigger_minute must be 0-59");
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            anyhow::bail!("utc_offset_hours must be within -12..=14");
        }
        if self.rpc_timeout_secs == 0 || self.fetch_timeout_secs == 0 {
            anyhow::bail!("external call timeouts must be positive");
        }
        if self.telegram_bot_token.is_some() != self.telegram_chat_id.is_some() {
            anyhow::bail!("telegram_bot_token and telegram_chat_id must be set together");
        }

        Ok(())
    }
}
