//! Notification sink.
//!
//! Best-effort free-text status messages. Delivery failures are logged and
//! swallowed; they must never affect distribution correctness.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::DistributorConfig;

/// Sink for human-readable status messages
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a status message. Never fails.
    async fn notify(&self, text: &str);
}

/// Telegram bot API sink
pub struct TelegramNotifier {
    client: Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        match self.client.post(&url).json(&payload).send().await {
            Ok(response) if !response.status().is_success() => {
                warn!("Telegram returned HTTP {}", response.status());
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to deliver notification: {}", e),
        }
    }
}

/// Sink used when no Telegram credentials are configured
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _text: &str) {}
}

/// Build the sink from configuration
pub fn from_config(config: &DistributorConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    match (&config.telegram_bot_token, &config.telegram_chat_id) {
        (Some(token), Some(chat_id)) => {
            let timeout = Duration::from_secs(config.rpc_timeout_secs);
            Ok(Arc::new(TelegramNotifier::new(token, chat_id, timeout)?))
        }
        _ => {
            info!("Telegram credentials not configured, notifications disabled");
            Ok(Arc::new(NoopNotifier))
        }
    }
}
