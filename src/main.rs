// Allow dead code - some helpers are kept for API completeness
#![allow(dead_code)]

//! KratOs Distributor Service
//!
//! Automated daily distribution of KRAT tokens to the published eligibility
//! list. Each eligible address is paid once; failures are queued and retried
//! on the next run.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   KRATOS DISTRIBUTOR                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Daily Cadence Driver   ←── wakes at the configured hour    │
//! │  Distribution Scheduler ←── quota, shuffle, pacing          │
//! │  Fee Gate               ←── defers sends outside the band   │
//! │  Sender Rotation        ←── round-robin over N identities   │
//! │  Transfer Executor      ←── submit + confirm at depth       │
//! │  Recipient Store        ←── sent/pending text records       │
//! │  Notification Sink      ←── best-effort Telegram messages   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

mod cadence;
mod config;
mod crypto;
mod error;
mod executor;
mod notify;
mod roster;
mod rotation;
mod rpc;
mod scheduler;
mod shutdown;
mod store;
mod throttle;
mod types;

use config::DistributorConfig;
use executor::TransferExecutor;
use roster::{CandidateSource, HttpCandidateSource};
use rotation::SenderPool;
use rpc::{ChainApi, RpcClient};
use scheduler::Scheduler;
use store::RecipientStore;
use throttle::FeeGate;

/// KratOs Distributor - automated KRAT token distribution
#[derive(Parser, Debug)]
#[command(name = "kratos-distributor")]
#[command(author = "KratOs Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Automated KRAT token distribution service", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "distributor.toml")]
    config: PathBuf,

    /// Data directory for the sent/pending address records
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Override the node RPC endpoint
    #[arg(long)]
    rpc_url: Option<String>,

    /// Execute a single distribution run and exit
    #[arg(long)]
    run_once: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .init();

    info!("💸 KratOs Distributor v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = if args.config.exists() {
        DistributorConfig::load(&args.config)
            .with_context(|| format!("failed to load config from {:?}", args.config))?
    } else {
        warn!("Config file not found, using defaults");
        DistributorConfig::default()
    };

    // Override config with CLI args
    let config = config
        .with_data_dir(args.data_dir)
        .with_rpc_url(args.rpc_url);

    config.validate().context("invalid configuration")?;

    info!("⚙️  Configuration:");
    info!("   RPC endpoint: {}", config.rpc_url);
    info!("   Candidates: {}", config.candidates_url);
    info!("   Senders: {}", config.sender_seeds.len());
    info!("   Quota: {}-{} recipients/run", config.quota_min, config.quota_max);
    info!("   Fee band: [{}, {}]", config.fee_min, config.fee_max);
    info!(
        "   Daily trigger: {:02}:{:02} UTC{:+}",
        config.trigger_hour, config.trigger_minute, config.utc_offset_hours
    );

    let config = Arc::new(config);

    // Build the sender pool
    let pool = SenderPool::from_config(&config)?;
    info!("🔑 Sender pool: {} identities", pool.len());

    // Wire up the components
    tokio::fs::create_dir_all(&config.data_dir).await?;
    let store = RecipientStore::new(&config.data_dir);
    info!("📦 Recipient records at {:?}", config.data_dir);

    let chain: Arc<dyn ChainApi> = Arc::new(RpcClient::new(
        &config.rpc_url,
        Duration::from_secs(config.rpc_timeout_secs),
    )?);
    let source: Arc<dyn CandidateSource> = Arc::new(HttpCandidateSource::new(
        &config.candidates_url,
        Duration::from_secs(config.fetch_timeout_secs),
    )?);
    let notifier = notify::from_config(&config)?;

    let gate = FeeGate::new(chain.clone(), &config);
    let executor = TransferExecutor::new(chain, config.clone());
    let mut scheduler = Scheduler::new(
        config.clone(),
        source,
        store,
        pool,
        gate,
        executor,
        notifier,
    );

    // Flip the shutdown signal on ctrl-c so every sleep and poll can stop
    // between steps
    let (trigger, mut shutdown) = shutdown::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("🛑 Shutdown signal received");
            trigger.trigger();
        }
    });

    if args.run_once {
        let summary = scheduler.run(&mut shutdown).await?;
        info!(
            "Run finished: {} attempted, {} succeeded, {} failed",
            summary.attempted, summary.succeeded, summary.failed
        );
    } else {
        cadence::run_daily(&mut scheduler, &config, &mut shutdown).await?;
    }

    info!("👋 KratOs Distributor shutting down");
    Ok(())
}
