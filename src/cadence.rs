//! Daily Cadence Driver
//!
//! Repeats the distribution run forever: run to completion, then sleep from
//! run end until the next occurrence of the configured wall-clock trigger
//! plus a small random jitter. Only the shutdown signal stops the loop; a
//! fetch failure skips to the next day, a store failure is fatal.

use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, TimeZone, Utc};
use rand::Rng;
use std::time::Duration;
use tracing::{error, info};

use crate::config::DistributorConfig;
use crate::error::RunError;
use crate::scheduler::Scheduler;
use crate::shutdown::Shutdown;

/// Next occurrence of `hour:minute` in the given fixed UTC offset, strictly
/// after `now`.
pub fn next_trigger(
    now: DateTime<Utc>,
    hour: u32,
    minute: u32,
    utc_offset_hours: i32,
) -> DateTime<Utc> {
    // Offset and time-of-day are range-checked by config validation.
    let offset =
        FixedOffset::east_opt(utc_offset_hours * 3600).expect("utc offset validated at startup");
    let local_now = now.with_timezone(&offset);

    let today = local_now
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .expect("trigger time validated at startup");
    let mut trigger = offset
        .from_local_datetime(&today)
        .single()
        .expect("fixed offsets have unambiguous local times");

    if trigger <= local_now {
        trigger = trigger + ChronoDuration::days(1);
    }

    trigger.with_timezone(&Utc)
}

/// Run forever: one distribution run, then sleep until the next daily trigger
pub async fn run_daily(
    scheduler: &mut Scheduler,
    config: &DistributorConfig,
    shutdown: &mut Shutdown,
) -> anyhow::Result<()> {
    loop {
        match scheduler.run(shutdown).await {
            Ok(summary) => info!(
                "Run complete: {} attempted, {} succeeded, {} failed",
                summary.attempted, summary.succeeded, summary.failed
            ),
            // Fetch failures are retried at the next cadence, not within the run
            Err(RunError::Fetch(e)) => error!("❌ Run aborted: {}", e),
            // Durable state is load-bearing; do not keep running without it
            Err(RunError::Store(e)) => return Err(e.into()),
        }

        if shutdown.is_cancelled() {
            return Ok(());
        }

        let next = next_trigger(
            Utc::now(),
            config.trigger_hour,
            config.trigger_minute,
            config.utc_offset_hours,
        );
        let jitter = Duration::from_secs(
            rand::thread_rng().gen_range(0..=config.trigger_jitter_max_secs),
        );
        let wait = (next - Utc::now()).to_std().unwrap_or_default() + jitter;

        info!(
            "✅ Done for today. Next run at {} (+{}s jitter)",
            next, jitter.as_secs()
        );
        if !shutdown.sleep(wait).await {
            return Ok(());
        }
    }
}
