// src/scheduler.rs
//! Background collection loop. One tokio task, one interval; a run failure
//! is logged and the next tick happens anyway.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::collector::NewsCollector;

/// Spawn the periodic collection task. An interval of 0 disables scheduling
/// entirely (collections still run via the API trigger). The first tick
/// fires immediately and is skipped so boot stays fast.
pub fn spawn_collect_scheduler(
    collector: Arc<NewsCollector>,
    interval_secs: u64,
) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        tracing::info!("collection scheduler disabled");
        return None;
    }

    tracing::info!(interval_secs, "collection scheduler started");
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.tick().await; // immediate first tick

        loop {
            ticker.tick().await;
            match collector.run().await {
                Ok(summary) => tracing::info!(%summary, "scheduled collection tick"),
                Err(e) => tracing::error!(error = ?e, "scheduled collection failed"),
            }
        }
    }))
}
