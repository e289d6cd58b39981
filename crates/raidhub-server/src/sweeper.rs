//! Periodic removal of matches whose host stopped pinging.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use raidhub_runtime::MatchRegistry;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::metrics::MATCHES_TIMED_OUT_TOTAL;

/// Every `interval`, end matches without a ping for longer than `timeout`.
pub fn spawn_match_sweeper(
    matches: Arc<MatchRegistry>,
    timeout: Duration,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let ended = matches.end_stale_matches(timeout);
                    if !ended.is_empty() {
                        counter!(MATCHES_TIMED_OUT_TOTAL).increment(ended.len() as u64);
                        info!(count = ended.len(), server_ids = ?ended, "stale matches ended");
                    }
                }
            }
        }
        debug!("match sweeper stopped");
    })
}
