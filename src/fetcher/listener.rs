use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::models::{Chain, EventRecord};

use super::interactions::InteractionFetcher;

pub type EventCallback = Arc<dyn Fn(&EventRecord) + Send + Sync>;

/// Controls a running poll loop. `stop` prevents any further poll
/// immediately; a poll already in flight finishes but its results are
/// discarded.
pub struct ListenerHandle {
    cancelled: Arc<AtomicBool>,
    wake: Arc<Notify>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn stop(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.wake.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Waits for the poll task to wind down after `stop`.
    pub async fn stopped(self) {
        let _ = self.task.await;
    }
}

/// Live updates by polling, not by provider-side filter subscriptions.
///
/// Subscriptions are unreliable on public endpoints: filters silently
/// expire and `eth_getFilterChanges` starts answering "filter not found"
/// after a node restart. Polling a growing block window through the
/// chunked fetcher sidesteps provider-side state entirely.
pub struct EventListener;

impl EventListener {
    /// Starts a poll loop delivering each newly observed log to `callback`
    /// exactly once, keyed by `(transaction_hash, log_index)`.
    ///
    /// The first tick only records the current head; history before spawn
    /// is not replayed. Each later tick fetches `[last_seen+1, head]`.
    /// `last_seen` advances only after a fully clean poll, so a failed or
    /// partially skipped window is retried next tick; duplicates from the
    /// retry are suppressed by the seen-set.
    pub fn spawn(
        fetcher: Arc<InteractionFetcher>,
        address: String,
        chain: Chain,
        topics: Vec<String>,
        poll_interval: Duration,
        callback: EventCallback,
    ) -> ListenerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());
        let flag = Arc::clone(&cancelled);
        let notify = Arc::clone(&wake);

        let task = tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_seen: Option<u64> = None;
            let mut seen: HashSet<(String, u64)> = HashSet::new();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = notify.notified() => break,
                }
                if flag.load(Ordering::SeqCst) {
                    break;
                }

                let head = match fetcher.current_head(chain).await {
                    Ok(head) => head,
                    Err(error) => {
                        warn!(
                            "Failed to read head of {}: {}",
                            chain.as_str(),
                            error
                        );
                        continue;
                    }
                };

                let from = match last_seen {
                    None => {
                        debug!("Listener primed at block {} on {}", head, chain.as_str());
                        last_seen = Some(head);
                        continue;
                    }
                    Some(last) if head > last => last + 1,
                    Some(_) => continue,
                };

                match fetcher
                    .fetch_interactions_filtered(&address, chain, from, head, &topics)
                    .await
                {
                    Ok(result) => {
                        if flag.load(Ordering::SeqCst) {
                            break;
                        }

                        let mut fresh = 0usize;
                        for event in &result.events {
                            if seen.insert(event.dedup_key()) {
                                fresh += 1;
                                callback(event);
                            }
                        }
                        if fresh > 0 {
                            info!(
                                "Delivered {} new events for {} on {}",
                                fresh,
                                address,
                                chain.as_str()
                            );
                        }

                        if result.summary.skipped_ranges == 0 {
                            last_seen = Some(head);
                        } else {
                            warn!(
                                "Poll window {}..={} had {} skipped ranges, retrying next tick",
                                from, head, result.summary.skipped_ranges
                            );
                        }
                    }
                    Err(error) => {
                        warn!(
                            "Poll failed for {} on {}: {} (window retained)",
                            address,
                            chain.as_str(),
                            error
                        );
                    }
                }
            }

            debug!("Listener for {} on {} stopped", address, chain.as_str());
        });

        ListenerHandle {
            cancelled,
            wake,
            task,
        }
    }
}
