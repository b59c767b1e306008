//! Timer adapter (C3). Ported from `adapters/timer.py`: a cooperative
//! producer that pushes a `{source: timer, type: tick}` event once per
//! `interval_seconds`. Failures to push are logged, never raised — a single
//! bad tick must not take the whole adapter down, and the next tick is
//! always attempted regardless of whether the previous one succeeded.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use sa_store::{EventQueue, Store};

/// Priority timer ticks are pushed at. Lower than the HTTP front-end's
/// priority 3 — ticks are background maintenance, never ahead of a
/// synchronously-waited human request.
const TIMER_PRIORITY: i64 = 8;

/// Spawn the timer loop. Exits cleanly as soon as `shutdown` flips to
/// `true`; never panics out of the task on a push failure.
pub fn spawn(store: Arc<Store>, interval_seconds: u64, mut shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    push_tick(&store);
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("timer adapter shutting down");
                        return;
                    }
                }
            }
        }
    })
}

/// Includes the current minute in the payload so each tick is distinct
/// within the queue's hour-bucket dedup window — without it, every tick in
/// the same hour would collapse into a single event.
fn push_tick(store: &Store) {
    let minute = chrono::Utc::now().format("%Y-%m-%dT%H:%M").to_string();
    let payload = serde_json::json!({"minute": minute});
    match EventQueue::new(store).push("timer", "tick", payload, None, TIMER_PRIORITY) {
        Ok(id) => tracing::debug!(event_id = %id, "timer tick pushed"),
        Err(e) => tracing::warn!(error = %e, "timer tick failed to push, will retry next interval"),
    }
}
