// src/session/clock.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

/// The single authoritative session timer.
///
/// Ticks once per `tick` while the guard says the session is running and
/// fires `on_expire` exactly once when the count reaches zero. The interval
/// is gone as soon as it fires, is stopped, or the guard turns false.
pub struct CountdownClock {
    remaining: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl CountdownClock {
    /// Must be called from within a tokio runtime.
    pub fn start<G, F>(seconds: u64, tick: Duration, still_running: G, on_expire: F) -> Self
    where
        G: Fn() -> bool + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        let remaining = Arc::new(AtomicU64::new(seconds));
        let counter = remaining.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + tick, tick);
            loop {
                ticker.tick().await;
                if !still_running() {
                    tracing::debug!("Countdown stopped: session no longer running");
                    return;
                }
                let left = counter.load(Ordering::SeqCst).saturating_sub(1);
                counter.store(left, Ordering::SeqCst);
                if left == 0 {
                    tracing::info!("Countdown reached zero");
                    on_expire();
                    return;
                }
            }
        });

        Self {
            remaining,
            task: Some(task),
        }
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining.load(Ordering::SeqCst)
    }

    pub fn is_ticking(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Clears the interval. Idempotent.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for CountdownClock {
    fn drop(&mut self) {
        self.stop();
    }
}
