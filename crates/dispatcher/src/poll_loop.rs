//! PollLoopHandle - timer-driven completion pump
//!
//! One task drains every channel per tick and forwards released completions
//! over an mpsc channel. A single task keeps the release order intact all the
//! way to the receiver.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, instrument, warn};

use contracts::{Completion, CryptoEngine, PollOutcome};

use crate::dispatcher::Dispatcher;

/// Counters returned by [`PollLoopHandle::shutdown`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollLoopStats {
    /// Timer ticks processed
    pub ticks: u64,
    /// Completions forwarded to the receiver
    pub delivered: u64,
    /// Poll errors logged and skipped
    pub errors: u64,
}

/// Handle to a running poll loop
pub struct PollLoopHandle {
    stop_tx: watch::Sender<bool>,
    worker_handle: JoinHandle<PollLoopStats>,
}

impl PollLoopHandle {
    /// Spawn the loop on the current tokio runtime
    pub fn spawn<E>(
        dispatcher: Arc<Dispatcher<E>>,
        interval: Duration,
        tx: mpsc::Sender<Completion>,
    ) -> Self
    where
        E: CryptoEngine + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let worker_handle = tokio::spawn(poll_worker(dispatcher, interval, tx, stop_rx));
        Self {
            stop_tx,
            worker_handle,
        }
    }

    /// Whether the worker has exited on its own (receiver dropped)
    pub fn is_finished(&self) -> bool {
        self.worker_handle.is_finished()
    }

    /// Stop the loop and wait for it
    #[instrument(name = "poll_loop_shutdown", skip(self))]
    pub async fn shutdown(self) -> PollLoopStats {
        let _ = self.stop_tx.send(true);
        match self.worker_handle.await {
            Ok(stats) => {
                debug!(?stats, "Poll loop shutdown complete");
                stats
            }
            Err(e) => {
                error!(error = ?e, "Poll loop task panicked");
                PollLoopStats::default()
            }
        }
    }
}

#[instrument(
    name = "poll_loop_worker",
    skip_all,
    fields(interval_us = interval.as_micros() as u64)
)]
async fn poll_worker<E: CryptoEngine>(
    dispatcher: Arc<Dispatcher<E>>,
    interval: Duration,
    tx: mpsc::Sender<Completion>,
    mut stop_rx: watch::Receiver<bool>,
) -> PollLoopStats {
    debug!("Poll loop started");
    let mut stats = PollLoopStats::default();
    let mut ticker = time::interval(interval.max(Duration::from_micros(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
                continue;
            }
        }

        stats.ticks += 1;
        let released = drain_all(&dispatcher, &mut stats);

        for completion in released {
            if tx.send(completion).await.is_err() {
                warn!("Completion receiver dropped, stopping poll loop");
                return stats;
            }
            stats.delivered += 1;
        }
    }

    debug!(ticks = stats.ticks, delivered = stats.delivered, "Poll loop stopped");
    stats
}

/// Poll each channel until it reports not-ready
fn drain_all<E: CryptoEngine>(
    dispatcher: &Dispatcher<E>,
    stats: &mut PollLoopStats,
) -> Vec<Completion> {
    let mut released = Vec::new();
    for channel in 0..dispatcher.channel_count() {
        loop {
            match dispatcher.poll_channel(channel) {
                Ok(PollOutcome::Ready(completion)) => released.push(completion),
                Ok(PollOutcome::NotReady) => break,
                Err(e) => {
                    stats.errors += 1;
                    error!(channel, error = %e, "Poll failed");
                    break;
                }
            }
        }
    }
    released
}
