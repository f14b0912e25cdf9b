//! Run statistics and summary printing.

use std::time::Duration;

use contracts::Policy;
use dispatcher::{MetricsSnapshot, PollLoopStats};
use observability::ReleaseMetricsAggregator;

/// Statistics from a workload run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Commands accepted by the dispatcher
    pub submitted: u64,

    /// Completions received from the poll loop
    pub released: u64,

    /// Commands refused by the dispatcher or the engine
    pub rejected: u64,

    /// Commands never submitted because the run stopped early
    pub unsubmitted: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Engine channels in use
    pub channels: usize,

    /// Active dispatch policy
    pub policy: Policy,

    /// Whether the run hit its timeout
    pub timed_out: bool,

    /// Per-channel weights at shutdown
    pub final_weights: Vec<u64>,

    /// Dispatcher counters at shutdown
    pub dispatcher: MetricsSnapshot,

    /// Poll loop counters
    pub poll_loop: PollLoopStats,

    /// Release order and latency aggregator
    pub release_metrics: ReleaseMetricsAggregator,
}

impl RunStats {
    /// Completions per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.released as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Completions observed out of submission order
    pub fn order_violations(&self) -> u64 {
        self.release_metrics.order_violations
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Dispatch Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.3}s", self.duration.as_secs_f64());
        println!("   ├─ Channels: {}", self.channels);
        println!("   ├─ Policy: {}", self.policy);
        println!("   ├─ Submitted: {}", self.submitted);
        println!("   ├─ Released: {}", self.released);
        println!("   ├─ Rejected: {}", self.rejected);
        if self.timed_out {
            println!("   ├─ Timed out with {} unsubmitted", self.unsubmitted);
        }
        println!("   └─ Throughput: {:.0} completions/s", self.throughput());

        let summary = self.release_metrics.summary();

        println!("\n📈 Release Order");
        println!("   ├─ Order violations: {}", summary.order_violations);
        println!(
            "   ├─ Failed status: {} ({:.2}%)",
            summary.total_failed, summary.failure_rate
        );
        println!("   └─ Release latency (µs): {}", summary.latency_us);

        println!("\n🔀 Channels");
        for channel in 0..self.channels {
            let prefix = if channel + 1 == self.channels { "└─" } else { "├─" };
            println!(
                "   {} channel {}: {} completions, final weight {} bytes",
                prefix,
                channel,
                summary.per_channel.get(&channel).copied().unwrap_or(0),
                self.final_weights.get(channel).copied().unwrap_or(0)
            );
        }

        println!("\n⚙️  Dispatcher");
        println!("   ├─ Drained: {}", self.dispatcher.drained);
        println!("   ├─ Not-ready polls: {}", self.dispatcher.not_ready);
        println!("   ├─ Peak reorder depth: {}", self.dispatcher.peak_buffered);
        println!(
            "   ├─ Protocol violations: {}",
            self.dispatcher.protocol_violations
        );
        println!("   ├─ Engine errors: {}", self.dispatcher.engine_errors);
        println!(
            "   └─ Poll loop: {} ticks, {} errors",
            self.poll_loop.ticks, self.poll_loop.errors
        );

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throughput() {
        let stats = RunStats {
            released: 500,
            duration: Duration::from_millis(250),
            ..Default::default()
        };
        assert!((stats.throughput() - 2000.0).abs() < 1e-9);
        assert_eq!(RunStats::default().throughput(), 0.0);
    }
}
