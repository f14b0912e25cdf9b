//! Dispatcher metrics recording
//!
//! Thin wrappers over the `metrics` facade plus an in-memory aggregator
//! for end-of-run summaries.

use std::collections::BTreeMap;

use contracts::{ChannelId, Completion, Policy};
use metrics::{counter, gauge, histogram};

/// Record an accepted submission
pub fn record_submission(channel: ChannelId, size: u64, policy: Policy) {
    counter!(
        "cesa_dispatch_submitted_total",
        "channel" => channel.to_string(),
        "policy" => policy.as_str()
    )
    .increment(1);
    histogram!("cesa_dispatch_command_bytes").record(size as f64);
}

/// Record a completion released to the caller
pub fn record_release(completion: &Completion) {
    let status = if completion.status.is_ok() { "ok" } else { "failed" };
    counter!(
        "cesa_dispatch_released_total",
        "channel" => completion.channel.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record a poll call that could not deliver anything
pub fn record_not_ready(channel: ChannelId) {
    counter!(
        "cesa_dispatch_not_ready_total",
        "channel" => channel.to_string()
    )
    .increment(1);
}

/// Record a refused reorder insert or capacity overrun
pub fn record_protocol_violation() {
    counter!("cesa_dispatch_protocol_violations_total").increment(1);
}

/// Record an engine refusal
pub fn record_engine_error(channel: ChannelId) {
    counter!(
        "cesa_dispatch_engine_errors_total",
        "channel" => channel.to_string()
    )
    .increment(1);
}

/// Record the bytes in flight on a channel
pub fn record_channel_weight(channel: ChannelId, weight: u64) {
    gauge!(
        "cesa_dispatch_channel_weight_bytes",
        "channel" => channel.to_string()
    )
    .set(weight as f64);
}

/// Record how many completions wait in the reorder buffer
pub fn record_reorder_depth(depth: usize) {
    gauge!("cesa_dispatch_reorder_depth").set(depth as f64);
}

/// Record submit-to-release latency
pub fn record_release_latency_us(latency_us: f64) {
    histogram!("cesa_dispatch_release_latency_us").record(latency_us);
}

/// Release metrics aggregator
///
/// Aggregates in memory for the end-of-run summary.
#[derive(Debug, Clone, Default)]
pub struct ReleaseMetricsAggregator {
    /// Completions observed
    pub total_released: u64,

    /// Completions with a failed engine status
    pub total_failed: u64,

    /// Completions observed out of submission order
    pub order_violations: u64,

    /// Completions per channel
    pub per_channel: BTreeMap<ChannelId, u64>,

    /// Submit-to-release latency (µs)
    pub latency_stats: RunningStats,

    last_context: Option<u64>,
}

impl ReleaseMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one released completion into the aggregate
    ///
    /// Contexts are expected to increase strictly in submission order.
    pub fn update(&mut self, completion: &Completion, latency_us: Option<f64>) {
        self.total_released += 1;
        if !completion.status.is_ok() {
            self.total_failed += 1;
        }
        if let Some(last) = self.last_context {
            if completion.context <= last {
                self.order_violations += 1;
            }
        }
        self.last_context = Some(completion.context);
        *self.per_channel.entry(completion.channel).or_insert(0) += 1;

        if let Some(latency) = latency_us {
            self.latency_stats.push(latency);
        }
    }

    /// Build the summary report
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_released: self.total_released,
            total_failed: self.total_failed,
            order_violations: self.order_violations,
            failure_rate: if self.total_released > 0 {
                self.total_failed as f64 / self.total_released as f64 * 100.0
            } else {
                0.0
            },
            latency_us: StatsSummary::from(&self.latency_stats),
            per_channel: self.per_channel.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_released: u64,
    pub total_failed: u64,
    pub order_violations: u64,
    pub failure_rate: f64,
    pub latency_us: StatsSummary,
    pub per_channel: BTreeMap<ChannelId, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Release Metrics Summary ===")?;
        writeln!(f, "Released: {}", self.total_released)?;
        writeln!(
            f,
            "Failed status: {} ({:.2}%)",
            self.total_failed, self.failure_rate
        )?;
        writeln!(f, "Order violations: {}", self.order_violations)?;
        writeln!(f, "Release latency (us): {}", self.latency_us)?;

        if !self.per_channel.is_empty() {
            writeln!(f, "Per-channel completions:")?;
            for (channel, count) in &self.per_channel {
                writeln!(f, "  channel {}: {}", channel, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::CompletionStatus;

    fn completion(context: u64, channel: ChannelId, status: CompletionStatus) -> Completion {
        Completion {
            status,
            context,
            size: 64,
            request_id: Some(context as u32),
            channel,
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        stats.push(1.0);
        stats.push(2.0);
        stats.push(3.0);
        stats.push(4.0);
        stats.push(5.0);

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_counts_channels_and_failures() {
        let mut aggregator = ReleaseMetricsAggregator::new();

        aggregator.update(&completion(0, 0, CompletionStatus::Ok), Some(10.0));
        aggregator.update(&completion(1, 1, CompletionStatus::Failed(-5)), Some(30.0));
        aggregator.update(&completion(2, 1, CompletionStatus::Ok), None);

        assert_eq!(aggregator.total_released, 3);
        assert_eq!(aggregator.total_failed, 1);
        assert_eq!(aggregator.order_violations, 0);
        assert_eq!(aggregator.per_channel.get(&1), Some(&2));
        assert_eq!(aggregator.latency_stats.count(), 2);
    }

    #[test]
    fn test_aggregator_detects_order_violation() {
        let mut aggregator = ReleaseMetricsAggregator::new();

        aggregator.update(&completion(0, 0, CompletionStatus::Ok), None);
        aggregator.update(&completion(2, 0, CompletionStatus::Ok), None);
        aggregator.update(&completion(1, 1, CompletionStatus::Ok), None);

        assert_eq!(aggregator.order_violations, 1);
        aggregator.reset();
        assert_eq!(aggregator.total_released, 0);
    }

    #[test]
    fn test_summary_display() {
        let summary = MetricsSummary {
            total_released: 100,
            total_failed: 5,
            order_violations: 0,
            failure_rate: 5.0,
            latency_us: StatsSummary {
                count: 100,
                min: 20.0,
                max: 80.0,
                mean: 50.0,
                std_dev: 15.0,
            },
            per_channel: BTreeMap::from([(0, 60), (1, 40)]),
        };

        let output = format!("{}", summary);
        assert!(output.contains("Released: 100"));
        assert!(output.contains("5.00%"));
        assert!(output.contains("channel 1: 40"));
    }
}
