//! # Observability
//!
//! 分发器的日志与指标出口。`dispatcher` 在提交、排出和释放路径上调用
//! `record_*`，CLI 在启动时调用 [`init_with_config`]。
//!
//! ## 指标
//!
//! | 名称 | 类型 | 标签 |
//! |------|------|------|
//! | `cesa_dispatch_submitted_total` | counter | channel, policy |
//! | `cesa_dispatch_command_bytes` | histogram | |
//! | `cesa_dispatch_released_total` | counter | channel, status |
//! | `cesa_dispatch_not_ready_total` | counter | channel |
//! | `cesa_dispatch_protocol_violations_total` | counter | |
//! | `cesa_dispatch_engine_errors_total` | counter | channel |
//! | `cesa_dispatch_channel_weight_bytes` | gauge | channel |
//! | `cesa_dispatch_reorder_depth` | gauge | |
//! | `cesa_dispatch_release_latency_us` | histogram | |
//!
//! 未安装 recorder 时所有 `record_*` 均为空操作，单元测试无需初始化。
//!
//! [`ReleaseMetricsAggregator`] 在进程内统计释放顺序与延迟，供
//! `cesa-dispatch run` 的汇总输出与顺序校验使用。
//!
//! ```ignore
//! observability::init_with_config(ObservabilityConfig {
//!     log_format: LogFormat::Compact,
//!     metrics_port: None,
//!     default_log_level: "debug".into(),
//! })?;
//!
//! let mut releases = ReleaseMetricsAggregator::new();
//! if let PollOutcome::Ready(completion) = dispatcher.poll_channel(0)? {
//!     releases.update(&completion, None);
//! }
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-exports
pub use crate::metrics::{
    record_channel_weight, record_engine_error, record_not_ready, record_protocol_violation,
    record_release, record_release_latency_us, record_reorder_depth, record_submission,
    MetricsSummary, ReleaseMetricsAggregator, RunningStats, StatsSummary,
};

/// 默认配置初始化：JSON 日志，`RUST_LOG` 覆盖级别，指标监听 0.0.0.0:9000
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
    /// 默认日志级别
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: Some(9000),
            default_log_level: "info".to_string(),
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON 结构化日志
    #[default]
    Json,
    /// 人类可读格式
    Pretty,
    /// 紧凑单行格式
    Compact,
}

/// 使用自定义配置初始化
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    match config.log_format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty())
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact())
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
    }

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// 只安装 Prometheus recorder
///
/// `run --metrics-port` 在日志已初始化之后使用。
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}
