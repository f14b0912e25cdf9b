//! # Dispatcher
//!
//! 多通道加密引擎分发核心。
//!
//! 负责：
//! - 按策略为每条命令选择通道（单通道 / 加权最小负载 / 流亲和）
//! - 拆分命令的两半固定在同一通道
//! - 以提交顺序释放完成结果，不论哪个通道先完成

pub mod dispatcher;
pub mod error;
pub mod load;
pub mod metrics;
pub mod policy;
pub mod poll;
pub mod poll_loop;
pub mod reorder;
pub mod sequencer;

pub use contracts::{Command, Completion, CryptoEngine, Policy, PollOutcome};
pub use dispatcher::{Dispatcher, ShutdownReport, Submitted};
pub use error::DispatcherError;
pub use load::LoadTracker;
pub use metrics::{DispatcherMetrics, MetricsSnapshot};
pub use policy::{PolicySelector, Selection};
pub use poll::ChannelPollAdapter;
pub use poll_loop::{PollLoopHandle, PollLoopStats};
pub use reorder::ReorderBuffer;
pub use sequencer::Sequencer;
