//! DispatchBlueprint - Config Loader output
//!
//! Describes the full dispatcher setup: channel geometry, policy,
//! the simulated engine and the workload driven by the CLI.

use serde::{Deserialize, Serialize};

use crate::{ChannelId, ContractError, FlowType, Policy, RequestId};

/// Upper bound on engine channels
pub const MAX_CHANNELS: usize = 64;

/// Upper bound on per-channel queue depth
///
/// Keeps the reorder buffer (allocated in full at init) at most
/// 2 × 64 × 4096 slots.
pub const MAX_QUEUE_DEPTH: usize = 4096;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete dispatcher blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Channel geometry
    pub dispatcher: DispatcherConfig,

    /// Load-balancing policy
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Simulated engine behavior
    #[serde(default)]
    pub engine: EngineSimConfig,

    /// Synthetic workload
    #[serde(default)]
    pub workload: WorkloadConfig,
}

/// Channel geometry, fixed at init
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Number of engine channels used
    pub channels: usize,

    /// Commands each channel can hold in its queue
    pub queue_depth: usize,
}

impl DispatcherConfig {
    pub fn new(channels: usize, queue_depth: usize) -> Self {
        Self {
            channels,
            queue_depth,
        }
    }

    /// Reorder buffer size: 2 × channels × queue depth
    pub fn reorder_capacity(&self) -> usize {
        2 * self.channels * self.queue_depth
    }

    /// Check channel count and queue depth
    ///
    /// # Errors
    /// `ConfigValidation` naming the offending field.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(ContractError::config_validation(
                "dispatcher.channels",
                format!(
                    "channels must be in 1..={}, got {}",
                    MAX_CHANNELS, self.channels
                ),
            ));
        }
        if self.queue_depth == 0 || self.queue_depth > MAX_QUEUE_DEPTH {
            return Err(ContractError::config_validation(
                "dispatcher.queue_depth",
                format!(
                    "queue_depth must be in 1..={}, got {}",
                    MAX_QUEUE_DEPTH, self.queue_depth
                ),
            ));
        }
        let capacity = self
            .channels
            .checked_mul(self.queue_depth)
            .and_then(|n| n.checked_mul(2));
        match capacity {
            Some(c) if c <= RequestId::MAX as usize => Ok(()),
            _ => Err(ContractError::config_validation(
                "dispatcher.queue_depth",
                format!(
                    "reorder capacity (2 x {} x {}) exceeds the request id range",
                    self.channels, self.queue_depth
                ),
            )),
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            channels: 2,
            queue_depth: 4,
        }
    }
}

/// Policy section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Policy applied at startup
    #[serde(default)]
    pub kind: Policy,

    /// Flow types bound to channels at startup (flow affinity only)
    #[serde(default)]
    pub flows: Vec<FlowType>,
}

/// Simulated engine section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSimConfig {
    /// Minimum polls before a queued command completes
    #[serde(default = "default_min_latency_polls")]
    pub min_latency_polls: u32,

    /// Maximum polls before a queued command completes
    #[serde(default = "default_max_latency_polls")]
    pub max_latency_polls: u32,

    /// RNG seed for latencies
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Channels that refuse every submission
    #[serde(default)]
    pub fail_channels: Vec<ChannelId>,
}

fn default_min_latency_polls() -> u32 {
    1
}

fn default_max_latency_polls() -> u32 {
    8
}

fn default_seed() -> u64 {
    42
}

impl Default for EngineSimConfig {
    fn default() -> Self {
        Self {
            min_latency_polls: default_min_latency_polls(),
            max_latency_polls: default_max_latency_polls(),
            seed: default_seed(),
            fail_channels: Vec::new(),
        }
    }
}

/// Synthetic workload section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Number of commands to submit
    #[serde(default = "default_commands")]
    pub commands: u64,

    /// Smallest command size in bytes
    #[serde(default = "default_min_size")]
    pub min_size: u64,

    /// Largest command size in bytes
    #[serde(default = "default_max_size")]
    pub max_size: u64,

    /// Fraction of commands submitted as split pairs
    #[serde(default)]
    pub split_ratio: f64,

    /// Flow tags assigned round-robin to commands
    #[serde(default)]
    pub flows: Vec<FlowType>,

    /// Poll loop tick in microseconds
    #[serde(default = "default_poll_interval_us")]
    pub poll_interval_us: u64,
}

fn default_commands() -> u64 {
    1000
}

fn default_min_size() -> u64 {
    64
}

fn default_max_size() -> u64 {
    4096
}

fn default_poll_interval_us() -> u64 {
    100
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            commands: default_commands(),
            min_size: default_min_size(),
            max_size: default_max_size(),
            split_ratio: 0.0,
            flows: Vec::new(),
            poll_interval_us: default_poll_interval_us(),
        }
    }
}

impl DispatchBlueprint {
    /// Blueprint with default sections around the given geometry
    pub fn with_dispatcher(dispatcher: DispatcherConfig) -> Self {
        Self {
            version: ConfigVersion::V1,
            dispatcher,
            policy: PolicyConfig::default(),
            engine: EngineSimConfig::default(),
            workload: WorkloadConfig::default(),
        }
    }

    /// Derived reorder buffer capacity
    pub fn reorder_capacity(&self) -> usize {
        self.dispatcher.reorder_capacity()
    }
}
