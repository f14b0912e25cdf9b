//! Dispatcher error types

use contracts::{ChannelId, ContractError, FlowType, Policy, RequestId};
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Invalid channel count / queue depth at init
    #[error("invalid dispatcher configuration: {0}")]
    Config(#[source] ContractError),

    /// A second, different policy was requested
    #[error("policy conflict: {active} is active, {requested} was requested")]
    PolicyConflict { active: Policy, requested: Policy },

    /// Flow-affinity binding exhausted (or command carries no flow tag)
    #[error("no channel available for {}", flow_label(.flow))]
    NoChannelAvailable { flow: Option<FlowType> },

    /// Reorder slot collision: more commands in flight than capacity allows
    #[error("protocol violation: request {request_id} collides with occupied reorder slot {slot}")]
    ProtocolViolation { request_id: RequestId, slot: usize },

    /// Multi-channel completion arrived without a request id
    #[error("protocol violation: untagged completion on channel {channel}")]
    UntaggedCompletion { channel: ChannelId },

    /// Channel index out of range
    #[error("channel {channel} out of range (channels: {channels})")]
    InvalidChannel { channel: ChannelId, channels: usize },

    /// Engine refused the submission (passed through unchanged)
    #[error("engine error on channel {channel}: {source}")]
    Engine {
        channel: ChannelId,
        #[source]
        source: ContractError,
    },
}

impl DispatcherError {
    /// True for reorder protocol violations of either kind
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::ProtocolViolation { .. } | Self::UntaggedCompletion { .. }
        )
    }
}

fn flow_label(flow: &Option<FlowType>) -> String {
    match flow {
        Some(flow) => flow.to_string(),
        None => "untagged command".to_string(),
    }
}
