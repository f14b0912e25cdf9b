//! Command - caller input to the dispatcher

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Traffic category tag used by the flow-affinity policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowType(pub u32);

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flow#{}", self.0)
    }
}

impl From<u32> for FlowType {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Position of a command inside a multi-part ("split") operation
///
/// Both halves of a split must run on the same channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitState {
    /// Not part of a split operation
    #[default]
    Whole,
    /// First half; its channel becomes the split anchor
    First,
    /// Second half; always follows the anchor
    Second,
}

/// A cryptographic command submitted by a caller
///
/// The payload is opaque to the dispatcher; only `size`, `split`, `flow`
/// and `context` drive its decisions.
#[derive(Debug, Clone)]
pub struct Command {
    /// Opaque payload handle handed to the engine
    pub payload: Bytes,

    /// Bytes accounted against the channel weight
    pub size: u64,

    /// Split position
    pub split: SplitState,

    /// Optional flow tag (flow-affinity policy)
    pub flow: Option<FlowType>,

    /// Caller context, echoed back in the completion
    pub context: u64,
}

impl Command {
    /// Create a whole, untagged command sized by its payload
    pub fn new(payload: Bytes, context: u64) -> Self {
        Self {
            size: payload.len() as u64,
            payload,
            split: SplitState::Whole,
            flow: None,
            context,
        }
    }

    /// Override the accounted size
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Set the split position
    pub fn with_split(mut self, split: SplitState) -> Self {
        self.split = split;
        self
    }

    /// Tag the command with a flow type
    pub fn with_flow(mut self, flow: impl Into<FlowType>) -> Self {
        self.flow = Some(flow.into());
        self
    }
}
