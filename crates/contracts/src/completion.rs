//! Completion - engine output, delivered back to callers

use serde::{Deserialize, Serialize};

use crate::{ChannelId, RequestId};

/// Result code reported by the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    #[default]
    Ok,
    /// Engine-specific failure code
    Failed(i32),
}

impl CompletionStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Report that a previously submitted command finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Engine result
    pub status: CompletionStatus,

    /// Caller context from the originating command
    pub context: u64,

    /// Accounted size of the originating command
    pub size: u64,

    /// Submission sequence number (`None` in single-channel passthrough)
    pub request_id: Option<RequestId>,

    /// Channel that executed the command
    pub channel: ChannelId,
}

/// Result of asking for the next completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A completion is available
    Ready(Completion),
    /// Nothing can be delivered yet
    NotReady,
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Convert into an `Option`, dropping the not-ready marker
    pub fn into_completion(self) -> Option<Completion> {
        match self {
            Self::Ready(completion) => Some(completion),
            Self::NotReady => None,
        }
    }
}
