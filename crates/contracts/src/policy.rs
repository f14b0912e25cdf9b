//! Load-balancing policy shared by config and dispatcher

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dispatcher-wide channel selection policy
///
/// `Disabled` is the initial value; the first `set_policy` call fixes
/// the active policy for the lifetime of the dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// No policy selected yet; everything runs on channel 0
    #[default]
    Disabled,
    /// Everything runs on channel 0
    SingleChannel,
    /// Least bytes in flight wins, ties to the lowest index
    WeightedLeastLoaded,
    /// Each flow type is pinned to its own channel
    FlowAffinity,
}

impl Policy {
    /// Stable lowercase name (matches the config spelling)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::SingleChannel => "single_channel",
            Self::WeightedLeastLoaded => "weighted_least_loaded",
            Self::FlowAffinity => "flow_affinity",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
