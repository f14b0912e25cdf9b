//! Policy selector
//!
//! Chooses the channel for each command under the active policy and pins
//! the two halves of a split command to one channel.

use contracts::{ChannelId, Command, FlowType, Policy, SplitState};
use tracing::{debug, warn};

use crate::error::DispatcherError;
use crate::load::LoadTracker;

/// Outcome of [`PolicySelector::select`], kept so it can be rolled back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Chosen channel
    pub channel: ChannelId,
    /// Bytes reserved on `channel` (weighted policy only)
    pub reserved: u64,
    /// Split anchor before this selection
    previous_anchor: Option<ChannelId>,
}

/// Dispatcher-wide policy state
#[derive(Debug, Clone)]
pub struct PolicySelector {
    policy: Policy,
    /// Flow bound to each channel
    bindings: Vec<Option<FlowType>>,
    /// Channel of the last `First` half awaiting its `Second`
    split_anchor: Option<ChannelId>,
    load: LoadTracker,
}

impl PolicySelector {
    pub fn new(channels: usize) -> Self {
        Self {
            policy: Policy::Disabled,
            bindings: vec![None; channels],
            split_anchor: None,
            load: LoadTracker::new(channels),
        }
    }

    /// Active policy
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Fix the dispatcher-wide policy, optionally binding a flow
    ///
    /// Returns the bound channel when a flow was bound.
    ///
    /// # Errors
    /// - `PolicyConflict` if a different policy is already active
    /// - `NoChannelAvailable` if the flow cannot be bound
    ///
    /// Nothing changes on error.
    pub fn set_policy(
        &mut self,
        policy: Policy,
        flow: Option<FlowType>,
    ) -> Result<Option<ChannelId>, DispatcherError> {
        if self.policy != Policy::Disabled && self.policy != policy {
            return Err(DispatcherError::PolicyConflict {
                active: self.policy,
                requested: policy,
            });
        }

        let bound = match (policy, flow) {
            (Policy::FlowAffinity, Some(flow)) => Some(self.bind_flow(flow)?),
            _ => None,
        };

        if self.policy != policy {
            debug!(policy = %policy, "Dispatcher policy fixed");
        }
        self.policy = policy;
        Ok(bound)
    }

    /// Bind `flow` to a channel
    ///
    /// An existing binding is returned as-is; otherwise the first unbound
    /// channel is claimed.
    ///
    /// # Errors
    /// `NoChannelAvailable` when every channel is already bound.
    pub fn bind_flow(&mut self, flow: FlowType) -> Result<ChannelId, DispatcherError> {
        if let Some(channel) = self.flow_channel(flow) {
            return Ok(channel);
        }

        let channel = self
            .bindings
            .iter()
            .position(Option::is_none)
            .ok_or(DispatcherError::NoChannelAvailable { flow: Some(flow) })?;
        self.bindings[channel] = Some(flow);
        debug!(flow = %flow, channel, "Flow bound to channel");
        Ok(channel)
    }

    /// Channel bound to `flow`, if any
    pub fn flow_channel(&self, flow: FlowType) -> Option<ChannelId> {
        self.bindings.iter().position(|b| *b == Some(flow))
    }

    /// Choose the channel for `command`
    ///
    /// Under the weighted policy the command's size is reserved on the
    /// chosen channel immediately.
    pub fn select(&mut self, command: &Command) -> Result<Selection, DispatcherError> {
        let previous_anchor = self.split_anchor;

        let channel = match (command.split, self.split_anchor) {
            (SplitState::Second, Some(anchor)) => anchor,
            (SplitState::Second, None) => {
                warn!(
                    context = command.context,
                    "Second split half without an anchor, selecting normally"
                );
                self.pick(command)?
            }
            _ => self.pick(command)?,
        };

        match command.split {
            SplitState::First => self.split_anchor = Some(channel),
            SplitState::Second => self.split_anchor = None,
            SplitState::Whole => {}
        }

        let reserved = if self.policy == Policy::WeightedLeastLoaded {
            command.size
        } else {
            0
        };
        self.load.on_submit(channel, reserved);

        Ok(Selection {
            channel,
            reserved,
            previous_anchor,
        })
    }

    /// Undo a selection whose submission never reached the engine
    pub fn rollback(&mut self, selection: Selection) {
        self.load.cancel_last(selection.channel);
        self.split_anchor = selection.previous_anchor;
    }

    /// Release the weight reserved by the oldest command on `channel`
    #[inline]
    pub fn on_complete(&mut self, channel: ChannelId) -> u64 {
        self.load.on_complete(channel)
    }

    pub fn load(&self) -> &LoadTracker {
        &self.load
    }

    /// Channel currently anchoring an open split pair
    pub fn split_anchor(&self) -> Option<ChannelId> {
        self.split_anchor
    }

    fn pick(&mut self, command: &Command) -> Result<ChannelId, DispatcherError> {
        match self.policy {
            Policy::Disabled | Policy::SingleChannel => Ok(0),
            Policy::WeightedLeastLoaded => Ok(self.load.least_loaded()),
            Policy::FlowAffinity => {
                let flow = command
                    .flow
                    .ok_or(DispatcherError::NoChannelAvailable { flow: None })?;
                self.bind_flow(flow)
            }
        }
    }
}
