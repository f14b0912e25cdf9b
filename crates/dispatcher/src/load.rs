//! Per-channel bytes-in-flight accounting
//!
//! Every submission queues its reservation on its channel, zero when no
//! weight was reserved. A completion releases the oldest entry of its
//! channel, since engine channels complete in program order. Commands
//! submitted before the weighted policy was fixed therefore never subtract
//! weight they did not add.

use std::collections::VecDeque;

use contracts::ChannelId;

/// Channel load tracker
#[derive(Debug, Clone)]
pub struct LoadTracker {
    weights: Vec<u64>,
    /// Reservations per channel, oldest first
    reservations: Vec<VecDeque<u64>>,
}

impl LoadTracker {
    pub fn new(channels: usize) -> Self {
        Self {
            weights: vec![0; channels],
            reservations: vec![VecDeque::new(); channels],
        }
    }

    /// Record a submission on `channel` reserving `reserved` bytes
    #[inline]
    pub fn on_submit(&mut self, channel: ChannelId, reserved: u64) {
        if let (Some(w), Some(queue)) = (
            self.weights.get_mut(channel),
            self.reservations.get_mut(channel),
        ) {
            *w = w.saturating_add(reserved);
            queue.push_back(reserved);
        }
    }

    /// Release the oldest reservation on `channel`
    ///
    /// Returns the bytes released; zero for a completion nothing was
    /// recorded for.
    #[inline]
    pub fn on_complete(&mut self, channel: ChannelId) -> u64 {
        let released = self
            .reservations
            .get_mut(channel)
            .and_then(VecDeque::pop_front)
            .unwrap_or(0);
        if let Some(w) = self.weights.get_mut(channel) {
            *w = w.saturating_sub(released);
        }
        released
    }

    /// Drop the newest reservation on `channel`
    pub fn cancel_last(&mut self, channel: ChannelId) {
        let cancelled = self
            .reservations
            .get_mut(channel)
            .and_then(VecDeque::pop_back)
            .unwrap_or(0);
        if let Some(w) = self.weights.get_mut(channel) {
            *w = w.saturating_sub(cancelled);
        }
    }

    /// Submissions on `channel` not yet completed
    pub fn outstanding(&self, channel: ChannelId) -> usize {
        self.reservations.get(channel).map_or(0, VecDeque::len)
    }

    /// Channel with the lowest weight, ties to the lowest index
    pub fn least_loaded(&self) -> ChannelId {
        self.weights
            .iter()
            .enumerate()
            .min_by_key(|&(idx, &w)| (w, idx))
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    }

    pub fn weight(&self, channel: ChannelId) -> u64 {
        self.weights.get(channel).copied().unwrap_or(0)
    }

    pub fn weights(&self) -> &[u64] {
        &self.weights
    }

    /// Difference between the most and least loaded channel
    pub fn spread(&self) -> u64 {
        let max = self.weights.iter().max().copied().unwrap_or(0);
        let min = self.weights.iter().min().copied().unwrap_or(0);
        max - min
    }
}
