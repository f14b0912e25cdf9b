//! Synthetic command stream.

use bytes::Bytes;
use contracts::{Command, SplitState, WorkloadConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded generator of workload commands
///
/// Contexts count up from 0 in generation order. Split pairs are emitted
/// back to back as `First` then `Second`.
pub struct CommandGenerator {
    rng: StdRng,
    config: WorkloadConfig,
    next_context: u64,
    pending_second: Option<Command>,
}

impl CommandGenerator {
    pub fn new(config: WorkloadConfig, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            config,
            next_context: 0,
            pending_second: None,
        }
    }

    /// Commands left to generate
    pub fn remaining(&self) -> u64 {
        self.config.commands.saturating_sub(self.next_context)
            + u64::from(self.pending_second.is_some())
    }

    fn command(&mut self, split: SplitState) -> Command {
        let context = self.next_context;
        self.next_context += 1;

        let size = self
            .rng
            .random_range(self.config.min_size..=self.config.max_size);
        let mut command = Command::new(Bytes::from(vec![0u8; size as usize]), context)
            .with_split(split);
        if !self.config.flows.is_empty() {
            let flow = self.config.flows[(context % self.config.flows.len() as u64) as usize];
            command = command.with_flow(flow);
        }
        command
    }
}

impl Iterator for CommandGenerator {
    type Item = Command;

    fn next(&mut self) -> Option<Command> {
        if let Some(second) = self.pending_second.take() {
            return Some(second);
        }

        let left = self.config.commands.saturating_sub(self.next_context);
        if left == 0 {
            return None;
        }

        if left >= 2 && self.rng.random_bool(self.config.split_ratio.clamp(0.0, 1.0)) {
            let first = self.command(SplitState::First);
            let mut second = self.command(SplitState::Second);
            // Both halves travel together whatever the flow rotation says
            second.flow = first.flow;
            self.pending_second = Some(second);
            return Some(first);
        }

        Some(self.command(SplitState::Whole))
    }
}
