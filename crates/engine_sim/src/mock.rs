//! Mock crypto engine
//!
//! Used by unit tests and the CLI in place of the hardware driver.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{
    ChannelId, Completion, CompletionStatus, ContractError, CryptoEngine, EngineRequest,
    EngineSimConfig, PollOutcome,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{instrument, trace};

/// How queued commands become ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    /// Only after [`MockEngine::complete`] releases them
    Manual,
    /// After a random number of polls on the channel
    Latency { min_polls: u32, max_polls: u32 },
}

/// Mock engine configuration (failure injection)
#[derive(Debug, Clone)]
pub struct MockEngineConfig {
    /// Number of channels exposed
    pub channels: usize,
    /// Completion mode
    pub mode: CompletionMode,
    /// RNG seed for the latency model
    pub seed: u64,
    /// Channels that refuse every submission
    pub fail_channels: Vec<ChannelId>,
    /// Contexts whose completion reports `Failed(code)`
    pub fail_contexts: Vec<(u64, i32)>,
}

impl MockEngineConfig {
    pub fn manual(channels: usize) -> Self {
        Self {
            channels,
            mode: CompletionMode::Manual,
            seed: 0,
            fail_channels: Vec::new(),
            fail_contexts: Vec::new(),
        }
    }

    /// Build from the `[engine]` config section
    pub fn from_sim_config(channels: usize, sim: &EngineSimConfig) -> Self {
        Self {
            channels,
            mode: CompletionMode::Latency {
                min_polls: sim.min_latency_polls,
                max_polls: sim.max_latency_polls,
            },
            seed: sim.seed,
            fail_channels: sim.fail_channels.clone(),
            fail_contexts: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct Queued {
    request: EngineRequest,
    remaining_polls: u32,
}

#[derive(Debug, Default)]
struct ChannelQueue {
    queue: VecDeque<Queued>,
    /// Manual mode: how many head entries may still complete
    released: usize,
    submitted: u64,
    completed: u64,
    /// Contexts in submission order
    history: Vec<u64>,
}

/// Mock crypto engine
pub struct MockEngine {
    mode: CompletionMode,
    channels: Vec<Mutex<ChannelQueue>>,
    fail_channels: HashSet<ChannelId>,
    fail_contexts: Vec<(u64, i32)>,
    rng: Mutex<StdRng>,
}

impl MockEngine {
    /// Manual-mode engine with `channels` channels
    pub fn manual(channels: usize) -> Self {
        Self::with_config(MockEngineConfig::manual(channels))
    }

    /// Create the engine from a configuration
    pub fn with_config(config: MockEngineConfig) -> Self {
        Self {
            mode: config.mode,
            channels: (0..config.channels)
                .map(|_| Mutex::new(ChannelQueue::default()))
                .collect(),
            fail_channels: config.fail_channels.into_iter().collect(),
            fail_contexts: config.fail_contexts,
            rng: Mutex::new(StdRng::seed_from_u64(config.seed)),
        }
    }

    /// Manual mode: let the next `count` queued commands of `channel` complete
    ///
    /// Credit is capped at the commands currently queued; commands submitted
    /// later need their own call.
    pub fn complete(&self, channel: ChannelId, count: usize) {
        if let Some(queue) = self.channels.get(channel) {
            let mut state = lock(queue);
            state.released = state
                .released
                .saturating_add(count)
                .min(state.queue.len());
        }
    }

    /// Commands queued but not yet reported on `channel`
    pub fn pending(&self, channel: ChannelId) -> usize {
        self.channels
            .get(channel)
            .map(|q| lock(q).queue.len())
            .unwrap_or(0)
    }

    /// Total commands accepted on `channel`
    pub fn submitted(&self, channel: ChannelId) -> u64 {
        self.channels
            .get(channel)
            .map(|q| lock(q).submitted)
            .unwrap_or(0)
    }

    /// Total completions reported by `channel`
    pub fn completed(&self, channel: ChannelId) -> u64 {
        self.channels
            .get(channel)
            .map(|q| lock(q).completed)
            .unwrap_or(0)
    }

    /// Contexts accepted on `channel`, in submission order
    pub fn history(&self, channel: ChannelId) -> Vec<u64> {
        self.channels
            .get(channel)
            .map(|q| lock(q).history.clone())
            .unwrap_or_default()
    }

    fn draw_latency(&self) -> u32 {
        match self.mode {
            CompletionMode::Manual => 0,
            CompletionMode::Latency {
                min_polls,
                max_polls,
            } => lock(&self.rng).random_range(min_polls..=max_polls),
        }
    }

    fn status_for(&self, context: u64) -> CompletionStatus {
        self.fail_contexts
            .iter()
            .find(|(ctx, _)| *ctx == context)
            .map(|(_, code)| CompletionStatus::Failed(*code))
            .unwrap_or(CompletionStatus::Ok)
    }

    fn queue(&self, channel: ChannelId) -> Result<&Mutex<ChannelQueue>, ContractError> {
        self.channels
            .get(channel)
            .ok_or(ContractError::EngineChannel {
                channel,
                channels: self.channels.len(),
            })
    }
}

impl CryptoEngine for MockEngine {
    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    #[instrument(
        level = "trace",
        name = "mock_engine_submit",
        skip(self, request),
        fields(context = request.command.context, request_id = ?request.request_id)
    )]
    fn submit(&self, channel: ChannelId, request: EngineRequest) -> Result<(), ContractError> {
        let queue = self.queue(channel)?;
        if self.fail_channels.contains(&channel) {
            return Err(ContractError::engine(channel, "mock failure"));
        }

        let remaining_polls = self.draw_latency();
        let mut queue = lock(queue);
        queue.submitted += 1;
        queue.history.push(request.command.context);
        queue.queue.push_back(Queued {
            request,
            remaining_polls,
        });
        Ok(())
    }

    fn poll(&self, channel: ChannelId) -> PollOutcome {
        let Some(queue) = self.channels.get(channel) else {
            return PollOutcome::NotReady;
        };
        let mut guard = lock(queue);
        let state = &mut *guard;

        let ready = match state.queue.front_mut() {
            None => false,
            Some(head) => match self.mode {
                CompletionMode::Manual => state.released > 0,
                CompletionMode::Latency { .. } => {
                    head.remaining_polls = head.remaining_polls.saturating_sub(1);
                    head.remaining_polls == 0
                }
            },
        };
        if !ready {
            return PollOutcome::NotReady;
        }

        let Some(done) = state.queue.pop_front() else {
            return PollOutcome::NotReady;
        };
        if self.mode == CompletionMode::Manual {
            state.released -= 1;
        }
        state.completed += 1;

        let command = done.request.command;
        trace!(channel, context = command.context, "Mock engine completion");
        PollOutcome::Ready(Completion {
            status: self.status_for(command.context),
            context: command.context,
            size: command.size,
            request_id: done.request.request_id,
            channel,
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
