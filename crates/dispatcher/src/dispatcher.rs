//! Dispatcher - multi-channel submission front and ordered completion back

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, instrument, trace, warn};

use contracts::{
    ChannelId, Command, ContractError, CryptoEngine, DispatcherConfig, EngineRequest, FlowType,
    Policy, PollOutcome, RequestId,
};

use crate::error::DispatcherError;
use crate::metrics::{DispatcherMetrics, MetricsSnapshot};
use crate::policy::PolicySelector;
use crate::poll::ChannelPollAdapter;
use crate::sequencer::Sequencer;

/// Submission-path state
#[derive(Debug)]
struct Core {
    selector: PolicySelector,
    sequencer: Sequencer,
}

/// Result of an accepted submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submitted {
    /// Channel the command was handed to
    pub channel: ChannelId,
    /// Assigned sequence number (`None` in single-channel mode)
    pub request_id: Option<RequestId>,
}

/// Final state reported by [`Dispatcher::shutdown`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Commands submitted but never released
    pub in_flight: usize,
    /// Completions parked in the reorder buffer
    pub buffered: usize,
    pub metrics: MetricsSnapshot,
}

/// Multi-channel dispatcher over a [`CryptoEngine`]
///
/// Commands go out on the channel chosen by the active policy; completions
/// come back in exact submission order no matter which channel finishes
/// first. With a single channel the engine's own order is forwarded as-is.
///
/// All methods take `&self`; share it across threads with an `Arc`.
pub struct Dispatcher<E: CryptoEngine> {
    engine: E,
    config: DispatcherConfig,
    core: Mutex<Core>,
    /// Always locked before `core` when both are needed
    completions: Mutex<ChannelPollAdapter>,
    in_flight: AtomicUsize,
    metrics: Arc<DispatcherMetrics>,
}

impl<E: CryptoEngine> Dispatcher<E> {
    /// Create a dispatcher over `engine`
    ///
    /// # Errors
    /// `Config` if the channel count or queue depth is out of range, or the
    /// engine exposes fewer channels than configured.
    #[instrument(
        name = "dispatcher_init",
        skip(config, engine),
        fields(channels = config.channels, queue_depth = config.queue_depth)
    )]
    pub fn init(config: DispatcherConfig, engine: E) -> Result<Self, DispatcherError> {
        config.validate().map_err(DispatcherError::Config)?;

        let available = engine.channel_count();
        if available < config.channels {
            return Err(DispatcherError::Config(ContractError::config_validation(
                "dispatcher.channels",
                format!(
                    "engine exposes {} channel(s), {} configured",
                    available, config.channels
                ),
            )));
        }

        let capacity = config.reorder_capacity();
        info!(
            channels = config.channels,
            queue_depth = config.queue_depth,
            reorder_capacity = capacity,
            "Dispatcher initialized"
        );

        Ok(Self {
            engine,
            config,
            core: Mutex::new(Core {
                selector: PolicySelector::new(config.channels),
                sequencer: Sequencer::new(capacity),
            }),
            completions: Mutex::new(ChannelPollAdapter::new(config.channels, capacity)),
            in_flight: AtomicUsize::new(0),
            metrics: Arc::new(DispatcherMetrics::new()),
        })
    }

    /// Tear down, reporting anything left unreleased
    #[instrument(name = "dispatcher_shutdown", skip(self))]
    pub fn shutdown(self) -> ShutdownReport {
        let buffered = lock(&self.completions).reorder().len();
        let report = ShutdownReport {
            in_flight: self.in_flight(),
            buffered,
            metrics: self.metrics.snapshot(),
        };

        if report.in_flight > 0 {
            warn!(
                in_flight = report.in_flight,
                buffered = report.buffered,
                "Dispatcher shut down with commands in flight"
            );
        }
        info!(
            submitted = report.metrics.submitted,
            released = report.metrics.released,
            "Dispatcher shut down"
        );
        report
    }

    /// Fix the dispatcher-wide policy
    ///
    /// Under [`Policy::FlowAffinity`] a `flow` is bound at the same time and
    /// its channel returned.
    ///
    /// # Errors
    /// `PolicyConflict` or `NoChannelAvailable`; state is unchanged on error.
    pub fn set_policy(
        &self,
        policy: Policy,
        flow: Option<FlowType>,
    ) -> Result<Option<ChannelId>, DispatcherError> {
        let result = lock(&self.core).selector.set_policy(policy, flow);
        if let Err(e) = &result {
            self.metrics.inc_rejected();
            debug!(error = %e, "set_policy rejected");
        }
        result
    }

    /// Active policy
    pub fn policy(&self) -> Policy {
        lock(&self.core).selector.policy()
    }

    /// Bind `flow` to a channel under flow affinity
    pub fn bind_flow(&self, flow: FlowType) -> Result<ChannelId, DispatcherError> {
        let bound = self.set_policy(Policy::FlowAffinity, Some(flow))?;
        bound.ok_or(DispatcherError::NoChannelAvailable { flow: Some(flow) })
    }

    /// Hand `command` to the engine on the channel chosen by the active policy
    ///
    /// # Errors
    /// - `ProtocolViolation` when the reorder capacity is already in flight
    /// - `NoChannelAvailable` from flow affinity
    /// - `Engine` when the engine refuses; the request id, weight
    ///   reservation and split anchor are rolled back first
    #[instrument(
        level = "trace",
        name = "dispatcher_submit",
        skip(self, command),
        fields(context = command.context, size = command.size, split = ?command.split)
    )]
    pub fn submit(&self, command: Command) -> Result<Submitted, DispatcherError> {
        let mut core = lock(&self.core);
        let multi_channel = self.is_multi_channel();

        if multi_channel && self.in_flight.load(Ordering::Acquire) >= self.reorder_capacity() {
            let request_id = core.sequencer.peek();
            let err = DispatcherError::ProtocolViolation {
                request_id,
                slot: request_id as usize % self.reorder_capacity(),
            };
            self.metrics.inc_protocol_violations();
            observability::record_protocol_violation();
            error!(request_id, in_flight = self.in_flight(), "Reorder capacity exhausted");
            return Err(err);
        }

        let selection = match core.selector.select(&command) {
            Ok(selection) => selection,
            Err(e) => {
                self.metrics.inc_rejected();
                return Err(e);
            }
        };
        let channel = selection.channel;
        let request_id = multi_channel.then(|| core.sequencer.next_request_id());
        let size = command.size;

        if let Err(source) = self.engine.submit(channel, EngineRequest { request_id, command }) {
            if request_id.is_some() {
                core.sequencer.rewind();
            }
            core.selector.rollback(selection);
            self.metrics.inc_engine_errors();
            observability::record_engine_error(channel);
            warn!(channel, error = %source, "Engine refused submission");
            return Err(DispatcherError::Engine { channel, source });
        }

        self.in_flight.fetch_add(1, Ordering::AcqRel);
        self.metrics.inc_submitted();

        let policy = core.selector.policy();
        observability::record_submission(channel, size, policy);
        if policy == Policy::WeightedLeastLoaded {
            observability::record_channel_weight(channel, core.selector.load().weight(channel));
        }
        trace!(channel, request_id = ?request_id, "Submitted");

        Ok(Submitted {
            channel,
            request_id,
        })
    }

    /// Ask `channel` for the next completion
    ///
    /// In multi-channel mode this returns the next completion in global
    /// submission order, which may come from another channel's earlier drain.
    ///
    /// # Errors
    /// `InvalidChannel`, or a protocol violation raised while draining.
    #[instrument(level = "trace", name = "dispatcher_poll", skip(self))]
    pub fn poll_channel(&self, channel: ChannelId) -> Result<PollOutcome, DispatcherError> {
        if channel >= self.config.channels {
            return Err(DispatcherError::InvalidChannel {
                channel,
                channels: self.config.channels,
            });
        }

        if !self.is_multi_channel() {
            return Ok(self.poll_passthrough(channel));
        }

        let mut completions = lock(&self.completions);
        let result = completions.poll(channel, &self.engine, |channel, _| {
            self.metrics.inc_drained();
            let mut core = lock(&self.core);
            core.selector.on_complete(channel);
            if core.selector.policy() == Policy::WeightedLeastLoaded {
                observability::record_channel_weight(channel, core.selector.load().weight(channel));
            }
        });

        let buffered = completions.reorder().len();
        drop(completions);
        self.metrics.observe_buffered(buffered);
        observability::record_reorder_depth(buffered);

        match result {
            Ok(outcome) => {
                self.observe_outcome(channel, &outcome);
                Ok(outcome)
            }
            Err(e) => {
                if e.is_protocol_violation() {
                    self.metrics.inc_protocol_violations();
                    observability::record_protocol_violation();
                }
                Err(e)
            }
        }
    }

    fn poll_passthrough(&self, channel: ChannelId) -> PollOutcome {
        let outcome = self.engine.poll(channel);
        if let PollOutcome::Ready(completion) = &outcome {
            self.metrics.inc_drained();
            lock(&self.core).selector.on_complete(channel);
        }
        self.observe_outcome(channel, &outcome);
        outcome
    }

    fn observe_outcome(&self, channel: ChannelId, outcome: &PollOutcome) {
        match outcome {
            PollOutcome::Ready(completion) => {
                // Completions the engine invents are not ours to count down
                let _ = self
                    .in_flight
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
                self.metrics.inc_released();
                observability::record_release(completion);
                trace!(
                    channel,
                    context = completion.context,
                    request_id = ?completion.request_id,
                    "Released"
                );
            }
            PollOutcome::NotReady => {
                self.metrics.inc_not_ready();
                observability::record_not_ready(channel);
            }
        }
    }

    #[inline]
    fn is_multi_channel(&self) -> bool {
        self.config.channels > 1
    }

    pub fn channel_count(&self) -> usize {
        self.config.channels
    }

    pub fn queue_depth(&self) -> usize {
        self.config.queue_depth
    }

    /// 2 × channels × queue depth
    pub fn reorder_capacity(&self) -> usize {
        self.config.reorder_capacity()
    }

    /// Submitted but not yet released
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Whether one more submission fits in the reorder window
    pub fn has_capacity(&self) -> bool {
        !self.is_multi_channel() || self.in_flight() < self.reorder_capacity()
    }

    /// Bytes currently reserved on `channel` (weighted policy)
    pub fn channel_weight(&self, channel: ChannelId) -> u64 {
        lock(&self.core).selector.load().weight(channel)
    }

    pub fn channel_weights(&self) -> Vec<u64> {
        lock(&self.core).selector.load().weights().to_vec()
    }

    /// Channel bound to `flow`, if any
    pub fn flow_binding(&self, flow: FlowType) -> Option<ChannelId> {
        lock(&self.core).selector.flow_channel(flow)
    }

    /// Completions parked in the reorder buffer
    pub fn buffered(&self) -> usize {
        lock(&self.completions).reorder().len()
    }

    pub fn metrics(&self) -> &Arc<DispatcherMetrics> {
        &self.metrics
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
