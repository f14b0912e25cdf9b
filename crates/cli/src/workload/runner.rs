//! Workload runner - wires the simulated engine, dispatcher, and poll loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{Command, DispatchBlueprint, Policy, PolicyConfig};
use dispatcher::{Dispatcher, PollLoopHandle};
use engine_sim::{MockEngine, MockEngineConfig};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{CommandGenerator, RunStats};

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Effective configuration after CLI overrides
    pub blueprint: DispatchBlueprint,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Drives a generated workload through a dispatcher over [`MockEngine`]
pub struct WorkloadRunner {
    config: RunConfig,
}

impl WorkloadRunner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Run the workload to completion
    pub async fn run(self) -> Result<RunStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let channels = blueprint.dispatcher.channels;
        let engine = MockEngine::with_config(MockEngineConfig::from_sim_config(
            channels,
            &blueprint.engine,
        ));
        let dispatcher = Arc::new(
            Dispatcher::init(blueprint.dispatcher, engine).context("Failed to create dispatcher")?,
        );
        apply_policy(&dispatcher, &blueprint.policy)?;

        info!(
            channels,
            queue_depth = blueprint.dispatcher.queue_depth,
            reorder_capacity = dispatcher.reorder_capacity(),
            policy = %dispatcher.policy(),
            "Dispatcher ready"
        );

        let (tx, mut rx) = mpsc::channel(dispatcher.reorder_capacity());
        let interval = Duration::from_micros(blueprint.workload.poll_interval_us);
        let poll_loop = PollLoopHandle::spawn(Arc::clone(&dispatcher), interval, tx);

        let mut generator =
            CommandGenerator::new(blueprint.workload.clone(), blueprint.engine.seed);
        let mut stats = RunStats {
            channels,
            policy: dispatcher.policy(),
            ..Default::default()
        };

        info!(commands = blueprint.workload.commands, "Workload running");

        let driving = drive(&dispatcher, &mut generator, &mut rx, &mut stats);
        let finished = match self.config.timeout {
            Some(timeout) => tokio::time::timeout(timeout, driving).await.ok(),
            None => Some(driving.await),
        };
        let outcome = match finished {
            Some(result) => result,
            None => {
                warn!("Workload timed out");
                stats.timed_out = true;
                Ok(())
            }
        };
        stats.unsubmitted = generator.remaining();

        info!("Shutting down dispatcher...");
        stats.poll_loop = poll_loop.shutdown().await;
        stats.final_weights = dispatcher.channel_weights();

        match Arc::try_unwrap(dispatcher) {
            Ok(dispatcher) => stats.dispatcher = dispatcher.shutdown().metrics,
            Err(dispatcher) => {
                warn!("Dispatcher still shared at shutdown");
                stats.dispatcher = dispatcher.metrics().snapshot();
            }
        }

        outcome?;
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            throughput = format!("{:.0}", stats.throughput()),
            order_violations = stats.order_violations(),
            "Workload complete"
        );

        Ok(stats)
    }
}

/// Fix the configured policy and pre-bind its flows
fn apply_policy(dispatcher: &Dispatcher<MockEngine>, policy: &PolicyConfig) -> Result<()> {
    match policy.kind {
        Policy::Disabled => {}
        Policy::FlowAffinity if !policy.flows.is_empty() => {
            for flow in &policy.flows {
                let channel = dispatcher
                    .bind_flow(*flow)
                    .with_context(|| format!("Failed to bind {}", flow))?;
                info!(flow = %flow, channel, "Flow pre-bound");
            }
        }
        kind => {
            dispatcher
                .set_policy(kind, None)
                .context("Failed to apply policy")?;
        }
    }
    Ok(())
}

/// Submit with capacity back-pressure and collect completions in release order
async fn drive(
    dispatcher: &Dispatcher<MockEngine>,
    generator: &mut CommandGenerator,
    rx: &mut mpsc::Receiver<contracts::Completion>,
    stats: &mut RunStats,
) -> Result<()> {
    let mut submit_times: HashMap<u64, Instant> = HashMap::new();
    let mut next: Option<Command> = generator.next();

    loop {
        while dispatcher.has_capacity() {
            let Some(command) = next.take() else {
                break;
            };
            let context = command.context;
            match dispatcher.submit(command) {
                Ok(submitted) => {
                    stats.submitted += 1;
                    submit_times.insert(context, Instant::now());
                    debug!(context, channel = submitted.channel, "Command submitted");
                }
                Err(e) => {
                    stats.rejected += 1;
                    warn!(context, error = %e, "Command rejected");
                }
            }
            next = generator.next();
        }

        if next.is_none() && stats.released >= stats.submitted {
            return Ok(());
        }

        let completion = rx
            .recv()
            .await
            .context("Poll loop stopped before the workload finished")?;

        let latency_us = submit_times
            .remove(&completion.context)
            .map(|t| t.elapsed().as_secs_f64() * 1_000_000.0);
        if let Some(latency) = latency_us {
            observability::record_release_latency_us(latency);
        }
        let violations = stats.order_violations();
        stats.release_metrics.update(&completion, latency_us);
        stats.released += 1;

        if stats.order_violations() > violations {
            warn!(
                context = completion.context,
                "Completion released out of submission order"
            );
        }
    }
}
