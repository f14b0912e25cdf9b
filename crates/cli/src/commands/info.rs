//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::DispatchBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    dispatcher: DispatcherInfo,
    policy: PolicyInfo,
    engine: EngineInfo,
    workload: WorkloadInfo,
}

#[derive(Serialize)]
struct DispatcherInfo {
    channels: usize,
    queue_depth: usize,
    reorder_capacity: usize,
}

#[derive(Serialize)]
struct PolicyInfo {
    kind: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    flows: Vec<u32>,
}

#[derive(Serialize)]
struct EngineInfo {
    min_latency_polls: u32,
    max_latency_polls: u32,
    seed: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fail_channels: Vec<usize>,
}

#[derive(Serialize)]
struct WorkloadInfo {
    commands: u64,
    min_size: u64,
    max_size: u64,
    split_ratio: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    flows: Vec<u32>,
    poll_interval_us: u64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn build_config_info(blueprint: &DispatchBlueprint) -> ConfigInfo {
    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        dispatcher: DispatcherInfo {
            channels: blueprint.dispatcher.channels,
            queue_depth: blueprint.dispatcher.queue_depth,
            reorder_capacity: blueprint.reorder_capacity(),
        },
        policy: PolicyInfo {
            kind: blueprint.policy.kind.to_string(),
            flows: blueprint.policy.flows.iter().map(|f| f.0).collect(),
        },
        engine: EngineInfo {
            min_latency_polls: blueprint.engine.min_latency_polls,
            max_latency_polls: blueprint.engine.max_latency_polls,
            seed: blueprint.engine.seed,
            fail_channels: blueprint.engine.fail_channels.clone(),
        },
        workload: WorkloadInfo {
            commands: blueprint.workload.commands,
            min_size: blueprint.workload.min_size,
            max_size: blueprint.workload.max_size,
            split_ratio: blueprint.workload.split_ratio,
            flows: blueprint.workload.flows.iter().map(|f| f.0).collect(),
            poll_interval_us: blueprint.workload.poll_interval_us,
        },
    }
}

fn print_config_info(blueprint: &DispatchBlueprint) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               CESA Dispatch Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let dispatcher = &blueprint.dispatcher;
    println!("🔀 Dispatcher");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Channels: {}", dispatcher.channels);
    println!("   ├─ Queue depth: {}", dispatcher.queue_depth);
    println!(
        "   └─ Reorder capacity: {} (2 x {} x {})",
        blueprint.reorder_capacity(),
        dispatcher.channels,
        dispatcher.queue_depth
    );

    let policy = &blueprint.policy;
    println!("\n⚖️  Policy");
    if policy.flows.is_empty() {
        println!("   └─ Kind: {}", policy.kind);
    } else {
        println!("   ├─ Kind: {}", policy.kind);
        println!("   └─ Pre-bound flows ({}):", policy.flows.len());
        for (i, flow) in policy.flows.iter().enumerate() {
            let prefix = if i + 1 == policy.flows.len() { "└─" } else { "├─" };
            println!("      {} {} -> channel {}", prefix, flow, i);
        }
    }

    let engine = &blueprint.engine;
    println!("\n⚙️  Simulated Engine");
    println!(
        "   ├─ Latency: {}..={} polls",
        engine.min_latency_polls, engine.max_latency_polls
    );
    println!("   ├─ Seed: {}", engine.seed);
    if engine.fail_channels.is_empty() {
        println!("   └─ Failing channels: none");
    } else {
        println!("   └─ Failing channels: {:?}", engine.fail_channels);
    }

    let workload = &blueprint.workload;
    println!("\n📦 Workload");
    println!("   ├─ Commands: {}", workload.commands);
    println!(
        "   ├─ Sizes: {}..={} bytes",
        workload.min_size, workload.max_size
    );
    println!("   ├─ Split ratio: {:.2}", workload.split_ratio);
    if !workload.flows.is_empty() {
        let flows: Vec<String> = workload.flows.iter().map(|f| f.to_string()).collect();
        println!("   ├─ Flows: {}", flows.join(", "));
    }
    println!("   └─ Poll interval: {} µs", workload.poll_interval_us);

    println!();
}
