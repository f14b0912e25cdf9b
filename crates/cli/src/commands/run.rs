//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{DispatchBlueprint, Policy};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::workload::{RunConfig, WorkloadRunner};

/// Execute the `run` command
pub async fn run_workload(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut blueprint, args);
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after command-line overrides")?;

    info!(
        channels = blueprint.dispatcher.channels,
        queue_depth = blueprint.dispatcher.queue_depth,
        reorder_capacity = blueprint.reorder_capacity(),
        policy = %blueprint.policy.kind,
        commands = blueprint.workload.commands,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let run_config = RunConfig {
        blueprint,
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    let runner = WorkloadRunner::new(run_config);
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting workload...");

    tokio::select! {
        result = runner.run() => {
            let stats = result.context("Workload execution failed")?;
            stats.print_summary();

            if stats.order_violations() > 0 {
                anyhow::bail!(
                    "{} completion(s) released out of submission order",
                    stats.order_violations()
                );
            }
            if stats.timed_out {
                anyhow::bail!("Workload timed out after {}s", args.timeout);
            }
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping workload...");
        }
    }

    info!("CESA Dispatch finished");
    Ok(())
}

/// Apply command-line overrides on top of the file configuration
fn apply_overrides(blueprint: &mut DispatchBlueprint, args: &RunArgs) {
    if let Some(channels) = args.channels {
        info!(channels, "Overriding channel count from CLI");
        blueprint.dispatcher.channels = channels;
    }
    if let Some(queue_depth) = args.queue_depth {
        info!(queue_depth, "Overriding queue depth from CLI");
        blueprint.dispatcher.queue_depth = queue_depth;
    }
    if let Some(commands) = args.commands {
        blueprint.workload.commands = commands;
    }
    if let Some(policy) = args.policy {
        let policy = Policy::from(policy);
        info!(policy = %policy, "Overriding policy from CLI");
        blueprint.policy.kind = policy;
    }
    if let Some(seed) = args.seed {
        blueprint.engine.seed = seed;
    }
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &DispatchBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Dispatcher:");
    println!("  Channels: {}", blueprint.dispatcher.channels);
    println!("  Queue depth: {}", blueprint.dispatcher.queue_depth);
    println!("  Reorder capacity: {}", blueprint.reorder_capacity());
    println!("\nPolicy: {}", blueprint.policy.kind);
    if !blueprint.policy.flows.is_empty() {
        let flows: Vec<String> = blueprint.policy.flows.iter().map(|f| f.to_string()).collect();
        println!("  Pre-bound flows: {}", flows.join(", "));
    }
    println!("\nWorkload:");
    println!("  Commands: {}", blueprint.workload.commands);
    println!(
        "  Sizes: {}..={} bytes",
        blueprint.workload.min_size, blueprint.workload.max_size
    );
    println!("  Split ratio: {:.2}", blueprint.workload.split_ratio);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::PolicyArg;
    use contracts::DispatcherConfig;
    use std::path::PathBuf;

    fn args() -> RunArgs {
        RunArgs {
            config: PathBuf::from("config.toml"),
            channels: None,
            queue_depth: None,
            commands: None,
            policy: None,
            seed: None,
            metrics_port: 0,
            timeout: 0,
            dry_run: false,
        }
    }

    #[test]
    fn test_apply_overrides() {
        let mut blueprint = DispatchBlueprint::with_dispatcher(DispatcherConfig::new(2, 4));
        let args = RunArgs {
            channels: Some(8),
            queue_depth: Some(16),
            commands: Some(10),
            policy: Some(PolicyArg::SingleChannel),
            seed: Some(5),
            ..args()
        };

        apply_overrides(&mut blueprint, &args);
        assert_eq!(blueprint.dispatcher, DispatcherConfig::new(8, 16));
        assert_eq!(blueprint.reorder_capacity(), 256);
        assert_eq!(blueprint.workload.commands, 10);
        assert_eq!(blueprint.policy.kind, Policy::SingleChannel);
        assert_eq!(blueprint.engine.seed, 5);
    }

    #[test]
    fn test_no_overrides_keeps_file_values() {
        let mut blueprint = DispatchBlueprint::with_dispatcher(DispatcherConfig::new(3, 2));
        apply_overrides(&mut blueprint, &args());
        assert_eq!(blueprint.dispatcher, DispatcherConfig::new(3, 2));
    }

    #[tokio::test]
    async fn test_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dispatch.toml");
        std::fs::write(&path, "[dispatcher]\nchannels = 2\nqueue_depth = 4\n").unwrap();

        let args = RunArgs {
            config: path,
            dry_run: true,
            ..args()
        };
        run_workload(&args).await.unwrap();
    }

    #[tokio::test]
    async fn test_override_revalidated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dispatch.toml");
        std::fs::write(&path, "[dispatcher]\nchannels = 2\nqueue_depth = 4\n").unwrap();

        let args = RunArgs {
            config: path,
            channels: Some(0),
            dry_run: true,
            ..args()
        };
        assert!(run_workload(&args).await.is_err());
    }
}
