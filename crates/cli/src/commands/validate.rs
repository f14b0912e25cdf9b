//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{DispatchBlueprint, Policy};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    channels: usize,
    queue_depth: usize,
    reorder_capacity: usize,
    policy: String,
    flow_count: usize,
    commands: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    channels: blueprint.dispatcher.channels,
                    queue_depth: blueprint.dispatcher.queue_depth,
                    reorder_capacity: blueprint.reorder_capacity(),
                    policy: blueprint.policy.kind.to_string(),
                    flow_count: blueprint.policy.flows.len(),
                    commands: blueprint.workload.commands,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &DispatchBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let channels = blueprint.dispatcher.channels;

    match blueprint.policy.kind {
        Policy::Disabled | Policy::SingleChannel if channels > 1 => {
            warnings.push(format!(
                "policy {} sends every command to channel 0 - {} channel(s) stay idle",
                blueprint.policy.kind,
                channels - 1
            ));
        }
        Policy::FlowAffinity if blueprint.workload.split_ratio > 0.0 => {
            warnings.push(
                "split second halves follow their first half, not their flow binding"
                    .to_string(),
            );
        }
        _ => {}
    }

    if !blueprint.engine.fail_channels.is_empty() {
        warnings.push(format!(
            "engine.fail_channels {:?} will refuse every submission",
            blueprint.engine.fail_channels
        ));
    }

    if blueprint.workload.commands == 0 {
        warnings.push("workload.commands is 0 - run will submit nothing".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!(
                "  Channels: {} x depth {} (reorder capacity {})",
                summary.channels, summary.queue_depth, summary.reorder_capacity
            );
            println!("  Policy: {}", summary.policy);
            println!("  Pre-bound flows: {}", summary.flow_count);
            println!("  Workload commands: {}", summary.commands);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::DispatcherConfig;
    use std::path::PathBuf;

    #[test]
    fn test_warns_on_idle_channels() {
        let blueprint = DispatchBlueprint::with_dispatcher(DispatcherConfig::new(4, 2));
        let warnings = collect_warnings(&blueprint);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("3 channel(s) stay idle"));
    }

    #[test]
    fn test_no_warnings_for_weighted() {
        let mut blueprint = DispatchBlueprint::with_dispatcher(DispatcherConfig::new(4, 2));
        blueprint.policy.kind = Policy::WeightedLeastLoaded;
        assert!(collect_warnings(&blueprint).is_empty());
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let args = ValidateArgs {
            config: PathBuf::from("/nonexistent/dispatch.toml"),
            json: true,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dispatch.toml");
        std::fs::write(
            &path,
            "[dispatcher]\nchannels = 2\nqueue_depth = 4\n[policy]\nkind = \"weighted_least_loaded\"\n",
        )
        .unwrap();

        let result = validate_config(&ValidateArgs {
            config: path,
            json: false,
        });
        assert!(result.valid);
        let summary = result.summary.unwrap();
        assert_eq!(summary.reorder_capacity, 16);
        assert_eq!(summary.policy, "weighted_least_loaded");
    }
}
