//! Config validation
//!
//! Rules:
//! - channel count / queue depth within limits
//! - policy flows unique, only under flow_affinity, at most one per channel
//! - engine latency bounds ordered, fail channels in range
//! - workload sizes and split ratio sane, workload flows declared

use std::collections::HashSet;

use contracts::{ContractError, DispatchBlueprint, Policy};

/// Validate a DispatchBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    blueprint.dispatcher.validate()?;
    validate_policy(blueprint)?;
    validate_engine(blueprint)?;
    validate_workload(blueprint)?;
    Ok(())
}

/// Validate policy flows
fn validate_policy(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    let policy = &blueprint.policy;

    if policy.kind != Policy::FlowAffinity && !policy.flows.is_empty() {
        return Err(ContractError::config_validation(
            "policy.flows",
            format!("flows are only meaningful with flow_affinity, policy is {}", policy.kind),
        ));
    }

    let mut seen = HashSet::new();
    for flow in &policy.flows {
        if !seen.insert(flow) {
            return Err(ContractError::config_validation(
                format!("policy.flows[{}]", flow.0),
                "duplicate flow type",
            ));
        }
    }

    if policy.flows.len() > blueprint.dispatcher.channels {
        return Err(ContractError::config_validation(
            "policy.flows",
            format!(
                "{} flows cannot be bound to {} channels",
                policy.flows.len(),
                blueprint.dispatcher.channels
            ),
        ));
    }

    Ok(())
}

/// Validate simulated engine settings
fn validate_engine(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    let engine = &blueprint.engine;

    if engine.min_latency_polls > engine.max_latency_polls {
        return Err(ContractError::config_validation(
            "engine.min_latency_polls / engine.max_latency_polls",
            format!(
                "min_latency_polls ({}) must be <= max_latency_polls ({})",
                engine.min_latency_polls, engine.max_latency_polls
            ),
        ));
    }

    for &channel in &engine.fail_channels {
        if channel >= blueprint.dispatcher.channels {
            return Err(ContractError::config_validation(
                "engine.fail_channels",
                format!(
                    "channel {} out of range (channels: {})",
                    channel, blueprint.dispatcher.channels
                ),
            ));
        }
    }

    Ok(())
}

/// Validate workload settings
fn validate_workload(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    let workload = &blueprint.workload;

    if workload.min_size == 0 || workload.min_size > workload.max_size {
        return Err(ContractError::config_validation(
            "workload.min_size / workload.max_size",
            format!(
                "sizes must satisfy 0 < min_size ({}) <= max_size ({})",
                workload.min_size, workload.max_size
            ),
        ));
    }

    if !(0.0..=1.0).contains(&workload.split_ratio) {
        return Err(ContractError::config_validation(
            "workload.split_ratio",
            format!("split_ratio must be in [0, 1], got {}", workload.split_ratio),
        ));
    }

    if workload.poll_interval_us == 0 {
        return Err(ContractError::config_validation(
            "workload.poll_interval_us",
            "poll_interval_us must be > 0",
        ));
    }

    if blueprint.policy.kind == Policy::FlowAffinity {
        if workload.flows.is_empty() {
            return Err(ContractError::config_validation(
                "workload.flows",
                "flow_affinity requires tagged workload commands",
            ));
        }
        let declared: HashSet<_> = blueprint.policy.flows.iter().collect();
        let undeclared: HashSet<_> = workload
            .flows
            .iter()
            .filter(|flow| !declared.contains(flow))
            .collect();
        let free = blueprint.dispatcher.channels - declared.len();
        if undeclared.len() > free {
            return Err(ContractError::config_validation(
                "workload.flows",
                format!(
                    "{} unbound workload flows but only {} free channels",
                    undeclared.len(),
                    free
                ),
            ));
        }
    }

    Ok(())
}
