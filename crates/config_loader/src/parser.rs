//! Config parsing
//!
//! TOML is the primary format; JSON is accepted as well.

use contracts::{ContractError, DispatchBlueprint};

/// Config file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML config
pub fn parse_toml(content: &str) -> Result<DispatchBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON config
pub fn parse_json(content: &str) -> Result<DispatchBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse config in the given format
pub fn parse(content: &str, format: ConfigFormat) -> Result<DispatchBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Policy;

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
version = "V1"

[dispatcher]
channels = 4
queue_depth = 16

[policy]
kind = "single_channel"

[engine]
min_latency_polls = 2
max_latency_polls = 5
seed = 7
fail_channels = [3]

[workload]
commands = 200
min_size = 16
max_size = 1024
split_ratio = 0.25
poll_interval_us = 50
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.dispatcher.channels, 4);
        assert_eq!(bp.policy.kind, Policy::SingleChannel);
        assert_eq!(bp.engine.fail_channels, vec![3]);
        assert_eq!(bp.workload.split_ratio, 0.25);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "dispatcher": { "channels": 2, "queue_depth": 4 },
            "policy": { "kind": "flow_affinity", "flows": [1] }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        assert_eq!(result.unwrap().policy.kind, Policy::FlowAffinity);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_unknown_policy() {
        let content = r#"
[dispatcher]
channels = 2
queue_depth = 4

[policy]
kind = "round_robin"
"#;
        assert!(parse_toml(content).is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
