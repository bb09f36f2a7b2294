use crate::core::errors::{FlowError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// How to resolve two registrations of one identity with different bodies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail with `FlowError::DuplicateDefinition`
    #[default]
    Reject,
    /// Keep the body registered first and log a warning
    FirstWins,
}

/// Per-flow overrides, merged over the top-level values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowOverrides {
    #[serde(default)]
    pub max_actions: Option<usize>,
    #[serde(default)]
    pub trace_steps: Option<bool>,
}

/// Build configuration for flow assembly and compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Resolution of conflicting duplicate registrations
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    /// Upper bound on actions per compiled sequence (None = unbounded)
    #[serde(default)]
    pub max_actions: Option<usize>,
    /// Emit a trace event for every step when a sequence runs
    #[serde(default)]
    pub trace_steps: bool,
    /// Overrides keyed by flow identity
    #[serde(default)]
    pub flows: BTreeMap<String, FlowOverrides>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Reject,
            max_actions: None,
            trace_steps: false,
            flows: BTreeMap::new(),
        }
    }
}

impl FlowConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn load_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| FlowError::io(format!("read {}", path.display()), e))?;
        Self::from_yaml_str(&yaml)
    }

    /// Validates configuration values
    pub fn validate(&self) -> Result<()> {
        if self.max_actions == Some(0) {
            return Err(FlowError::configuration_field(
                "max_actions must be greater than 0",
                "max_actions",
            ));
        }

        for (flow, overrides) in &self.flows {
            if flow.is_empty() {
                return Err(FlowError::configuration("flow name cannot be empty"));
            }
            if overrides.max_actions == Some(0) {
                return Err(FlowError::configuration_field(
                    format!("max_actions for flow '{}' must be greater than 0", flow),
                    format!("flows.{}.max_actions", flow),
                ));
            }
        }

        Ok(())
    }

    /// Effective settings for one flow identity
    pub fn for_flow(&self, flow: &str) -> FlowSettings {
        let overrides = self.flows.get(flow);
        FlowSettings {
            max_actions: overrides
                .and_then(|o| o.max_actions)
                .or(self.max_actions),
            trace_steps: overrides
                .and_then(|o| o.trace_steps)
                .unwrap_or(self.trace_steps),
        }
    }
}

/// Resolved compile settings for a single flow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowSettings {
    pub max_actions: Option<usize>,
    pub trace_steps: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = FlowConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, FlowConfig::default());
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
    }

    #[test]
    fn test_overrides_merge_over_top_level() {
        let yaml = r#"
duplicate_policy: first_wins
max_actions: 32
trace_steps: false
flows:
  timer_isr:
    max_actions: 4
    trace_steps: true
  init: {}
"#;
        let config = FlowConfig::from_yaml_str(yaml).unwrap();

        let isr = config.for_flow("timer_isr");
        assert_eq!(isr.max_actions, Some(4));
        assert!(isr.trace_steps);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::FirstWins);

        let init = config.for_flow("init");
        assert_eq!(init.max_actions, Some(32));
        assert!(!init.trace_steps);

        let other = config.for_flow("never_configured");
        assert_eq!(other.max_actions, Some(32));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = FlowConfig::from_yaml_str("max_actions: 0").unwrap_err();
        assert!(matches!(err, FlowError::Configuration { .. }));

        let err = FlowConfig::from_yaml_str("flows:\n  isr:\n    max_actions: 0\n").unwrap_err();
        match err {
            FlowError::Configuration { field, .. } => {
                assert_eq!(field.as_deref(), Some("flows.isr.max_actions"))
            }
            other => panic!("Expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_yaml() {
        let err = FlowConfig::from_yaml_str("duplicate_policy: sometimes").unwrap_err();
        assert_eq!(err.category(), "serialization");
    }

    #[test]
    fn test_missing_file() {
        let err = FlowConfig::load_yaml_file("/nonexistent/flowseq.yaml").unwrap_err();
        assert_eq!(err.category(), "io");
    }
}
