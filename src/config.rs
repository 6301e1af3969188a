//! Typed engine configuration, loaded from JSON.
//!
//! ```json
//! {
//!   "steps": 100,
//!   "reject_non_finite": true,
//!   "scenarios": [
//!     { "name": "figure-32", "parameters": { "perception delay": 5, "order damping": 0.333 } }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("failed to parse config JSON: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

/// Run-level settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of steps a run advances past step 0.
    #[serde(default = "default_steps")]
    pub steps: usize,

    /// Treat infinite logic results as errors too (NaN is always rejected).
    #[serde(default)]
    pub reject_non_finite: bool,

    /// Parameter sweeps executed by [`run_scenarios`](crate::compute::scenario::run_scenarios).
    #[serde(default)]
    pub scenarios: Vec<ScenarioConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { steps: default_steps(), reject_non_finite: false, scenarios: Vec::new() }
    }
}

fn default_steps() -> usize { 100 }

/// A named set of constant parameter overrides, keyed by node id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_object_uses_defaults() {
        assert_eq!(EngineConfig::parse("{}").unwrap(), EngineConfig::default());
        assert_eq!(EngineConfig::default().steps, 100);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"steps": 8, "scenarios": [{{"name": "leaky", "parameters": {{"leak": 0.3}}}}]}}"#
        )
        .unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.steps, 8);
        assert!(!config.reject_non_finite);
        assert_eq!(config.scenarios[0].name, "leaky");
        assert_eq!(config.scenarios[0].parameters["leak"], 0.3);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(EngineConfig::parse("{"), Err(ConfigError::Json { .. })));
        assert!(matches!(
            EngineConfig::from_file(Path::new("/nonexistent/engine.json")),
            Err(ConfigError::Io { .. })
        ));
    }
}
