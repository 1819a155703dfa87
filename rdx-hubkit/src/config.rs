//! Defines all configuration structures for the hub.
//!
//! [`HubConfig`] is designed to be deserialized from a configuration file
//! (e.g., a TOML file) using `serde` and the `config` crate, with `HUBKIT_*`
//! environment variables taking precedence. [`ComponentConfig`] is the open
//! key/value map handed to a component's `configure`.

use crate::error::HubResult;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// The top-level configuration for a [`Hub`](crate::hub::Hub).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HubConfig {
    /// A human-readable label used in log lines.
    #[serde(default = "default_label")]
    pub label: String,

    /// Start components registered on an already started hub in place.
    #[serde(default = "default_true")]
    pub late_join_start: bool,

    /// Check that a service's component conforms to the contract it is
    /// registered under.
    #[serde(default = "default_true")]
    pub verify_service_contracts: bool,
}

impl HubConfig {
    /// Loads the configuration from `path` (optional) and the environment.
    pub fn load_from<P: AsRef<Path>>(path: P) -> HubResult<Self> {
        let config = Config::builder()
            .set_default("label", default_label())?
            .set_default("late_join_start", true)?
            .set_default("verify_service_contracts", true)?
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("HUBKIT"))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            late_join_start: true,
            verify_service_contracts: true,
        }
    }
}

// --- Default value functions for serde ---

fn default_label() -> String {
    "hub".to_string()
}

fn default_true() -> bool {
    true
}

/// Configuration passed to a component on registration.
///
/// An open key/value map. The one reserved key is `component_name`, which
/// overrides the name the hub resolves the component under.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentConfig(Map<String, Value>);

impl ComponentConfig {
    pub const COMPONENT_NAME: &'static str = "component_name";

    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration carrying only a `component_name` override.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new().with(Self::COMPONENT_NAME, name.into())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// The `component_name` override, when present and non-empty.
    pub fn component_name(&self) -> Option<&str> {
        self.get_str(Self::COMPONENT_NAME)
            .filter(|name| !name.is_empty())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for ComponentConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn defaults_enable_late_join_and_contract_checks() {
        let config = HubConfig::default();
        assert_eq!(config.label, "hub");
        assert!(config.late_join_start);
        assert!(config.verify_service_contracts);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = HubConfig::load_from("does/not/exist.toml").unwrap();
        assert_eq!(config.label, "hub");
        assert!(config.late_join_start);
    }

    #[test]
    fn file_values_override_defaults() {
        let path = std::env::temp_dir().join(format!("hubkit-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "label = \"test-hub\"\nlate_join_start = false").unwrap();

        let config = HubConfig::load_from(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.label, "test-hub");
        assert!(!config.late_join_start);
        assert!(config.verify_service_contracts);
    }

    #[test]
    fn component_name_override_ignores_empty_values() {
        assert_eq!(ComponentConfig::named("alias").component_name(), Some("alias"));
        assert_eq!(ComponentConfig::named("").component_name(), None);
        assert_eq!(
            ComponentConfig::new().with("component_name", 3).component_name(),
            None
        );
    }

    #[test]
    fn deserializes_from_a_plain_map() {
        let config: ComponentConfig =
            serde_json::from_value(json!({ "component_name": "x", "retries": 3 })).unwrap();
        assert_eq!(config.component_name(), Some("x"));
        assert_eq!(config.get("retries"), Some(&json!(3)));
    }
}
