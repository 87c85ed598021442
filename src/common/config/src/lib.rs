//! Configuration management for Quarry.
//!
//! The adapter reads exactly one configuration surface: the capability
//! policy that decides whether operators may be emulated client-side.
//! Operator names stay strings here; the engine validates them when it
//! builds a `CapabilityPolicy`.

use std::collections::BTreeMap;
use std::path::Path;

use common_error::QueryResult;
use serde::{Deserialize, Serialize};

/// Top-level Quarry configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuarryConfig {
    /// Capability policy options.
    pub policy: PolicyConfig,
}

impl QuarryConfig {
    /// Parse a configuration from a JSON document.
    pub fn from_json_str(json: &str) -> QueryResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> QueryResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_string(&self) -> QueryResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Capability policy options as written in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolicyConfig {
    /// Force every operator onto the Translate path.
    pub disallow_all_emulation: bool,
    /// Per-operator emulation allowance, keyed by operator name.
    pub per_operator_emulation_allowed: BTreeMap<String, bool>,
}

impl PolicyConfig {
    /// Disallow emulation for every operator.
    pub fn with_disallow_all_emulation(mut self, disallow: bool) -> Self {
        self.disallow_all_emulation = disallow;
        self
    }

    /// Set the emulation allowance for one operator.
    pub fn with_operator(mut self, operator: impl Into<String>, allowed: bool) -> Self {
        self.per_operator_emulation_allowed
            .insert(operator.into(), allowed);
        self
    }
}
