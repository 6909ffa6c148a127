//! Value types shared by repositories, environments and the global defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A cron-like expression evaluated by the Builder's schedule rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSchedule {
    pub cron: String,
}

#[cfg(test)]
impl TimeSchedule {
    pub fn new(cron: impl Into<String>) -> Self {
        Self { cron: cron.into() }
    }
}

/// How the build system resolves an environment variable's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableType {
    #[default]
    Plaintext,
    ParameterStore,
    SecretsManager,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableValue {
    #[serde(rename = "type", default)]
    pub kind: VariableType,
    pub value: String,
}

#[cfg(test)]
impl VariableValue {
    pub fn plaintext(value: impl Into<String>) -> Self {
        Self {
            kind: VariableType::Plaintext,
            value: value.into(),
        }
    }
}

/// Environment variables keyed by name.
pub type EnvironmentVariables = BTreeMap<String, VariableValue>;
