//! tower.configuration — Runtime settings of the control plane itself.

use serde::{Deserialize, Serialize};

/// Highest accepted log level (trace).
pub const MAX_LOG_LEVEL: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TowerConfiguration {
    pub log_level: u8,
}

impl Default for TowerConfiguration {
    fn default() -> Self {
        Self { log_level: 2 }
    }
}

impl TowerConfiguration {
    /// `EnvFilter` directive for the configured level; values above the
    /// maximum clamp to trace.
    pub fn filter_directive(&self) -> &'static str {
        match self.log_level {
            0 => "error",
            1 => "warn",
            2 => "info",
            3 => "debug",
            _ => "trace",
        }
    }
}

/// Version information reported by one auto-staging component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentVersion {
    pub name: String,
    pub version: String,
    pub commit_hash: String,
    pub branch: String,
    pub build_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentVersions {
    pub components: Vec<ComponentVersion>,
}
