//! Environment status values written by the Builder and read by the gate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvironmentStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "running")]
    Running,
    #[serde(rename = "stopped")]
    Stopped,
    #[serde(rename = "initiating failed")]
    InitiatingFailed,
    #[serde(rename = "updating failed")]
    UpdatingFailed,
    #[serde(rename = "destroying failed")]
    DestroyingFailed,
}

impl EnvironmentStatus {
    pub const ALL: [EnvironmentStatus; 6] = [
        EnvironmentStatus::Pending,
        EnvironmentStatus::Running,
        EnvironmentStatus::Stopped,
        EnvironmentStatus::InitiatingFailed,
        EnvironmentStatus::UpdatingFailed,
        EnvironmentStatus::DestroyingFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentStatus::Pending => "pending",
            EnvironmentStatus::Running => "running",
            EnvironmentStatus::Stopped => "stopped",
            EnvironmentStatus::InitiatingFailed => "initiating failed",
            EnvironmentStatus::UpdatingFailed => "updating failed",
            EnvironmentStatus::DestroyingFailed => "destroying failed",
        }
    }
}

impl fmt::Display for EnvironmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown environment status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for EnvironmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
