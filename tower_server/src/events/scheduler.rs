//! Scheduler request and reply definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Message returned to the caller when the Scheduler reports a failure.
pub const SCHEDULER_FAILED_MESSAGE: &str =
    "scheduler failed, check the scheduler logs for more details";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerAction {
    Start,
    Stop,
}

impl TriggerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerAction::Start => "start",
            TriggerAction::Stop => "stop",
        }
    }
}

impl fmt::Display for TriggerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synchronous request to start or stop an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerRequest {
    pub repository: String,
    pub branch: String,
    pub action: TriggerAction,
}

/// Reply body returned by the Scheduler and passed through to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerReply {
    pub message: String,
}

impl SchedulerReply {
    pub fn failed() -> Self {
        Self {
            message: SCHEDULER_FAILED_MESSAGE.to_string(),
        }
    }
}
