//! Manual start/stop of an environment through the Scheduler.

use serde_json::Value;

use super::gate;
use super::lifecycle::Lifecycle;
use crate::actors::{Actor, InvokeError};
use crate::error::{TowerError, TowerResult};
use crate::events::scheduler::{SchedulerReply, SchedulerRequest, TriggerAction};

impl Lifecycle {
    /// Start or stop an environment and wait for the Scheduler's answer.
    ///
    /// A Scheduler that replies with a failure status still yields `Ok`,
    /// carrying a message that points at the Scheduler logs.
    pub async fn trigger(
        &self,
        repository: &str,
        branch: &str,
        action: TriggerAction,
    ) -> TowerResult<SchedulerReply> {
        const OP: &str = "trigger";

        let info = self.environment_status(OP, repository, branch).await?;
        gate::check(action.into(), info.status, repository, branch)?;

        let request = SchedulerRequest {
            repository: repository.to_string(),
            branch: branch.to_string(),
            action,
        };
        let payload = serde_json::to_value(&request)
            .map_err(|e| TowerError::invoke(OP)(InvokeError::from(e)))?;

        let reply = self
            .call(Actor::Scheduler, action.as_str(), payload)
            .await
            .map_err(TowerError::invoke(OP))?;

        if !reply.is_success() {
            tracing::warn!(
                repository,
                branch,
                %action,
                status = reply.status,
                "Scheduler reported failure"
            );
            return Ok(SchedulerReply::failed());
        }

        let reply = scheduler_message(reply.payload).map_err(TowerError::invoke(OP))?;
        tracing::info!(repository, branch, %action, "Scheduler accepted trigger");
        Ok(reply)
    }
}

/// An empty reply counts as plain success.
fn scheduler_message(payload: Value) -> Result<SchedulerReply, InvokeError> {
    match payload {
        Value::Null => Ok(SchedulerReply {
            message: "success".to_string(),
        }),
        Value::String(message) => Ok(SchedulerReply { message }),
        other => serde_json::from_value(other).map_err(|e| InvokeError::Decode {
            actor: Actor::Scheduler,
            reason: e.to_string(),
        }),
    }
}
