//! Lifecycle orchestration for repositories and environments.
//!
//! The operations themselves live next to their resource:
//! `repository_service`, `environment_service`, `trigger_service`,
//! `configuration_service` and `version_service` each add an `impl Lifecycle`
//! block. This module holds the shared state and the Builder dispatch path.

use std::sync::Arc;

use crate::actors::{Actor, ActorInvoker, ActorReply, InvokeError};
use crate::error::{TowerError, TowerResult};
use crate::events::builder::BuilderEvent;
use crate::models::environment::EnvironmentStatusInfo;
use crate::store::{StoreError, Stores};

#[derive(Clone)]
pub struct Lifecycle {
    pub(crate) stores: Stores,
    pub(crate) invoker: Arc<dyn ActorInvoker>,
    /// Stage keying the global repository defaults and tower configuration.
    pub(crate) stage: String,
}

impl Lifecycle {
    pub fn new(stores: Stores, invoker: Arc<dyn ActorInvoker>, stage: impl Into<String>) -> Self {
        Self {
            stores,
            invoker,
            stage: stage.into(),
        }
    }

    /// Status projection of one environment, or `NotFound`.
    pub(crate) async fn environment_status(
        &self,
        operation: &'static str,
        repository: &str,
        branch: &str,
    ) -> TowerResult<EnvironmentStatusInfo> {
        self.stores
            .environments
            .get_environment_status(repository, branch)
            .await
            .map_err(|e| {
                tracing::error!(operation, repository, branch, error = %e, "Status lookup failed");
                TowerError::store(operation)(e)
            })?
            .ok_or(TowerError::NotFound)
    }

    /// Send Builder events one after the other, stopping at the first failure.
    pub(crate) async fn dispatch(
        &self,
        operation: &'static str,
        events: &[BuilderEvent],
    ) -> TowerResult<()> {
        for event in events {
            let result = match serde_json::to_value(event) {
                Ok(payload) => self.invoker.invoke_async(Actor::Builder, payload).await,
                Err(e) => Err(InvokeError::from(e)),
            };
            match result {
                Ok(()) => {
                    tracing::info!(operation, event = event.operation(), "Invoked Builder");
                    crate::metrics::actor_dispatched("builder", event.operation(), "ok");
                }
                Err(e) => {
                    tracing::error!(
                        operation,
                        event = event.operation(),
                        error = %e,
                        "Builder invocation failed"
                    );
                    crate::metrics::actor_dispatched("builder", event.operation(), "error");
                    return Err(TowerError::invoke(operation)(e));
                }
            }
        }
        Ok(())
    }

    /// Synchronous invocation with logging and metrics; errors stay unwrapped.
    pub(crate) async fn call(
        &self,
        actor: Actor,
        operation: &'static str,
        payload: serde_json::Value,
    ) -> Result<ActorReply, InvokeError> {
        let result = self.invoker.invoke_sync(actor, payload).await;
        let outcome = match &result {
            Ok(reply) if reply.is_success() => "ok",
            Ok(_) => "failed",
            Err(e) => {
                tracing::error!(%actor, operation, error = %e, "Actor invocation failed");
                "error"
            }
        };
        crate::metrics::actor_dispatched(actor.as_str(), operation, outcome);
        result
    }
}

/// A fallback layer could not be read; the operation aborts before writing.
pub(crate) fn resolution_failure(operation: &'static str, source: StoreError) -> TowerError {
    tracing::error!(operation, error = %source, "Default lookup failed");
    TowerError::ResolutionFailure { operation, source }
}
