//! Environment reads and the create / update / delete lifecycle.

use chrono::Utc;

use super::gate::{self, GatedOperation};
use super::lifecycle::{resolution_failure, Lifecycle};
use super::resolver::{resolve, ConfigLayer};
use super::validation::{is_valid_role_arn, INVALID_ROLE_ARN};
use crate::error::{TowerError, TowerResult};
use crate::events::builder::BuilderEvent;
use crate::models::environment::{
    Environment, EnvironmentStatusInfo, EnvironmentUpdate, NewEnvironment,
};
use crate::models::status::EnvironmentStatus;
use crate::store::StoreError;

impl Lifecycle {
    pub async fn list_environments(&self, repository: &str) -> TowerResult<Vec<Environment>> {
        self.stores
            .environments
            .list_environments(repository)
            .await
            .map_err(TowerError::store("list environments"))
    }

    pub async fn get_environment(&self, repository: &str, branch: &str) -> TowerResult<Environment> {
        self.stores
            .environments
            .get_environment(repository, branch)
            .await
            .map_err(TowerError::store("get environment"))?
            .ok_or(TowerError::NotFound)
    }

    pub async fn list_environment_statuses(&self) -> TowerResult<Vec<EnvironmentStatusInfo>> {
        self.stores
            .environments
            .list_environment_statuses()
            .await
            .map_err(TowerError::store("list environment status"))
    }

    pub async fn get_environment_status(
        &self,
        repository: &str,
        branch: &str,
    ) -> TowerResult<EnvironmentStatusInfo> {
        self.environment_status("get environment status", repository, branch)
            .await
    }

    /// Create a `pending` environment with unset fields taken from the
    /// repository, then from the stage defaults, and hand it to the Builder.
    pub async fn add_environment(
        &self,
        repository: &str,
        post: NewEnvironment,
    ) -> TowerResult<Environment> {
        const OP: &str = "add environment";

        let mut layer = ConfigLayer::from(&post);
        if !layer.is_complete() {
            let parent = self
                .stores
                .repositories
                .get_repository(repository)
                .await
                .map_err(|source| resolution_failure(OP, source))?
                .ok_or(TowerError::NotFound)?;
            layer = resolve(layer, &ConfigLayer::from(&parent), "repository").0;
        }
        if !layer.is_complete() {
            let defaults = self
                .stores
                .general_config
                .get_general_config(&self.stage)
                .await
                .map_err(|source| resolution_failure(OP, source))?;
            if let Some(defaults) = defaults {
                layer = resolve(layer, &ConfigLayer::from(&defaults), "general config").0;
            }
        }
        let resolved = layer.into_resolved();

        let environment = Environment {
            repository: repository.to_string(),
            branch: post.branch,
            status: EnvironmentStatus::Pending,
            creation_date: Utc::now(),
            infrastructure_repo_url: resolved.infrastructure_repo_url,
            shutdown_schedules: resolved.shutdown_schedules,
            startup_schedules: resolved.startup_schedules,
            code_build_role_arn: resolved.code_build_role_arn,
            environment_variables: resolved.environment_variables,
        };

        match self.stores.environments.create_environment(&environment).await {
            Ok(()) => {}
            Err(StoreError::ConditionFailed) => return Err(TowerError::UniqueConstraintViolation),
            Err(e) => {
                tracing::error!(
                    repository,
                    branch = %environment.branch,
                    error = %e,
                    "Environment insert failed"
                );
                return Err(TowerError::store(OP)(e));
            }
        }
        tracing::info!(repository, branch = %environment.branch, "Added environment");

        self.dispatch(
            OP,
            &[
                BuilderEvent::update_schedule(&environment),
                BuilderEvent::create(&environment),
            ],
        )
        .await?;

        Ok(environment)
    }

    /// Overwrite an environment's configuration and push it to the Builder.
    ///
    /// The status is checked before the payload's build role.
    pub async fn update_environment(
        &self,
        repository: &str,
        branch: &str,
        put: EnvironmentUpdate,
    ) -> TowerResult<Environment> {
        const OP: &str = "update environment";

        let info = self.environment_status(OP, repository, branch).await?;
        gate::check(GatedOperation::Update, info.status, repository, branch)?;
        if !is_valid_role_arn(&put.code_build_role_arn) {
            tracing::info!(repository, branch, "Rejecting invalid build role");
            return Err(TowerError::InvalidRequest(INVALID_ROLE_ARN.to_string()));
        }

        let environment = self
            .stores
            .environments
            .update_environment(repository, branch, &put)
            .await
            .map_err(|e| match e {
                StoreError::ConditionFailed => TowerError::NotFound,
                e => {
                    tracing::error!(repository, branch, error = %e, "Environment update failed");
                    TowerError::store(OP)(e)
                }
            })?;
        tracing::info!(repository, branch, "Updated environment");

        self.dispatch(
            OP,
            &[
                BuilderEvent::update_schedule(&environment),
                BuilderEvent::update(&environment),
            ],
        )
        .await?;

        Ok(environment)
    }

    /// Ask the Builder to tear the environment down. The record itself is
    /// removed by the Builder once teardown completes.
    pub async fn delete_environment(&self, repository: &str, branch: &str) -> TowerResult<()> {
        const OP: &str = "delete environment";

        let info = self.environment_status(OP, repository, branch).await?;
        gate::check(GatedOperation::Delete, info.status, repository, branch)?;

        self.dispatch(
            OP,
            &[
                BuilderEvent::delete_schedule(repository, branch),
                BuilderEvent::delete(repository, branch),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::general_config::GeneralConfig;
    use crate::models::settings::{TimeSchedule, VariableValue};
    use crate::store::GeneralConfigStore;
    use crate::testing::{
        environment_with_status, repository, role_arn, Harness, UnavailableStore, STAGE,
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn add_environment_inherits_repository_defaults() {
        let h = Harness::new();
        let mut repo = repository("svc-a");
        repo.code_build_role_arn = "role-x".to_string();
        repo.shutdown_schedules = vec![TimeSchedule::new("0 18 * * 1-5")];
        h.store.seed_repository(repo).await;

        let env = h
            .lifecycle
            .add_environment("svc-a", NewEnvironment::for_branch("feat-1"))
            .await
            .unwrap();

        assert_eq!(env.code_build_role_arn, "role-x");
        assert_eq!(env.status, EnvironmentStatus::Pending);
        assert_eq!(env.shutdown_schedules, vec![TimeSchedule::new("0 18 * * 1-5")]);
        assert_eq!(
            h.invoker.builder_operations(),
            vec!["UPDATE_SCHEDULE", "CREATE"]
        );
        assert_eq!(
            h.lifecycle.get_environment("svc-a", "feat-1").await.unwrap(),
            env
        );
    }

    #[tokio::test]
    async fn payload_fields_win_over_defaults() {
        let h = Harness::new();
        h.store.seed_repository(repository("svc-a")).await;

        let mut vars = crate::models::settings::EnvironmentVariables::new();
        vars.insert("MODE".to_string(), VariableValue::plaintext("debug"));
        let post = NewEnvironment {
            code_build_role_arn: Some(role_arn("custom")),
            environment_variables: Some(vars.clone()),
            ..NewEnvironment::for_branch("feat-1")
        };

        let env = h.lifecycle.add_environment("svc-a", post).await.unwrap();

        assert_eq!(env.code_build_role_arn, role_arn("custom"));
        assert_eq!(env.environment_variables, vars);
        assert_eq!(env.infrastructure_repo_url, "https://git.example.com/svc-a-infra.git");
    }

    #[tokio::test]
    async fn repository_gaps_fall_through_to_stage_defaults() {
        let h = Harness::new();
        let mut repo = repository("svc-a");
        repo.code_build_role_arn = String::new();
        h.store.seed_repository(repo).await;
        h.store
            .put_general_config(
                STAGE,
                &GeneralConfig {
                    code_build_role_arn: role_arn("stage-default"),
                    ..GeneralConfig::default()
                },
            )
            .await
            .unwrap();

        let env = h
            .lifecycle
            .add_environment("svc-a", NewEnvironment::for_branch("feat-1"))
            .await
            .unwrap();

        assert_eq!(env.code_build_role_arn, role_arn("stage-default"));
    }

    #[tokio::test]
    async fn unreadable_repository_aborts_before_any_write() {
        let h = Harness::with_stores(|s| s.repositories = Arc::new(UnavailableStore));

        let result = h
            .lifecycle
            .add_environment("svc-a", NewEnvironment::for_branch("feat-1"))
            .await;

        assert!(matches!(result, Err(TowerError::ResolutionFailure { .. })));
        assert_eq!(h.store.write_count(), 0);
        assert_eq!(h.invoker.call_count(), 0);
    }

    #[tokio::test]
    async fn unreadable_stage_defaults_abort_before_any_write() {
        let h = Harness::with_stores(|s| s.general_config = Arc::new(UnavailableStore));
        let mut repo = repository("svc-a");
        repo.code_build_role_arn = String::new();
        h.store.seed_repository(repo).await;

        let result = h
            .lifecycle
            .add_environment("svc-a", NewEnvironment::for_branch("feat-1"))
            .await;

        assert!(matches!(result, Err(TowerError::ResolutionFailure { .. })));
        assert_eq!(h.store.write_count(), 0);
        assert_eq!(h.invoker.call_count(), 0);
        assert!(matches!(
            h.lifecycle.get_environment("svc-a", "feat-1").await,
            Err(TowerError::NotFound)
        ));
    }

    #[tokio::test]
    async fn update_with_invalid_role_is_rejected_without_write() {
        let h = Harness::new();
        h.store
            .seed_environment(environment_with_status(
                "svc-a",
                "feat-1",
                EnvironmentStatus::Running,
            ))
            .await;
        let put = EnvironmentUpdate {
            code_build_role_arn: "role-x".to_string(),
            ..EnvironmentUpdate::default()
        };

        let result = h.lifecycle.update_environment("svc-a", "feat-1", put).await;

        assert!(matches!(result, Err(TowerError::InvalidRequest(ref m)) if m == INVALID_ROLE_ARN));
        assert_eq!(h.store.write_count(), 0);
        assert_eq!(h.invoker.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_parent_repository_is_not_found() {
        let h = Harness::new();
        let result = h
            .lifecycle
            .add_environment("ghost", NewEnvironment::for_branch("feat-1"))
            .await;

        assert!(matches!(result, Err(TowerError::NotFound)));
        assert_eq!(h.store.write_count(), 0);
        assert_eq!(h.invoker.call_count(), 0);
    }

    #[tokio::test]
    async fn duplicate_environment_is_a_unique_violation_without_dispatch() {
        let h = Harness::new();
        h.store.seed_repository(repository("svc-a")).await;
        h.lifecycle
            .add_environment("svc-a", NewEnvironment::for_branch("feat-1"))
            .await
            .unwrap();

        let second = h
            .lifecycle
            .add_environment("svc-a", NewEnvironment::for_branch("feat-1"))
            .await;

        assert!(matches!(second, Err(TowerError::UniqueConstraintViolation)));
        assert_eq!(h.invoker.call_count(), 2);
    }

    #[tokio::test]
    async fn concurrent_creates_yield_one_winner() {
        let h = Harness::new();
        h.store.seed_repository(repository("svc-a")).await;

        let (a, b) = tokio::join!(
            h.lifecycle
                .add_environment("svc-a", NewEnvironment::for_branch("feat-1")),
            h.lifecycle
                .add_environment("svc-a", NewEnvironment::for_branch("feat-1")),
        );

        let violations = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Err(TowerError::UniqueConstraintViolation)))
            .count();
        assert_eq!(violations, 1);
        assert!(a.is_ok() || b.is_ok());
    }

    #[tokio::test]
    async fn dispatch_failure_keeps_the_stored_record() {
        let h = Harness::new();
        h.store.seed_repository(repository("svc-a")).await;
        h.invoker.fail_async();

        let result = h
            .lifecycle
            .add_environment("svc-a", NewEnvironment::for_branch("feat-1"))
            .await;

        assert!(matches!(result, Err(TowerError::ServiceUnavailable { .. })));
        assert!(h.lifecycle.get_environment("svc-a", "feat-1").await.is_ok());
        assert_eq!(h.invoker.builder_operations(), vec!["UPDATE_SCHEDULE"]);
    }

    #[tokio::test]
    async fn update_running_environment_returns_new_snapshot() {
        let h = Harness::new();
        h.store
            .seed_environment(environment_with_status(
                "svc-a",
                "feat-1",
                EnvironmentStatus::Running,
            ))
            .await;
        let put = EnvironmentUpdate {
            infrastructure_repo_url: "https://git.example.com/other.git".to_string(),
            code_build_role_arn: role_arn("updated"),
            startup_schedules: vec![TimeSchedule::new("0 7 * * 1-5")],
            ..EnvironmentUpdate::default()
        };

        let env = h
            .lifecycle
            .update_environment("svc-a", "feat-1", put)
            .await
            .unwrap();

        assert_eq!(env.code_build_role_arn, role_arn("updated"));
        assert_eq!(env.status, EnvironmentStatus::Running);
        assert_eq!(
            h.invoker.builder_operations(),
            vec!["UPDATE_SCHEDULE", "UPDATE"]
        );
        let calls = h.invoker.calls();
        let (_, update_event) = &calls[1];
        assert_eq!(update_event["infrastructureRepoUrl"], "https://git.example.com/other.git");
    }

    #[tokio::test]
    async fn update_is_refused_outside_running_or_updating_failed() {
        for status in [EnvironmentStatus::Pending, EnvironmentStatus::Stopped] {
            let h = Harness::new();
            h.store
                .seed_environment(environment_with_status("svc-a", "feat-1", status))
                .await;

            let result = h
                .lifecycle
                .update_environment("svc-a", "feat-1", EnvironmentUpdate::default())
                .await;

            assert!(
                matches!(result, Err(TowerError::InvalidStatus { .. })),
                "{status}"
            );
            assert_eq!(h.store.write_count(), 0);
            assert_eq!(h.invoker.call_count(), 0);
        }
    }

    #[tokio::test]
    async fn update_of_unknown_environment_is_not_found() {
        let h = Harness::new();
        let result = h
            .lifecycle
            .update_environment("svc-a", "nope", EnvironmentUpdate::default())
            .await;
        assert!(matches!(result, Err(TowerError::NotFound)));
    }

    #[tokio::test]
    async fn delete_emits_teardown_events_and_keeps_record() {
        let h = Harness::new();
        h.store
            .seed_environment(environment_with_status(
                "svc-a",
                "feat-1",
                EnvironmentStatus::Stopped,
            ))
            .await;

        h.lifecycle
            .delete_environment("svc-a", "feat-1")
            .await
            .unwrap();

        assert_eq!(
            h.invoker.builder_operations(),
            vec!["DELETE_SCHEDULE", "DELETE"]
        );
        assert!(h.lifecycle.get_environment("svc-a", "feat-1").await.is_ok());
        assert_eq!(h.store.write_count(), 0);
    }

    #[tokio::test]
    async fn delete_is_refused_while_pending() {
        let h = Harness::new();
        h.store
            .seed_environment(environment_with_status(
                "svc-a",
                "feat-1",
                EnvironmentStatus::Pending,
            ))
            .await;

        let result = h.lifecycle.delete_environment("svc-a", "feat-1").await;

        assert!(matches!(result, Err(TowerError::InvalidStatus { .. })));
        assert_eq!(h.invoker.call_count(), 0);
    }
}
