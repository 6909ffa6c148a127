//! Repository registration, update and removal.

use super::lifecycle::{resolution_failure, Lifecycle};
use super::resolver::{resolve, ConfigLayer};
use crate::error::{TowerError, TowerResult};
use crate::models::repository::{NewRepository, Repository, RepositoryUpdate};
use crate::store::StoreError;

impl Lifecycle {
    pub async fn list_repositories(&self) -> TowerResult<Vec<Repository>> {
        self.stores
            .repositories
            .list_repositories()
            .await
            .map_err(TowerError::store("list repositories"))
    }

    pub async fn get_repository(&self, name: &str) -> TowerResult<Repository> {
        self.stores
            .repositories
            .get_repository(name)
            .await
            .map_err(TowerError::store("get repository"))?
            .ok_or(TowerError::NotFound)
    }

    /// Register a repository. Unset schedules, variables and build role are
    /// taken from the stage defaults.
    pub async fn add_repository(&self, post: NewRepository) -> TowerResult<Repository> {
        const OP: &str = "add repository";

        let mut layer = ConfigLayer::from(&post);
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

        let repository = Repository {
            repository: post.repository,
            infrastructure_repo_url: resolved.infrastructure_repo_url,
            webhook: post.webhook,
            filters: post.filters,
            shutdown_schedules: resolved.shutdown_schedules,
            startup_schedules: resolved.startup_schedules,
            code_build_role_arn: resolved.code_build_role_arn,
            environment_variables: resolved.environment_variables,
        };

        self.stores
            .repositories
            .create_repository(&repository)
            .await
            .map_err(|e| match e {
                StoreError::ConditionFailed => TowerError::UniqueConstraintViolation,
                e => {
                    tracing::error!(repository = %repository.repository, error = %e, "Repository insert failed");
                    TowerError::store(OP)(e)
                }
            })?;
        tracing::info!(repository = %repository.repository, "Added repository");

        Ok(repository)
    }

    pub async fn update_repository(
        &self,
        name: &str,
        put: RepositoryUpdate,
    ) -> TowerResult<Repository> {
        let repository = self
            .stores
            .repositories
            .update_repository(name, &put)
            .await
            .map_err(|e| match e {
                StoreError::ConditionFailed => TowerError::NotFound,
                e => {
                    tracing::error!(repository = name, error = %e, "Repository update failed");
                    TowerError::store("update repository")(e)
                }
            })?;
        tracing::info!(repository = name, "Updated repository");
        Ok(repository)
    }

    /// Remove a repository that no longer has environments.
    pub async fn delete_repository(&self, name: &str) -> TowerResult<Repository> {
        const OP: &str = "delete repository";

        let environments = self
            .stores
            .environments
            .list_environments(name)
            .await
            .map_err(TowerError::store(OP))?;
        if !environments.is_empty() {
            tracing::warn!(
                repository = name,
                environments = environments.len(),
                "Refusing to delete repository with environments"
            );
            return Err(TowerError::HasDependents);
        }

        let repository = self
            .stores
            .repositories
            .delete_repository(name)
            .await
            .map_err(TowerError::store(OP))?;
        tracing::info!(repository = name, "Deleted repository");
        Ok(repository)
    }
}
