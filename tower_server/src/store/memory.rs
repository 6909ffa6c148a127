//! In-process store used when no database is configured, and by tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    EnvironmentStore, GeneralConfigStore, RepositoryStore, StoreError, StoreResult,
    TowerConfigStore,
};
use crate::models::environment::{Environment, EnvironmentStatusInfo, EnvironmentUpdate};
use crate::models::general_config::GeneralConfig;
use crate::models::repository::{Repository, RepositoryUpdate};
use crate::models::tower::TowerConfiguration;

type EnvironmentKey = (String, String);

#[derive(Default)]
pub struct MemoryStore {
    repositories: RwLock<BTreeMap<String, Repository>>,
    environments: RwLock<BTreeMap<EnvironmentKey, Environment>>,
    general_config: RwLock<BTreeMap<String, GeneralConfig>>,
    tower_config: RwLock<BTreeMap<String, TowerConfiguration>>,
    /// Number of mutating calls received, successful or not.
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    #[cfg(test)]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Insert or replace an environment without preconditions. Stands in for
    /// the Builder's out-of-band status updates.
    #[cfg(test)]
    pub async fn seed_environment(&self, environment: Environment) {
        let key = (environment.repository.clone(), environment.branch.clone());
        self.environments.write().await.insert(key, environment);
    }

    #[cfg(test)]
    pub async fn seed_repository(&self, repository: Repository) {
        self.repositories
            .write()
            .await
            .insert(repository.repository.clone(), repository);
    }
}

fn env_key(repository: &str, branch: &str) -> EnvironmentKey {
    (repository.to_string(), branch.to_string())
}

#[async_trait]
impl RepositoryStore for MemoryStore {
    async fn get_repository(&self, name: &str) -> StoreResult<Option<Repository>> {
        Ok(self.repositories.read().await.get(name).cloned())
    }

    async fn list_repositories(&self) -> StoreResult<Vec<Repository>> {
        Ok(self.repositories.read().await.values().cloned().collect())
    }

    async fn create_repository(&self, repository: &Repository) -> StoreResult<()> {
        self.record_write();
        let mut repositories = self.repositories.write().await;
        if repositories.contains_key(&repository.repository) {
            return Err(StoreError::ConditionFailed);
        }
        repositories.insert(repository.repository.clone(), repository.clone());
        Ok(())
    }

    async fn update_repository(
        &self,
        name: &str,
        update: &RepositoryUpdate,
    ) -> StoreResult<Repository> {
        self.record_write();
        let mut repositories = self.repositories.write().await;
        let existing = repositories
            .get_mut(name)
            .ok_or(StoreError::ConditionFailed)?;
        existing.apply(update);
        Ok(existing.clone())
    }

    async fn delete_repository(&self, name: &str) -> StoreResult<Repository> {
        self.record_write();
        self.repositories
            .write()
            .await
            .remove(name)
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl EnvironmentStore for MemoryStore {
    async fn get_environment(
        &self,
        repository: &str,
        branch: &str,
    ) -> StoreResult<Option<Environment>> {
        Ok(self
            .environments
            .read()
            .await
            .get(&env_key(repository, branch))
            .cloned())
    }

    async fn get_environment_status(
        &self,
        repository: &str,
        branch: &str,
    ) -> StoreResult<Option<EnvironmentStatusInfo>> {
        Ok(self
            .environments
            .read()
            .await
            .get(&env_key(repository, branch))
            .map(Environment::status_info))
    }

    async fn list_environments(&self, repository: &str) -> StoreResult<Vec<Environment>> {
        Ok(self
            .environments
            .read()
            .await
            .values()
            .filter(|env| env.repository == repository)
            .cloned()
            .collect())
    }

    async fn list_environment_statuses(&self) -> StoreResult<Vec<EnvironmentStatusInfo>> {
        Ok(self
            .environments
            .read()
            .await
            .values()
            .map(Environment::status_info)
            .collect())
    }

    async fn create_environment(&self, environment: &Environment) -> StoreResult<()> {
        self.record_write();
        let key = env_key(&environment.repository, &environment.branch);
        let mut environments = self.environments.write().await;
        if environments.contains_key(&key) {
            return Err(StoreError::ConditionFailed);
        }
        environments.insert(key, environment.clone());
        Ok(())
    }

    async fn update_environment(
        &self,
        repository: &str,
        branch: &str,
        update: &EnvironmentUpdate,
    ) -> StoreResult<Environment> {
        self.record_write();
        let mut environments = self.environments.write().await;
        let existing = environments
            .get_mut(&env_key(repository, branch))
            .ok_or(StoreError::ConditionFailed)?;
        existing.apply(update);
        Ok(existing.clone())
    }
}

#[async_trait]
impl GeneralConfigStore for MemoryStore {
    async fn get_general_config(&self, stage: &str) -> StoreResult<Option<GeneralConfig>> {
        Ok(self.general_config.read().await.get(stage).cloned())
    }

    async fn put_general_config(
        &self,
        stage: &str,
        config: &GeneralConfig,
    ) -> StoreResult<GeneralConfig> {
        self.record_write();
        self.general_config
            .write()
            .await
            .insert(stage.to_string(), config.clone());
        Ok(config.clone())
    }
}

#[async_trait]
impl TowerConfigStore for MemoryStore {
    async fn get_tower_config(&self, stage: &str) -> StoreResult<Option<TowerConfiguration>> {
        Ok(self.tower_config.read().await.get(stage).copied())
    }

    async fn put_tower_config(
        &self,
        stage: &str,
        config: &TowerConfiguration,
    ) -> StoreResult<TowerConfiguration> {
        self.record_write();
        self.tower_config
            .write()
            .await
            .insert(stage.to_string(), *config);
        Ok(*config)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{environment, repository};

    #[tokio::test]
    async fn create_repository_requires_absent_key() {
        let store = MemoryStore::new();
        let repo = repository("svc-a");

        store.create_repository(&repo).await.unwrap();
        let second = store.create_repository(&repo).await;

        assert!(matches!(second, Err(StoreError::ConditionFailed)));
    }

    #[tokio::test]
    async fn update_repository_requires_existing_key() {
        let store = MemoryStore::new();
        let result = store
            .update_repository("missing", &RepositoryUpdate::default())
            .await;
        assert!(matches!(result, Err(StoreError::ConditionFailed)));
    }

    #[tokio::test]
    async fn delete_repository_returns_old_item() {
        let store = MemoryStore::new();
        store.create_repository(&repository("svc-a")).await.unwrap();

        let deleted = store.delete_repository("svc-a").await.unwrap();
        assert_eq!(deleted.repository, "svc-a");
        assert!(matches!(
            store.delete_repository("svc-a").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn list_environments_is_partitioned_by_repository() {
        let store = MemoryStore::new();
        store.create_environment(&environment("svc-a", "feat-1")).await.unwrap();
        store.create_environment(&environment("svc-a", "feat-2")).await.unwrap();
        store.create_environment(&environment("svc-b", "feat-1")).await.unwrap();

        assert_eq!(store.list_environments("svc-a").await.unwrap().len(), 2);
        assert_eq!(store.list_environment_statuses().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn concurrent_environment_creates_have_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let env = environment("svc-a", "feat-1");

        let (a, b) = tokio::join!(
            store.create_environment(&env),
            store.create_environment(&env)
        );

        let failures = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Err(StoreError::ConditionFailed)))
            .count();
        assert_eq!(failures, 1);
        assert!(a.is_ok() || b.is_ok());
    }
}
