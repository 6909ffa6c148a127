//! Keyed item stores with existence-conditioned writes.
//!
//! Every create is conditioned on the key being absent and every update or
//! delete on the key being present, so concurrent writers for the same key
//! race safely: exactly one wins, the others see `ConditionFailed` or
//! `NotFound`. Nothing here compares the status field before writing.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::environment::{Environment, EnvironmentStatusInfo, EnvironmentUpdate};
use crate::models::general_config::GeneralConfig;
use crate::models::repository::{Repository, RepositoryUpdate};
use crate::models::tower::TowerConfiguration;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key was absent when a delete required it.
    #[error("item not found")]
    NotFound,

    /// An existence precondition on a put or update did not hold.
    #[error("conditional check failed")]
    ConditionFailed,

    #[error("stored item could not be decoded: {0}")]
    Decode(String),

    #[error("store backend error: {0}")]
    Backend(#[source] anyhow::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Decode(e.to_string())
    }
}

#[async_trait]
pub trait RepositoryStore: Send + Sync {
    async fn get_repository(&self, name: &str) -> StoreResult<Option<Repository>>;

    async fn list_repositories(&self) -> StoreResult<Vec<Repository>>;

    /// Fails with `ConditionFailed` if the name is already registered.
    async fn create_repository(&self, repository: &Repository) -> StoreResult<()>;

    /// Overwrites every mutable field. Fails with `ConditionFailed` if the
    /// repository does not exist.
    async fn update_repository(
        &self,
        name: &str,
        update: &RepositoryUpdate,
    ) -> StoreResult<Repository>;

    /// Returns the deleted record, or `NotFound`.
    async fn delete_repository(&self, name: &str) -> StoreResult<Repository>;
}

#[async_trait]
pub trait EnvironmentStore: Send + Sync {
    async fn get_environment(
        &self,
        repository: &str,
        branch: &str,
    ) -> StoreResult<Option<Environment>>;

    async fn get_environment_status(
        &self,
        repository: &str,
        branch: &str,
    ) -> StoreResult<Option<EnvironmentStatusInfo>>;

    /// All environments of one repository (partition query).
    async fn list_environments(&self, repository: &str) -> StoreResult<Vec<Environment>>;

    async fn list_environment_statuses(&self) -> StoreResult<Vec<EnvironmentStatusInfo>>;

    /// Fails with `ConditionFailed` if (repository, branch) already exists.
    async fn create_environment(&self, environment: &Environment) -> StoreResult<()>;

    /// Overwrites the configuration fields and returns the new snapshot.
    /// Fails with `ConditionFailed` if the environment does not exist.
    async fn update_environment(
        &self,
        repository: &str,
        branch: &str,
        update: &EnvironmentUpdate,
    ) -> StoreResult<Environment>;
}

#[async_trait]
pub trait GeneralConfigStore: Send + Sync {
    async fn get_general_config(&self, stage: &str) -> StoreResult<Option<GeneralConfig>>;

    /// Upsert; returns the stored record.
    async fn put_general_config(
        &self,
        stage: &str,
        config: &GeneralConfig,
    ) -> StoreResult<GeneralConfig>;
}

#[async_trait]
pub trait TowerConfigStore: Send + Sync {
    async fn get_tower_config(&self, stage: &str) -> StoreResult<Option<TowerConfiguration>>;

    async fn put_tower_config(
        &self,
        stage: &str,
        config: &TowerConfiguration,
    ) -> StoreResult<TowerConfiguration>;
}

/// The four collections, usually backed by one implementation.
#[derive(Clone)]
pub struct Stores {
    pub repositories: Arc<dyn RepositoryStore>,
    pub environments: Arc<dyn EnvironmentStore>,
    pub general_config: Arc<dyn GeneralConfigStore>,
    pub tower_config: Arc<dyn TowerConfigStore>,
}

impl Stores {
    pub fn memory() -> Self {
        Self::from_backend(Arc::new(memory::MemoryStore::new()))
    }

    pub fn postgres(store: postgres::PgStore) -> Self {
        Self::from_backend(Arc::new(store))
    }

    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: RepositoryStore + EnvironmentStore + GeneralConfigStore + TowerConfigStore + 'static,
    {
        Self {
            repositories: backend.clone(),
            environments: backend.clone(),
            general_config: backend.clone(),
            tower_config: backend,
        }
    }
}
