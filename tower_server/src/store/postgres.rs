//! Postgres-backed store (diesel-async over a deadpool pool).
//!
//! Conditional writes map onto single statements:
//! - create: `INSERT .. ON CONFLICT DO NOTHING`, zero rows means the key existed
//! - update: `UPDATE .. RETURNING`, no row means the key was absent
//! - delete: `DELETE .. RETURNING`, no row means the key was absent

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::pooled_connection::deadpool::{Object, Pool};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{
    EnvironmentStore, GeneralConfigStore, RepositoryStore, StoreError, StoreResult,
    TowerConfigStore,
};
use crate::models::environment::{Environment, EnvironmentStatusInfo, EnvironmentUpdate};
use crate::models::general_config::GeneralConfig;
use crate::models::repository::{Repository, RepositoryUpdate};
use crate::models::tower::TowerConfiguration;
use crate::schema::{environments, repositories, repositories_global_config, tower_configuration};

pub type PgPool = Pool<AsyncPgConnection>;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn connect(database_url: &str, max_connections: usize) -> anyhow::Result<Self> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(manager)
            .max_size(max_connections)
            .build()
            .map_err(|e| anyhow::anyhow!("diesel pool: {e}"))?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| anyhow::anyhow!("diesel pool: {e}"))?;
        crate::migration::run_migration(&mut conn).await
    }

    async fn conn(&self) -> StoreResult<Object<AsyncPgConnection>> {
        self.pool.get().await.map_err(backend)
    }
}

fn backend<E>(e: E) -> StoreError
where
    E: std::error::Error + Send + Sync + 'static,
{
    StoreError::Backend(anyhow::Error::new(e))
}

fn decode<T: DeserializeOwned>(value: Value) -> StoreResult<T> {
    Ok(serde_json::from_value(value)?)
}

// ── Rows ──

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = repositories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct RepositoryRow {
    repository: String,
    infrastructure_repo_url: String,
    webhook: bool,
    filters: Value,
    shutdown_schedules: Value,
    startup_schedules: Value,
    code_build_role_arn: String,
    environment_variables: Value,
}

#[derive(AsChangeset)]
#[diesel(table_name = repositories)]
struct RepositoryChanges {
    infrastructure_repo_url: String,
    webhook: bool,
    filters: Value,
    shutdown_schedules: Value,
    startup_schedules: Value,
    code_build_role_arn: String,
    environment_variables: Value,
}

impl TryFrom<&Repository> for RepositoryRow {
    type Error = StoreError;

    fn try_from(repo: &Repository) -> StoreResult<Self> {
        Ok(Self {
            repository: repo.repository.clone(),
            infrastructure_repo_url: repo.infrastructure_repo_url.clone(),
            webhook: repo.webhook,
            filters: serde_json::to_value(&repo.filters)?,
            shutdown_schedules: serde_json::to_value(&repo.shutdown_schedules)?,
            startup_schedules: serde_json::to_value(&repo.startup_schedules)?,
            code_build_role_arn: repo.code_build_role_arn.clone(),
            environment_variables: serde_json::to_value(&repo.environment_variables)?,
        })
    }
}

impl TryFrom<&RepositoryUpdate> for RepositoryChanges {
    type Error = StoreError;

    fn try_from(update: &RepositoryUpdate) -> StoreResult<Self> {
        Ok(Self {
            infrastructure_repo_url: update.infrastructure_repo_url.clone(),
            webhook: update.webhook,
            filters: serde_json::to_value(&update.filters)?,
            shutdown_schedules: serde_json::to_value(&update.shutdown_schedules)?,
            startup_schedules: serde_json::to_value(&update.startup_schedules)?,
            code_build_role_arn: update.code_build_role_arn.clone(),
            environment_variables: serde_json::to_value(&update.environment_variables)?,
        })
    }
}

impl TryFrom<RepositoryRow> for Repository {
    type Error = StoreError;

    fn try_from(row: RepositoryRow) -> StoreResult<Self> {
        Ok(Self {
            repository: row.repository,
            infrastructure_repo_url: row.infrastructure_repo_url,
            webhook: row.webhook,
            filters: decode(row.filters)?,
            shutdown_schedules: decode(row.shutdown_schedules)?,
            startup_schedules: decode(row.startup_schedules)?,
            code_build_role_arn: row.code_build_role_arn,
            environment_variables: decode(row.environment_variables)?,
        })
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = environments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct EnvironmentRow {
    repository: String,
    branch: String,
    status: String,
    creation_date: DateTime<Utc>,
    infrastructure_repo_url: String,
    shutdown_schedules: Value,
    startup_schedules: Value,
    code_build_role_arn: String,
    environment_variables: Value,
}

#[derive(AsChangeset)]
#[diesel(table_name = environments)]
struct EnvironmentChanges {
    infrastructure_repo_url: String,
    shutdown_schedules: Value,
    startup_schedules: Value,
    code_build_role_arn: String,
    environment_variables: Value,
}

impl TryFrom<&Environment> for EnvironmentRow {
    type Error = StoreError;

    fn try_from(env: &Environment) -> StoreResult<Self> {
        Ok(Self {
            repository: env.repository.clone(),
            branch: env.branch.clone(),
            status: env.status.as_str().to_string(),
            creation_date: env.creation_date,
            infrastructure_repo_url: env.infrastructure_repo_url.clone(),
            shutdown_schedules: serde_json::to_value(&env.shutdown_schedules)?,
            startup_schedules: serde_json::to_value(&env.startup_schedules)?,
            code_build_role_arn: env.code_build_role_arn.clone(),
            environment_variables: serde_json::to_value(&env.environment_variables)?,
        })
    }
}

impl TryFrom<&EnvironmentUpdate> for EnvironmentChanges {
    type Error = StoreError;

    fn try_from(update: &EnvironmentUpdate) -> StoreResult<Self> {
        Ok(Self {
            infrastructure_repo_url: update.infrastructure_repo_url.clone(),
            shutdown_schedules: serde_json::to_value(&update.shutdown_schedules)?,
            startup_schedules: serde_json::to_value(&update.startup_schedules)?,
            code_build_role_arn: update.code_build_role_arn.clone(),
            environment_variables: serde_json::to_value(&update.environment_variables)?,
        })
    }
}

impl TryFrom<EnvironmentRow> for Environment {
    type Error = StoreError;

    fn try_from(row: EnvironmentRow) -> StoreResult<Self> {
        Ok(Self {
            status: row
                .status
                .parse()
                .map_err(|e| StoreError::Decode(format!("{e}")))?,
            repository: row.repository,
            branch: row.branch,
            creation_date: row.creation_date,
            infrastructure_repo_url: row.infrastructure_repo_url,
            shutdown_schedules: decode(row.shutdown_schedules)?,
            startup_schedules: decode(row.startup_schedules)?,
            code_build_role_arn: row.code_build_role_arn,
            environment_variables: decode(row.environment_variables)?,
        })
    }
}

fn status_info(repository: String, branch: String, status: String) -> StoreResult<EnvironmentStatusInfo> {
    Ok(EnvironmentStatusInfo {
        status: status
            .parse()
            .map_err(|e| StoreError::Decode(format!("{e}")))?,
        repository,
        branch,
    })
}

#[derive(Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = repositories_global_config)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct GeneralConfigRow {
    stage: String,
    shutdown_schedules: Value,
    startup_schedules: Value,
    environment_variables: Value,
    code_build_role_arn: String,
}

impl GeneralConfigRow {
    fn encode(stage: &str, config: &GeneralConfig) -> StoreResult<Self> {
        Ok(Self {
            stage: stage.to_string(),
            shutdown_schedules: serde_json::to_value(&config.shutdown_schedules)?,
            startup_schedules: serde_json::to_value(&config.startup_schedules)?,
            environment_variables: serde_json::to_value(&config.environment_variables)?,
            code_build_role_arn: config.code_build_role_arn.clone(),
        })
    }
}

impl TryFrom<GeneralConfigRow> for GeneralConfig {
    type Error = StoreError;

    fn try_from(row: GeneralConfigRow) -> StoreResult<Self> {
        Ok(Self {
            shutdown_schedules: decode(row.shutdown_schedules)?,
            startup_schedules: decode(row.startup_schedules)?,
            environment_variables: decode(row.environment_variables)?,
            code_build_role_arn: row.code_build_role_arn,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = tower_configuration)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct TowerConfigRow {
    tower_stage: String,
    log_level: i16,
}

impl From<TowerConfigRow> for TowerConfiguration {
    fn from(row: TowerConfigRow) -> Self {
        Self {
            log_level: u8::try_from(row.log_level.max(0)).unwrap_or(u8::MAX),
        }
    }
}

// ── Repositories ──

#[async_trait]
impl RepositoryStore for PgStore {
    async fn get_repository(&self, name: &str) -> StoreResult<Option<Repository>> {
        let mut conn = self.conn().await?;
        let row = repositories::table
            .find(name)
            .select(RepositoryRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(backend)?;
        row.map(Repository::try_from).transpose()
    }

    async fn list_repositories(&self) -> StoreResult<Vec<Repository>> {
        let mut conn = self.conn().await?;
        let rows = repositories::table
            .select(RepositoryRow::as_select())
            .order(repositories::repository.asc())
            .load(&mut conn)
            .await
            .map_err(backend)?;
        rows.into_iter().map(Repository::try_from).collect()
    }

    async fn create_repository(&self, repository: &Repository) -> StoreResult<()> {
        let row = RepositoryRow::try_from(repository)?;
        let mut conn = self.conn().await?;
        let inserted = diesel::insert_into(repositories::table)
            .values(&row)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map_err(backend)?;
        if inserted == 0 {
            return Err(StoreError::ConditionFailed);
        }
        Ok(())
    }

    async fn update_repository(
        &self,
        name: &str,
        update: &RepositoryUpdate,
    ) -> StoreResult<Repository> {
        let changes = RepositoryChanges::try_from(update)?;
        let mut conn = self.conn().await?;
        let row = diesel::update(repositories::table.find(name))
            .set(&changes)
            .returning(RepositoryRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(backend)?
            .ok_or(StoreError::ConditionFailed)?;
        Repository::try_from(row)
    }

    async fn delete_repository(&self, name: &str) -> StoreResult<Repository> {
        let mut conn = self.conn().await?;
        let row = diesel::delete(repositories::table.find(name))
            .returning(RepositoryRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(backend)?
            .ok_or(StoreError::NotFound)?;
        Repository::try_from(row)
    }
}

// ── Environments ──

#[async_trait]
impl EnvironmentStore for PgStore {
    async fn get_environment(
        &self,
        repository: &str,
        branch: &str,
    ) -> StoreResult<Option<Environment>> {
        let mut conn = self.conn().await?;
        let row = environments::table
            .find((repository, branch))
            .select(EnvironmentRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(backend)?;
        row.map(Environment::try_from).transpose()
    }

    async fn get_environment_status(
        &self,
        repository: &str,
        branch: &str,
    ) -> StoreResult<Option<EnvironmentStatusInfo>> {
        let mut conn = self.conn().await?;
        let row = environments::table
            .find((repository, branch))
            .select((
                environments::repository,
                environments::branch,
                environments::status,
            ))
            .first::<(String, String, String)>(&mut conn)
            .await
            .optional()
            .map_err(backend)?;
        row.map(|(repository, branch, status)| status_info(repository, branch, status))
            .transpose()
    }

    async fn list_environments(&self, repository: &str) -> StoreResult<Vec<Environment>> {
        let mut conn = self.conn().await?;
        let rows = environments::table
            .filter(environments::repository.eq(repository))
            .select(EnvironmentRow::as_select())
            .order(environments::branch.asc())
            .load(&mut conn)
            .await
            .map_err(backend)?;
        rows.into_iter().map(Environment::try_from).collect()
    }

    async fn list_environment_statuses(&self) -> StoreResult<Vec<EnvironmentStatusInfo>> {
        let mut conn = self.conn().await?;
        let rows = environments::table
            .select((
                environments::repository,
                environments::branch,
                environments::status,
            ))
            .order((environments::repository.asc(), environments::branch.asc()))
            .load::<(String, String, String)>(&mut conn)
            .await
            .map_err(backend)?;
        rows.into_iter()
            .map(|(repository, branch, status)| status_info(repository, branch, status))
            .collect()
    }

    async fn create_environment(&self, environment: &Environment) -> StoreResult<()> {
        let row = EnvironmentRow::try_from(environment)?;
        let mut conn = self.conn().await?;
        let inserted = diesel::insert_into(environments::table)
            .values(&row)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map_err(backend)?;
        if inserted == 0 {
            return Err(StoreError::ConditionFailed);
        }
        Ok(())
    }

    async fn update_environment(
        &self,
        repository: &str,
        branch: &str,
        update: &EnvironmentUpdate,
    ) -> StoreResult<Environment> {
        let changes = EnvironmentChanges::try_from(update)?;
        let mut conn = self.conn().await?;
        let row = diesel::update(environments::table.find((repository, branch)))
            .set(&changes)
            .returning(EnvironmentRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(backend)?
            .ok_or(StoreError::ConditionFailed)?;
        Environment::try_from(row)
    }
}

// ── Global config ──

#[async_trait]
impl GeneralConfigStore for PgStore {
    async fn get_general_config(&self, stage: &str) -> StoreResult<Option<GeneralConfig>> {
        let mut conn = self.conn().await?;
        let row = repositories_global_config::table
            .find(stage)
            .select(GeneralConfigRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(backend)?;
        row.map(GeneralConfig::try_from).transpose()
    }

    async fn put_general_config(
        &self,
        stage: &str,
        config: &GeneralConfig,
    ) -> StoreResult<GeneralConfig> {
        let row = GeneralConfigRow::encode(stage, config)?;
        let mut conn = self.conn().await?;
        let stored = diesel::insert_into(repositories_global_config::table)
            .values(&row)
            .on_conflict(repositories_global_config::stage)
            .do_update()
            .set(&row)
            .returning(GeneralConfigRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(backend)?;
        GeneralConfig::try_from(stored)
    }
}

// ── Tower configuration ──

#[async_trait]
impl TowerConfigStore for PgStore {
    async fn get_tower_config(&self, stage: &str) -> StoreResult<Option<TowerConfiguration>> {
        let mut conn = self.conn().await?;
        let row = tower_configuration::table
            .find(stage)
            .select(TowerConfigRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(backend)?;
        Ok(row.map(TowerConfiguration::from))
    }

    async fn put_tower_config(
        &self,
        stage: &str,
        config: &TowerConfiguration,
    ) -> StoreResult<TowerConfiguration> {
        let row = TowerConfigRow {
            tower_stage: stage.to_string(),
            log_level: i16::from(config.log_level),
        };
        let mut conn = self.conn().await?;
        let stored = diesel::insert_into(tower_configuration::table)
            .values(&row)
            .on_conflict(tower_configuration::tower_stage)
            .do_update()
            .set(&row)
            .returning(TowerConfigRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(backend)?;
        Ok(stored.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::{TimeSchedule, VariableValue};
    use crate::models::status::EnvironmentStatus;
    use crate::testing::{environment, repository};

    #[test]
    fn repository_row_round_trips_json_columns() {
        let mut repo = repository("svc-a");
        repo.filters = vec!["^feat/".to_string()];
        repo.shutdown_schedules = vec![TimeSchedule::new("0 18 * * 1-5")];
        repo.environment_variables
            .insert("MODE".to_string(), VariableValue::plaintext("staging"));

        let row = RepositoryRow::try_from(&repo).unwrap();
        assert_eq!(row.filters, serde_json::json!(["^feat/"]));

        assert_eq!(Repository::try_from(row).unwrap(), repo);
    }

    #[test]
    fn environment_row_rejects_unknown_status() {
        let mut row = EnvironmentRow::try_from(&environment("svc-a", "feat-1")).unwrap();
        assert_eq!(row.status, EnvironmentStatus::Pending.as_str());

        row.status = "exploded".to_string();
        assert!(matches!(
            Environment::try_from(row),
            Err(StoreError::Decode(_))
        ));
    }

    #[test]
    fn negative_log_level_clamps_to_error() {
        let config = TowerConfiguration::from(TowerConfigRow {
            tower_stage: "prod".to_string(),
            log_level: -3,
        });
        assert_eq!(config.log_level, 0);
    }
}
