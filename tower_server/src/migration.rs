//! Idempotent schema setup for the Postgres store.

use diesel_async::{AsyncPgConnection, SimpleAsyncConnection};

/// Creates the four tower tables if they do not exist yet.
pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS repositories (
    repository              VARCHAR(255) PRIMARY KEY,
    infrastructure_repo_url VARCHAR(1024) NOT NULL DEFAULT '',
    webhook                 BOOLEAN NOT NULL DEFAULT FALSE,
    filters                 JSONB NOT NULL DEFAULT '[]',
    shutdown_schedules      JSONB NOT NULL DEFAULT '[]',
    startup_schedules       JSONB NOT NULL DEFAULT '[]',
    code_build_role_arn     VARCHAR(2048) NOT NULL DEFAULT '',
    environment_variables   JSONB NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS environments (
    repository              VARCHAR(255) NOT NULL,
    branch                  VARCHAR(255) NOT NULL,
    status                  VARCHAR(32) NOT NULL DEFAULT 'pending',
    creation_date           TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    infrastructure_repo_url VARCHAR(1024) NOT NULL DEFAULT '',
    shutdown_schedules      JSONB NOT NULL DEFAULT '[]',
    startup_schedules       JSONB NOT NULL DEFAULT '[]',
    code_build_role_arn     VARCHAR(2048) NOT NULL DEFAULT '',
    environment_variables   JSONB NOT NULL DEFAULT '{}',
    PRIMARY KEY (repository, branch)
);

CREATE INDEX IF NOT EXISTS idx_environments_status ON environments (status);

CREATE TABLE IF NOT EXISTS repositories_global_config (
    stage                   VARCHAR(64) PRIMARY KEY,
    shutdown_schedules      JSONB NOT NULL DEFAULT '[]',
    startup_schedules       JSONB NOT NULL DEFAULT '[]',
    environment_variables   JSONB NOT NULL DEFAULT '{}',
    code_build_role_arn     VARCHAR(2048) NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS tower_configuration (
    tower_stage             VARCHAR(64) PRIMARY KEY,
    log_level               SMALLINT NOT NULL DEFAULT 2
);
"#;

/// Run the tower migration against an open connection.
pub async fn run_migration(conn: &mut AsyncPgConnection) -> anyhow::Result<()> {
    conn.batch_execute(MIGRATION_SQL).await?;
    Ok(())
}
