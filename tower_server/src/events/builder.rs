//! Builder event definitions, one variant per operation.

use serde::{Deserialize, Serialize};

use crate::models::environment::Environment;
use crate::models::settings::{EnvironmentVariables, TimeSchedule};

/// Events sent to the Builder actor. The `operation` field carries the tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuilderEvent {
    /// Provision the environment's infrastructure and build job.
    Create(InfrastructureSpec),
    /// Reconfigure an existing environment's build job.
    Update(InfrastructureSpec),
    /// Tear down the environment's infrastructure.
    Delete(EnvironmentRef),
    /// Create or replace the start/stop schedule rules.
    UpdateSchedule(ScheduleSpec),
    /// Remove the start/stop schedule rules.
    DeleteSchedule(EnvironmentRef),
    /// Report component version information.
    Version,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentRef {
    pub repository: String,
    pub branch: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureSpec {
    pub repository: String,
    pub branch: String,
    pub infrastructure_repo_url: String,
    #[serde(rename = "codeBuildRoleARN")]
    pub code_build_role_arn: String,
    pub environment_variables: EnvironmentVariables,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSpec {
    pub repository: String,
    pub branch: String,
    pub shutdown_schedules: Vec<TimeSchedule>,
    pub startup_schedules: Vec<TimeSchedule>,
}

impl BuilderEvent {
    pub fn operation(&self) -> &'static str {
        match self {
            BuilderEvent::Create(_) => "CREATE",
            BuilderEvent::Update(_) => "UPDATE",
            BuilderEvent::Delete(_) => "DELETE",
            BuilderEvent::UpdateSchedule(_) => "UPDATE_SCHEDULE",
            BuilderEvent::DeleteSchedule(_) => "DELETE_SCHEDULE",
            BuilderEvent::Version => "VERSION",
        }
    }

    pub fn update_schedule(env: &Environment) -> Self {
        BuilderEvent::UpdateSchedule(ScheduleSpec {
            repository: env.repository.clone(),
            branch: env.branch.clone(),
            shutdown_schedules: env.shutdown_schedules.clone(),
            startup_schedules: env.startup_schedules.clone(),
        })
    }

    pub fn create(env: &Environment) -> Self {
        BuilderEvent::Create(InfrastructureSpec::from(env))
    }

    pub fn update(env: &Environment) -> Self {
        BuilderEvent::Update(InfrastructureSpec::from(env))
    }

    pub fn delete_schedule(repository: &str, branch: &str) -> Self {
        BuilderEvent::DeleteSchedule(EnvironmentRef::new(repository, branch))
    }

    pub fn delete(repository: &str, branch: &str) -> Self {
        BuilderEvent::Delete(EnvironmentRef::new(repository, branch))
    }
}

impl EnvironmentRef {
    pub fn new(repository: &str, branch: &str) -> Self {
        Self {
            repository: repository.to_string(),
            branch: branch.to_string(),
        }
    }
}

impl From<&Environment> for InfrastructureSpec {
    fn from(env: &Environment) -> Self {
        Self {
            repository: env.repository.clone(),
            branch: env.branch.clone(),
            infrastructure_repo_url: env.infrastructure_repo_url.clone(),
            code_build_role_arn: env.code_build_role_arn.clone(),
            environment_variables: env.environment_variables.clone(),
        }
    }
}
