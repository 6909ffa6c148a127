//! tower.environment — One ephemeral deployment per (repository, branch).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::settings::{EnvironmentVariables, TimeSchedule};
use super::status::EnvironmentStatus;

/// A persisted environment. Configuration fields are always resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub repository: String,
    pub branch: String,
    pub status: EnvironmentStatus,
    pub creation_date: DateTime<Utc>,
    #[serde(rename = "infrastructureRepoURL")]
    pub infrastructure_repo_url: String,
    pub shutdown_schedules: Vec<TimeSchedule>,
    pub startup_schedules: Vec<TimeSchedule>,
    #[serde(rename = "codeBuildRoleARN")]
    pub code_build_role_arn: String,
    pub environment_variables: EnvironmentVariables,
}

/// POST body for a new environment. Unset fields come from the repository.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEnvironment {
    pub branch: String,
    #[serde(rename = "infrastructureRepoURL", default)]
    pub infrastructure_repo_url: Option<String>,
    pub shutdown_schedules: Option<Vec<TimeSchedule>>,
    pub startup_schedules: Option<Vec<TimeSchedule>>,
    #[serde(rename = "codeBuildRoleARN", default)]
    pub code_build_role_arn: Option<String>,
    pub environment_variables: Option<EnvironmentVariables>,
}

impl NewEnvironment {
    pub fn for_branch(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            ..Self::default()
        }
    }
}

/// PUT body: every configuration field is overwritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentUpdate {
    #[serde(rename = "infrastructureRepoURL")]
    pub infrastructure_repo_url: String,
    pub shutdown_schedules: Vec<TimeSchedule>,
    pub startup_schedules: Vec<TimeSchedule>,
    #[serde(rename = "codeBuildRoleARN")]
    pub code_build_role_arn: String,
    pub environment_variables: EnvironmentVariables,
}

impl Environment {
    pub fn apply(&mut self, update: &EnvironmentUpdate) {
        self.infrastructure_repo_url = update.infrastructure_repo_url.clone();
        self.shutdown_schedules = update.shutdown_schedules.clone();
        self.startup_schedules = update.startup_schedules.clone();
        self.code_build_role_arn = update.code_build_role_arn.clone();
        self.environment_variables = update.environment_variables.clone();
    }

    pub fn status_info(&self) -> EnvironmentStatusInfo {
        EnvironmentStatusInfo {
            repository: self.repository.clone(),
            branch: self.branch.clone(),
            status: self.status,
        }
    }
}

/// The (repository, branch, status) projection read before every gated mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentStatusInfo {
    pub repository: String,
    pub branch: String,
    pub status: EnvironmentStatus,
}
