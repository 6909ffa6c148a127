//! tower.repository — A registered source repository and its environment defaults.

use serde::{Deserialize, Serialize};

use super::settings::{EnvironmentVariables, TimeSchedule};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub repository: String,
    #[serde(rename = "infrastructureRepoURL")]
    pub infrastructure_repo_url: String,
    pub webhook: bool,
    pub filters: Vec<String>,
    pub shutdown_schedules: Vec<TimeSchedule>,
    pub startup_schedules: Vec<TimeSchedule>,
    #[serde(rename = "codeBuildRoleARN")]
    pub code_build_role_arn: String,
    pub environment_variables: EnvironmentVariables,
}

/// POST body for a new repository. Unset schedules, variables and build role
/// fall back to the stage's global defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRepository {
    pub repository: String,
    #[serde(rename = "infrastructureRepoURL", default)]
    pub infrastructure_repo_url: Option<String>,
    #[serde(default)]
    pub webhook: bool,
    #[serde(default)]
    pub filters: Vec<String>,
    pub shutdown_schedules: Option<Vec<TimeSchedule>>,
    pub startup_schedules: Option<Vec<TimeSchedule>>,
    #[serde(rename = "codeBuildRoleARN", default)]
    pub code_build_role_arn: Option<String>,
    pub environment_variables: Option<EnvironmentVariables>,
}

/// PUT body: every mutable field is overwritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepositoryUpdate {
    #[serde(rename = "infrastructureRepoURL")]
    pub infrastructure_repo_url: String,
    pub webhook: bool,
    pub filters: Vec<String>,
    pub shutdown_schedules: Vec<TimeSchedule>,
    pub startup_schedules: Vec<TimeSchedule>,
    #[serde(rename = "codeBuildRoleARN")]
    pub code_build_role_arn: String,
    pub environment_variables: EnvironmentVariables,
}

impl Repository {
    /// Apply a full-field update, keeping the identifier.
    pub fn apply(&mut self, update: &RepositoryUpdate) {
        self.infrastructure_repo_url = update.infrastructure_repo_url.clone();
        self.webhook = update.webhook;
        self.filters = update.filters.clone();
        self.shutdown_schedules = update.shutdown_schedules.clone();
        self.startup_schedules = update.startup_schedules.clone();
        self.code_build_role_arn = update.code_build_role_arn.clone();
        self.environment_variables = update.environment_variables.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_repository_distinguishes_missing_from_empty_lists() {
        let post: NewRepository = serde_json::from_str(
            r#"{"repository": "svc-a", "startupSchedules": []}"#,
        )
        .unwrap();

        assert_eq!(post.startup_schedules, Some(vec![]));
        assert_eq!(post.shutdown_schedules, None);
        assert_eq!(post.code_build_role_arn, None);
        assert!(!post.webhook);
    }

    #[test]
    fn repository_uses_original_field_names() {
        let repo = Repository {
            repository: "svc-a".to_string(),
            infrastructure_repo_url: "https://git.example.com/infra.git".to_string(),
            webhook: true,
            filters: vec!["^feat/".to_string()],
            shutdown_schedules: vec![],
            startup_schedules: vec![],
            code_build_role_arn: "role-x".to_string(),
            environment_variables: EnvironmentVariables::new(),
        };

        let json = serde_json::to_value(&repo).unwrap();
        assert_eq!(json["infrastructureRepoURL"], "https://git.example.com/infra.git");
        assert_eq!(json["codeBuildRoleARN"], "role-x");
        assert_eq!(json["shutdownSchedules"], serde_json::json!([]));
    }
}
