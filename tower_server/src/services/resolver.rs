//! Layered default resolution: request payload -> repository -> stage defaults.
//!
//! A field is absent when it is `None`, or an empty string. Each absent field
//! is taken from the next layer independently of the others.

use std::fmt;

use crate::models::environment::NewEnvironment;
use crate::models::general_config::GeneralConfig;
use crate::models::repository::{NewRepository, Repository};
use crate::models::settings::{EnvironmentVariables, TimeSchedule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigField {
    InfrastructureRepoUrl,
    ShutdownSchedules,
    StartupSchedules,
    CodeBuildRoleArn,
    EnvironmentVariables,
}

impl ConfigField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigField::InfrastructureRepoUrl => "infrastructureRepoURL",
            ConfigField::ShutdownSchedules => "shutdownSchedules",
            ConfigField::StartupSchedules => "startupSchedules",
            ConfigField::CodeBuildRoleArn => "codeBuildRoleARN",
            ConfigField::EnvironmentVariables => "environmentVariables",
        }
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One layer of overridable configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigLayer {
    pub infrastructure_repo_url: Option<String>,
    pub shutdown_schedules: Option<Vec<TimeSchedule>>,
    pub startup_schedules: Option<Vec<TimeSchedule>>,
    pub code_build_role_arn: Option<String>,
    pub environment_variables: Option<EnvironmentVariables>,
}

/// A layer with every field materialised.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedConfig {
    pub infrastructure_repo_url: String,
    pub shutdown_schedules: Vec<TimeSchedule>,
    pub startup_schedules: Vec<TimeSchedule>,
    pub code_build_role_arn: String,
    pub environment_variables: EnvironmentVariables,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl ConfigLayer {
    /// Fields that the next layer would have to fill.
    pub fn absent_fields(&self) -> Vec<ConfigField> {
        let mut absent = Vec::new();
        if present(self.infrastructure_repo_url.clone()).is_none() {
            absent.push(ConfigField::InfrastructureRepoUrl);
        }
        if self.shutdown_schedules.is_none() {
            absent.push(ConfigField::ShutdownSchedules);
        }
        if self.startup_schedules.is_none() {
            absent.push(ConfigField::StartupSchedules);
        }
        if present(self.code_build_role_arn.clone()).is_none() {
            absent.push(ConfigField::CodeBuildRoleArn);
        }
        if self.environment_variables.is_none() {
            absent.push(ConfigField::EnvironmentVariables);
        }
        absent
    }

    pub fn is_complete(&self) -> bool {
        self.absent_fields().is_empty()
    }

    /// Materialise fields that are still absent as empty values.
    pub fn into_resolved(self) -> ResolvedConfig {
        ResolvedConfig {
            infrastructure_repo_url: present(self.infrastructure_repo_url).unwrap_or_default(),
            shutdown_schedules: self.shutdown_schedules.unwrap_or_default(),
            startup_schedules: self.startup_schedules.unwrap_or_default(),
            code_build_role_arn: present(self.code_build_role_arn).unwrap_or_default(),
            environment_variables: self.environment_variables.unwrap_or_default(),
        }
    }
}

/// Fill every absent field of `candidate` from `fallback`. Returns the merged
/// layer and the fields that were substituted.
pub fn resolve(
    candidate: ConfigLayer,
    fallback: &ConfigLayer,
    source: &'static str,
) -> (ConfigLayer, Vec<ConfigField>) {
    let mut substitutions = Vec::new();

    let infrastructure_repo_url = pick_string(
        candidate.infrastructure_repo_url,
        &fallback.infrastructure_repo_url,
        ConfigField::InfrastructureRepoUrl,
        &mut substitutions,
    );
    let shutdown_schedules = pick(
        candidate.shutdown_schedules,
        &fallback.shutdown_schedules,
        ConfigField::ShutdownSchedules,
        &mut substitutions,
    );
    let startup_schedules = pick(
        candidate.startup_schedules,
        &fallback.startup_schedules,
        ConfigField::StartupSchedules,
        &mut substitutions,
    );
    let code_build_role_arn = pick_string(
        candidate.code_build_role_arn,
        &fallback.code_build_role_arn,
        ConfigField::CodeBuildRoleArn,
        &mut substitutions,
    );
    let environment_variables = pick(
        candidate.environment_variables,
        &fallback.environment_variables,
        ConfigField::EnvironmentVariables,
        &mut substitutions,
    );

    for field in &substitutions {
        tracing::debug!(%field, source, "Using default for unset field");
        crate::metrics::default_substituted(field.as_str(), source);
    }

    let layer = ConfigLayer {
        infrastructure_repo_url,
        shutdown_schedules,
        startup_schedules,
        code_build_role_arn,
        environment_variables,
    };
    (layer, substitutions)
}

fn pick<T: Clone>(
    value: Option<T>,
    fallback: &Option<T>,
    field: ConfigField,
    substitutions: &mut Vec<ConfigField>,
) -> Option<T> {
    match value {
        Some(v) => Some(v),
        None if fallback.is_some() => {
            substitutions.push(field);
            fallback.clone()
        }
        None => None,
    }
}

fn pick_string(
    value: Option<String>,
    fallback: &Option<String>,
    field: ConfigField,
    substitutions: &mut Vec<ConfigField>,
) -> Option<String> {
    pick(present(value), &present(fallback.clone()), field, substitutions)
}

// ── Layers ──

impl From<&NewEnvironment> for ConfigLayer {
    fn from(post: &NewEnvironment) -> Self {
        Self {
            infrastructure_repo_url: post.infrastructure_repo_url.clone(),
            shutdown_schedules: post.shutdown_schedules.clone(),
            startup_schedules: post.startup_schedules.clone(),
            code_build_role_arn: post.code_build_role_arn.clone(),
            environment_variables: post.environment_variables.clone(),
        }
    }
}

impl From<&NewRepository> for ConfigLayer {
    fn from(post: &NewRepository) -> Self {
        Self {
            infrastructure_repo_url: post.infrastructure_repo_url.clone(),
            shutdown_schedules: post.shutdown_schedules.clone(),
            startup_schedules: post.startup_schedules.clone(),
            code_build_role_arn: post.code_build_role_arn.clone(),
            environment_variables: post.environment_variables.clone(),
        }
    }
}

impl From<&Repository> for ConfigLayer {
    fn from(repo: &Repository) -> Self {
        Self {
            infrastructure_repo_url: Some(repo.infrastructure_repo_url.clone()),
            shutdown_schedules: Some(repo.shutdown_schedules.clone()),
            startup_schedules: Some(repo.startup_schedules.clone()),
            code_build_role_arn: Some(repo.code_build_role_arn.clone()),
            environment_variables: Some(repo.environment_variables.clone()),
        }
    }
}

/// Stage defaults carry no infrastructure URL.
impl From<&GeneralConfig> for ConfigLayer {
    fn from(config: &GeneralConfig) -> Self {
        Self {
            infrastructure_repo_url: None,
            shutdown_schedules: Some(config.shutdown_schedules.clone()),
            startup_schedules: Some(config.startup_schedules.clone()),
            code_build_role_arn: Some(config.code_build_role_arn.clone()),
            environment_variables: Some(config.environment_variables.clone()),
        }
    }
}
