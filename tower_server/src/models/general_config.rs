//! tower.general_config — Stage-wide defaults, the last layer of the cascade.

use serde::{Deserialize, Serialize};

use super::settings::{EnvironmentVariables, TimeSchedule};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneralConfig {
    pub shutdown_schedules: Vec<TimeSchedule>,
    pub startup_schedules: Vec<TimeSchedule>,
    pub environment_variables: EnvironmentVariables,
    #[serde(rename = "codeBuildRoleARN")]
    pub code_build_role_arn: String,
}
