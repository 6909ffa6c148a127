//! Diesel table definitions for the tower store.
//!
//! Tables: repositories, environments, repositories_global_config,
//! tower_configuration. List and map attributes live in JSONB columns.

diesel::table! {
    repositories (repository) {
        repository -> Varchar,
        infrastructure_repo_url -> Varchar,
        webhook -> Bool,
        filters -> Jsonb,
        shutdown_schedules -> Jsonb,
        startup_schedules -> Jsonb,
        code_build_role_arn -> Varchar,
        environment_variables -> Jsonb,
    }
}

diesel::table! {
    environments (repository, branch) {
        repository -> Varchar,
        branch -> Varchar,
        status -> Varchar,
        creation_date -> Timestamptz,
        infrastructure_repo_url -> Varchar,
        shutdown_schedules -> Jsonb,
        startup_schedules -> Jsonb,
        code_build_role_arn -> Varchar,
        environment_variables -> Jsonb,
    }
}

diesel::table! {
    repositories_global_config (stage) {
        stage -> Varchar,
        shutdown_schedules -> Jsonb,
        startup_schedules -> Jsonb,
        environment_variables -> Jsonb,
        code_build_role_arn -> Varchar,
    }
}

diesel::table! {
    tower_configuration (tower_stage) {
        tower_stage -> Varchar,
        log_level -> Int2,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    repositories,
    environments,
    repositories_global_config,
    tower_configuration,
);
