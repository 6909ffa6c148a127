//! Tower HTTP routes: REST API, triggers and GitHub webhooks.

pub mod api;
pub mod webhook;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::TowerConfig;
use crate::error::TowerError;
use crate::logging::LogLevelHandle;
use crate::models::environment::{
    Environment, EnvironmentStatusInfo, EnvironmentUpdate, NewEnvironment,
};
use crate::models::general_config::GeneralConfig;
use crate::models::repository::{NewRepository, Repository, RepositoryUpdate};
use crate::models::tower::{ComponentVersions, TowerConfiguration};
use crate::services::lifecycle::Lifecycle;
use api::{parse_body, MessageJson, TriggerRequest};

/// Shared state for tower route handlers.
#[derive(Clone)]
pub struct TowerRouterState {
    pub lifecycle: Lifecycle,
    pub config: TowerConfig,
    /// Absent when no global subscriber was installed (tests).
    pub log_level: Option<LogLevelHandle>,
}

type ApiResult<T> = Result<T, TowerError>;

/// Build the tower's Axum router.
pub fn tower_router(state: TowerRouterState) -> Router {
    Router::new()
        // Tower
        .route("/configuration", get(get_configuration).put(put_configuration))
        .route("/versions", get(get_versions))
        // Repositories
        .route("/repositories", get(list_repositories).post(add_repository))
        .route(
            "/repositories/environments",
            get(get_global_config).put(put_global_config),
        )
        .route("/repositories/environments/status", get(list_statuses))
        .route(
            "/repositories/{name}",
            get(get_repository)
                .put(update_repository)
                .delete(delete_repository),
        )
        // Environments
        .route(
            "/repositories/{name}/environments",
            get(list_environments).post(add_environment),
        )
        .route(
            "/repositories/{name}/environments/{branch}",
            get(get_environment)
                .put(update_environment)
                .delete(delete_environment),
        )
        .route(
            "/repositories/{name}/environments/{branch}/status",
            get(get_status),
        )
        // Triggers and webhooks
        .route("/triggers/schedule", post(trigger_schedule))
        .route("/webhooks/github", post(github_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Tower ──

async fn get_configuration(
    State(state): State<TowerRouterState>,
) -> ApiResult<Json<TowerConfiguration>> {
    state.lifecycle.tower_config().await.map(Json)
}

async fn put_configuration(
    State(state): State<TowerRouterState>,
    body: Bytes,
) -> ApiResult<Json<TowerConfiguration>> {
    let config: TowerConfiguration = parse_body(&body)?;
    let stored = state.lifecycle.update_tower_config(config).await?;
    if let Some(levels) = &state.log_level {
        if let Err(e) = levels.apply(&stored) {
            tracing::warn!("Failed to apply log level: {e}");
        }
    }
    Ok(Json(stored))
}

async fn get_versions(State(state): State<TowerRouterState>) -> Json<ComponentVersions> {
    Json(state.lifecycle.versions().await)
}

// ── Repositories ──

async fn list_repositories(
    State(state): State<TowerRouterState>,
) -> ApiResult<Json<Vec<Repository>>> {
    state.lifecycle.list_repositories().await.map(Json)
}

async fn add_repository(
    State(state): State<TowerRouterState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Repository>)> {
    let post: NewRepository = parse_body(&body)?;
    if post.repository.is_empty() {
        return Err(TowerError::invalid_body());
    }
    let repository = state.lifecycle.add_repository(post).await?;
    Ok((StatusCode::CREATED, Json(repository)))
}

async fn get_repository(
    State(state): State<TowerRouterState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Repository>> {
    state.lifecycle.get_repository(&name).await.map(Json)
}

async fn update_repository(
    State(state): State<TowerRouterState>,
    Path(name): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Repository>> {
    let put: RepositoryUpdate = parse_body(&body)?;
    state.lifecycle.update_repository(&name, put).await.map(Json)
}

async fn delete_repository(
    State(state): State<TowerRouterState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    state.lifecycle.delete_repository(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_global_config(
    State(state): State<TowerRouterState>,
) -> ApiResult<Json<GeneralConfig>> {
    state.lifecycle.general_config().await.map(Json)
}

async fn put_global_config(
    State(state): State<TowerRouterState>,
    body: Bytes,
) -> ApiResult<Json<GeneralConfig>> {
    let config: GeneralConfig = parse_body(&body)?;
    state.lifecycle.update_general_config(config).await.map(Json)
}

// ── Environments ──

async fn list_environments(
    State(state): State<TowerRouterState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<Environment>>> {
    state.lifecycle.list_environments(&name).await.map(Json)
}

async fn add_environment(
    State(state): State<TowerRouterState>,
    Path(name): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Environment>)> {
    let post: NewEnvironment = parse_body(&body)?;
    if post.branch.is_empty() {
        return Err(TowerError::invalid_body());
    }
    // 404 for an unknown repository even when the payload sets every field.
    state.lifecycle.get_repository(&name).await?;
    let environment = state.lifecycle.add_environment(&name, post).await?;
    Ok((StatusCode::CREATED, Json(environment)))
}

async fn get_environment(
    State(state): State<TowerRouterState>,
    Path((name, branch)): Path<(String, String)>,
) -> ApiResult<Json<Environment>> {
    state.lifecycle.get_environment(&name, &branch).await.map(Json)
}

async fn update_environment(
    State(state): State<TowerRouterState>,
    Path((name, branch)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Json<Environment>> {
    let put: EnvironmentUpdate = parse_body(&body)?;
    state
        .lifecycle
        .update_environment(&name, &branch, put)
        .await
        .map(Json)
}

async fn delete_environment(
    State(state): State<TowerRouterState>,
    Path((name, branch)): Path<(String, String)>,
) -> ApiResult<(StatusCode, Json<MessageJson>)> {
    state.lifecycle.delete_environment(&name, &branch).await?;
    Ok((StatusCode::ACCEPTED, Json(MessageJson::new("Invoked Builder"))))
}

async fn list_statuses(
    State(state): State<TowerRouterState>,
) -> ApiResult<Json<Vec<EnvironmentStatusInfo>>> {
    state.lifecycle.list_environment_statuses().await.map(Json)
}

async fn get_status(
    State(state): State<TowerRouterState>,
    Path((name, branch)): Path<(String, String)>,
) -> ApiResult<Json<EnvironmentStatusInfo>> {
    state
        .lifecycle
        .get_environment_status(&name, &branch)
        .await
        .map(Json)
}

// ── Triggers ──

async fn trigger_schedule(
    State(state): State<TowerRouterState>,
    body: Bytes,
) -> ApiResult<Json<MessageJson>> {
    let req: TriggerRequest = parse_body(&body)?;
    let branch = req.decoded_branch()?;
    let reply = state
        .lifecycle
        .trigger(&req.repository, &branch, req.action)
        .await?;
    Ok(Json(MessageJson::new(reply.message)))
}

// ── Webhook ──

async fn github_webhook(
    State(state): State<TowerRouterState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let event = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    crate::metrics::webhook_received(event);

    match webhook::handle_webhook(&state, event, &headers, &body).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}
