//! GitHub webhook handler: branch creation and deletion drive environments.

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};

use super::api::{parse_body, MessageJson};
use super::TowerRouterState;
use crate::error::TowerError;
use crate::models::environment::NewEnvironment;
use crate::services::github_service::{self, RefEvent};

/// Handle an incoming GitHub webhook payload.
pub async fn handle_webhook(
    state: &TowerRouterState,
    event: &str,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Response, TowerError> {
    match event {
        "ping" => {
            tracing::info!("Received GitHub ping webhook");
            Ok(Json(MessageJson::new("Pong")).into_response())
        }
        "create" => {
            let event = verified_ref_event(state, headers, body)?;
            handle_create(state, event).await
        }
        "delete" => {
            let event = verified_ref_event(state, headers, body)?;
            state
                .lifecycle
                .delete_environment(&event.repository.name, &event.git_ref)
                .await?;
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        _ => {
            tracing::debug!("Ignoring webhook event: {}", event);
            Ok(StatusCode::OK.into_response())
        }
    }
}

fn verified_ref_event(
    state: &TowerRouterState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<RefEvent, TowerError> {
    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !github_service::validate_signature(&state.config.webhook_secret, body, signature) {
        tracing::warn!("Webhook signature validation failed");
        return Err(TowerError::InvalidRequest(
            "HMAC validation failed".to_string(),
        ));
    }

    let event: RefEvent = parse_body(body)?;
    if !event.is_branch() {
        return Err(TowerError::invalid_body());
    }
    Ok(event)
}

async fn handle_create(state: &TowerRouterState, event: RefEvent) -> Result<Response, TowerError> {
    let repository = state.lifecycle.get_repository(&event.repository.name).await?;

    if !repository.webhook {
        tracing::info!(repository = %repository.repository, "Webhooks disabled for repository");
        return Err(TowerError::InvalidRequest(
            "Webhooks are disabled for the repository".to_string(),
        ));
    }

    let hit = github_service::matches_filters(&repository.filters, &event.git_ref).map_err(|e| {
        tracing::error!(repository = %repository.repository, error = %e, "Invalid branch filter");
        TowerError::Internal {
            operation: "match branch filters",
            source: e.into(),
        }
    })?;
    if !hit {
        return Err(TowerError::InvalidRequest("No filter match".to_string()));
    }

    let environment = state
        .lifecycle
        .add_environment(
            &repository.repository,
            NewEnvironment::for_branch(event.git_ref),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(environment)).into_response())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use hmac::{Hmac, Mac};
    use serde_json::{json, Value};
    use sha2::Sha256;
    use tower::ServiceExt;

    use super::*;
    use crate::config::TowerConfig;
    use crate::models::status::EnvironmentStatus;
    use crate::routes::tower_router;
    use crate::testing::{environment_with_status, repository, Harness};

    const SECRET: &str = "hook-secret";

    fn router(h: &Harness) -> Router {
        tower_router(TowerRouterState {
            lifecycle: h.lifecycle.clone(),
            config: TowerConfig {
                webhook_secret: SECRET.to_string(),
                ..TowerConfig::default()
            },
            log_level: None,
        })
    }

    fn signature(body: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(body.as_bytes());
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    async fn deliver(h: &Harness, event: &str, payload: Value, signed: bool) -> (StatusCode, Value) {
        let body = payload.to_string();
        let sig = if signed {
            signature(&body)
        } else {
            "sha256=00".to_string()
        };
        let request = Request::builder()
            .method("POST")
            .uri("/webhooks/github")
            .header("x-github-event", event)
            .header("x-hub-signature-256", sig)
            .body(Body::from(body))
            .unwrap();
        let response = router(h).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn branch_event(branch: &str) -> Value {
        json!({
            "ref": branch,
            "ref_type": "branch",
            "repository": {"name": "svc-a", "full_name": "acme/svc-a"}
        })
    }

    #[tokio::test]
    async fn ping_answers_pong() {
        let h = Harness::new();
        let (status, body) = deliver(&h, "ping", json!({"zen": "hi"}), false).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Pong"}));
    }

    #[tokio::test]
    async fn bad_signature_is_rejected() {
        let h = Harness::new();
        let (status, body) = deliver(&h, "create", branch_event("feat/x"), false).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "HMAC validation failed");
    }

    #[tokio::test]
    async fn tag_refs_are_invalid() {
        let h = Harness::new();
        let mut event = branch_event("v1.0.0");
        event["ref_type"] = json!("tag");
        let (status, _) = deliver(&h, "create", event, true).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_matching_branch_adds_environment() {
        let h = Harness::new();
        let mut repo = repository("svc-a");
        repo.filters = vec!["^feat/".to_string()];
        h.store.seed_repository(repo).await;

        let (status, body) = deliver(&h, "create", branch_event("feat/login"), true).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["branch"], "feat/login");
        assert_eq!(
            h.invoker.builder_operations(),
            vec!["UPDATE_SCHEDULE", "CREATE"]
        );
    }

    #[tokio::test]
    async fn create_without_filter_match_is_rejected() {
        let h = Harness::new();
        let mut repo = repository("svc-a");
        repo.filters = vec!["^feat/".to_string()];
        h.store.seed_repository(repo).await;

        let (status, body) = deliver(&h, "create", branch_event("main"), true).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No filter match");
        assert_eq!(h.invoker.call_count(), 0);
    }

    #[tokio::test]
    async fn create_for_unknown_repository_is_404() {
        let h = Harness::new();
        let (status, _) = deliver(&h, "create", branch_event("feat/x"), true).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_respects_disabled_webhook_flag() {
        let h = Harness::new();
        let mut repo = repository("svc-a");
        repo.webhook = false;
        repo.filters = vec![".*".to_string()];
        h.store.seed_repository(repo).await;

        let (status, _) = deliver(&h, "create", branch_event("feat/x"), true).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(h.store.write_count(), 0);
    }

    #[tokio::test]
    async fn delete_tears_down_environment() {
        let h = Harness::new();
        h.store
            .seed_environment(environment_with_status("svc-a", "feat/x", EnvironmentStatus::Running))
            .await;

        let (status, _) = deliver(&h, "delete", branch_event("feat/x"), true).await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(
            h.invoker.builder_operations(),
            vec!["DELETE_SCHEDULE", "DELETE"]
        );
    }

    #[tokio::test]
    async fn other_events_are_ignored() {
        let h = Harness::new();
        let (status, _) = deliver(&h, "push", json!({}), false).await;
        assert_eq!(status, StatusCode::OK);
    }
}
