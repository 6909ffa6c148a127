//! Tower error taxonomy and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::actors::InvokeError;
use crate::models::status::EnvironmentStatus;
use crate::store::StoreError;

pub type TowerResult<T> = Result<T, TowerError>;

#[derive(Debug, thiserror::Error)]
pub enum TowerError {
    #[error("Not found")]
    NotFound,

    #[error("Unique constraint violation")]
    UniqueConstraintViolation,

    #[error("Invalid environment status")]
    InvalidStatus {
        operation: &'static str,
        status: EnvironmentStatus,
    },

    #[error("First remove all environments for the repository")]
    HasDependents,

    #[error("{operation}: {source}")]
    ServiceUnavailable {
        operation: &'static str,
        #[source]
        source: InvokeError,
    },

    #[error("{operation}: default resolution failed: {source}")]
    ResolutionFailure {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("{operation}: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{operation}: {source}")]
    Internal {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl TowerError {
    pub fn invalid_body() -> Self {
        TowerError::InvalidRequest("Invalid request body".to_string())
    }

    /// Wrap a store failure, mapping `NotFound` to the domain variant.
    pub fn store(operation: &'static str) -> impl FnOnce(StoreError) -> TowerError {
        move |source| match source {
            StoreError::NotFound => TowerError::NotFound,
            source => TowerError::Store { operation, source },
        }
    }

    pub fn invoke(operation: &'static str) -> impl FnOnce(InvokeError) -> TowerError {
        move |source| TowerError::ServiceUnavailable { operation, source }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            TowerError::NotFound => StatusCode::NOT_FOUND,
            TowerError::UniqueConstraintViolation
            | TowerError::InvalidStatus { .. }
            | TowerError::HasDependents
            | TowerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            TowerError::ServiceUnavailable { .. }
            | TowerError::ResolutionFailure { .. }
            | TowerError::Store { .. }
            | TowerError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TowerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(serde_json::json!({ "message": message }))).into_response()
    }
}
