//! Request and response bodies of the REST API.

use std::borrow::Cow;

use axum::body::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::TowerError;
use crate::events::scheduler::TriggerAction;

/// Decode a JSON body, mapping any failure to "Invalid request body".
pub fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, TowerError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "Rejecting request body");
        TowerError::invalid_body()
    })
}

/// `POST /triggers/schedule`
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerRequest {
    pub repository: String,
    pub branch: String,
    pub action: TriggerAction,
}

impl TriggerRequest {
    /// Branch names arrive percent-encoded when they contain `/`.
    pub fn decoded_branch(&self) -> Result<Cow<'_, str>, TowerError> {
        urlencoding::decode(&self.branch).map_err(|e| {
            tracing::debug!(branch = %self.branch, error = %e, "Rejecting trigger branch");
            TowerError::invalid_body()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageJson {
    pub message: String,
}

impl MessageJson {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
