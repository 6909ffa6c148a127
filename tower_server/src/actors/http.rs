//! HTTP transport for actor invocations.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{Actor, ActorInvoker, ActorReply, InvokeError};

const INVOCATION_TYPE: &str = "X-Invocation-Type";
const INVOCATION_ID: &str = "X-Invocation-Id";

#[derive(Clone)]
pub struct HttpInvoker {
    client: reqwest::Client,
    builder_url: Option<String>,
    scheduler_url: Option<String>,
}

impl HttpInvoker {
    pub fn new(
        builder_url: Option<String>,
        scheduler_url: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("auto-staging-tower/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            builder_url,
            scheduler_url,
        })
    }

    fn endpoint(&self, actor: Actor) -> Result<&str, InvokeError> {
        let url = match actor {
            Actor::Builder => self.builder_url.as_deref(),
            Actor::Scheduler => self.scheduler_url.as_deref(),
        };
        url.filter(|u| !u.is_empty())
            .ok_or(InvokeError::NotConfigured(actor))
    }

    async fn post(
        &self,
        actor: Actor,
        invocation_type: &str,
        payload: &Value,
    ) -> Result<reqwest::Response, InvokeError> {
        let url = self.endpoint(actor)?;
        let invocation_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(%actor, %invocation_id, invocation_type, "Invoking actor");

        self.client
            .post(url)
            .header(INVOCATION_TYPE, invocation_type)
            .header(INVOCATION_ID, invocation_id)
            .json(payload)
            .send()
            .await
            .map_err(|source| InvokeError::Transport { actor, source })
    }
}

#[async_trait]
impl ActorInvoker for HttpInvoker {
    async fn invoke_async(&self, actor: Actor, payload: Value) -> Result<(), InvokeError> {
        let resp = self.post(actor, "Event", &payload).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(InvokeError::Rejected {
                actor,
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    async fn invoke_sync(&self, actor: Actor, payload: Value) -> Result<ActorReply, InvokeError> {
        let resp = self.post(actor, "RequestResponse", &payload).await?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|source| InvokeError::Transport { actor, source })?;

        let payload = if body.is_empty() {
            Value::Null
        } else if (200..300).contains(&status) {
            serde_json::from_slice(&body).map_err(|e| InvokeError::Decode {
                actor,
                reason: e.to_string(),
            })?
        } else {
            // Failure bodies need not be JSON.
            serde_json::from_slice(&body)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
        };
        Ok(ActorReply { status, payload })
    }
}
