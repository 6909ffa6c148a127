//! Invocation of the Builder and Scheduler actors.

pub mod http;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actor {
    Builder,
    Scheduler,
}

impl Actor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Actor::Builder => "builder",
            Actor::Scheduler => "scheduler",
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reply of a synchronous invocation. `payload` is `Null` for an empty body.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorReply {
    pub status: u16,
    pub payload: Value,
}

impl ActorReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("no endpoint configured for the {0}")]
    NotConfigured(Actor),

    #[error("{actor} invocation failed: {source}")]
    Transport {
        actor: Actor,
        #[source]
        source: reqwest::Error,
    },

    #[error("{actor} rejected the event with status {status}")]
    Rejected { actor: Actor, status: u16 },

    #[error("{actor} reply could not be decoded: {reason}")]
    Decode { actor: Actor, reason: String },

    #[error("payload could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

#[async_trait]
pub trait ActorInvoker: Send + Sync {
    /// One-way dispatch. Returns once the actor has accepted the event.
    async fn invoke_async(&self, actor: Actor, payload: Value) -> Result<(), InvokeError>;

    /// Request/reply. A non-success status is still a reply, not an error.
    async fn invoke_sync(&self, actor: Actor, payload: Value) -> Result<ActorReply, InvokeError>;
}
