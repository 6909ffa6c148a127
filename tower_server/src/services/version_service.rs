//! Version information of the tower and the actors it drives.

use serde_json::Value;

use super::lifecycle::Lifecycle;
use crate::actors::{Actor, InvokeError};
use crate::events::builder::BuilderEvent;
use crate::models::tower::{ComponentVersion, ComponentVersions};

/// Version of this binary, with commit and branch taken from the build
/// environment when set.
pub fn tower_version() -> ComponentVersion {
    ComponentVersion {
        name: "tower".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit_hash: std::env::var("TOWER_COMMIT_HASH").unwrap_or_default(),
        branch: std::env::var("TOWER_BRANCH").unwrap_or_default(),
        build_time: std::env::var("TOWER_BUILD_TIME").unwrap_or_default(),
    }
}

impl Lifecycle {
    /// Never fails: an actor that cannot answer is listed with empty fields.
    pub async fn versions(&self) -> ComponentVersions {
        let mut components = vec![tower_version()];
        for actor in [Actor::Builder, Actor::Scheduler] {
            let version = match self.component_version(actor).await {
                Ok(version) => version,
                Err(e) => {
                    tracing::warn!(%actor, error = %e, "Version lookup failed");
                    ComponentVersion {
                        name: actor.as_str().to_string(),
                        ..ComponentVersion::default()
                    }
                }
            };
            components.push(version);
        }
        ComponentVersions { components }
    }

    async fn component_version(&self, actor: Actor) -> Result<ComponentVersion, InvokeError> {
        let probe = serde_json::to_value(BuilderEvent::Version)?;
        let reply = self.call(actor, "VERSION", probe).await?;
        if !reply.is_success() {
            return Err(InvokeError::Rejected {
                actor,
                status: reply.status,
            });
        }
        decode_version(actor, reply.payload)
    }
}

/// Replies may arrive as a JSON document or as a string holding one.
fn decode_version(actor: Actor, payload: Value) -> Result<ComponentVersion, InvokeError> {
    let decode_err = |e: serde_json::Error| InvokeError::Decode {
        actor,
        reason: e.to_string(),
    };
    match payload {
        Value::String(inner) => serde_json::from_str(&inner).map_err(decode_err),
        other => serde_json::from_value(other).map_err(decode_err),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::Harness;

    #[test]
    fn decodes_quoted_version_documents() {
        let quoted = Value::String(
            r#"{"name":"builder","version":"1.4.0","commitHash":"abc123","branch":"main","buildTime":"2024-01-01"}"#
                .to_string(),
        );
        let version = decode_version(Actor::Builder, quoted).unwrap();
        assert_eq!(version.version, "1.4.0");
        assert_eq!(version.commit_hash, "abc123");
    }

    #[tokio::test]
    async fn reports_every_component_even_when_one_fails() {
        let h = Harness::new();
        h.invoker.reply_with(200, json!({"name": "builder", "version": "1.4.0"}));
        h.invoker.fail_next_sync();

        let versions = h.lifecycle.versions().await;

        assert_eq!(versions.components.len(), 3);
        assert_eq!(versions.components[0].name, "tower");
        assert_eq!(versions.components[0].version, env!("CARGO_PKG_VERSION"));
        assert_eq!(versions.components[1].version, "1.4.0");
        assert_eq!(versions.components[2].name, "scheduler");
        assert!(versions.components[2].version.is_empty());

        let operations: Vec<_> = h
            .invoker
            .calls()
            .into_iter()
            .map(|(actor, payload)| (actor, payload["operation"].clone()))
            .collect();
        assert_eq!(
            operations,
            vec![
                (Actor::Builder, json!("VERSION")),
                (Actor::Scheduler, json!("VERSION")),
            ]
        );
    }
}
