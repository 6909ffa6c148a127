//! Tower runtime configuration, loaded from environment variables.

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct TowerConfig {
    /// GitHub webhook secret for HMAC validation.
    pub webhook_secret: String,
    /// Endpoint receiving Builder events.
    pub builder_url: Option<String>,
    /// Endpoint answering Scheduler requests.
    pub scheduler_url: Option<String>,
    /// Deadline for a single actor invocation.
    pub actor_timeout: Duration,
    /// Size of the Postgres connection pool.
    pub db_max_connections: usize,
}

impl Default for TowerConfig {
    fn default() -> Self {
        Self {
            webhook_secret: String::new(),
            builder_url: None,
            scheduler_url: None,
            actor_timeout: Duration::from_secs(30),
            db_max_connections: 5,
        }
    }
}

impl TowerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let webhook_secret = lookup("TOWER_WEBHOOK_SECRET").unwrap_or_default();
        let builder_url = lookup("TOWER_BUILDER_URL").filter(|s| !s.is_empty());
        let scheduler_url = lookup("TOWER_SCHEDULER_URL").filter(|s| !s.is_empty());
        let actor_timeout = lookup("TOWER_ACTOR_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.actor_timeout);
        let db_max_connections = lookup("TOWER_DB_MAX_CONNECTIONS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.db_max_connections);

        if webhook_secret.is_empty() {
            tracing::warn!("TOWER_WEBHOOK_SECRET not set -- webhook signature validation disabled");
        }
        if builder_url.is_none() {
            tracing::warn!("TOWER_BUILDER_URL not set -- environment changes cannot reach the Builder");
        }
        if scheduler_url.is_none() {
            tracing::warn!("TOWER_SCHEDULER_URL not set -- triggers will fail");
        }

        Self {
            webhook_secret,
            builder_url,
            scheduler_url,
            actor_timeout,
            db_max_connections,
        }
    }
}
