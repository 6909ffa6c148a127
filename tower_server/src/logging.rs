//! Tracing setup with a reloadable level filter.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use crate::models::tower::TowerConfiguration;

/// Changes the active log filter after startup.
#[derive(Clone)]
pub struct LogLevelHandle {
    handle: reload::Handle<EnvFilter, Registry>,
}

impl LogLevelHandle {
    pub fn apply(&self, config: &TowerConfiguration) -> Result<(), reload::Error> {
        let directive = config.filter_directive();
        self.handle.reload(EnvFilter::new(directive))?;
        tracing::info!(level = directive, "Log level changed");
        Ok(())
    }
}

/// Install the global subscriber. `RUST_LOG` seeds the filter (default
/// `info`) and `LOG_FORMAT=json` switches to JSON lines.
pub fn init() -> LogLevelHandle {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let (filter, handle) = reload::Layer::new(filter);
    let registry = tracing_subscriber::registry().with(filter);

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    LogLevelHandle { handle }
}
