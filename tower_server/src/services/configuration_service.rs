//! Stage-scoped settings: global repository defaults and the tower's own
//! configuration.

use super::lifecycle::Lifecycle;
use crate::error::{TowerError, TowerResult};
use crate::models::general_config::GeneralConfig;
use crate::models::tower::{TowerConfiguration, MAX_LOG_LEVEL};

impl Lifecycle {
    /// A stage without a stored record has empty defaults.
    pub async fn general_config(&self) -> TowerResult<GeneralConfig> {
        let config = self
            .stores
            .general_config
            .get_general_config(&self.stage)
            .await
            .map_err(TowerError::store("get global configuration"))?;
        Ok(config.unwrap_or_default())
    }

    pub async fn update_general_config(&self, config: GeneralConfig) -> TowerResult<GeneralConfig> {
        let stored = self
            .stores
            .general_config
            .put_general_config(&self.stage, &config)
            .await
            .map_err(TowerError::store("update global configuration"))?;
        tracing::info!(stage = %self.stage, "Updated global repository configuration");
        Ok(stored)
    }

    pub async fn tower_config(&self) -> TowerResult<TowerConfiguration> {
        let config = self
            .stores
            .tower_config
            .get_tower_config(&self.stage)
            .await
            .map_err(TowerError::store("get configuration"))?;
        Ok(config.unwrap_or_default())
    }

    pub async fn update_tower_config(
        &self,
        config: TowerConfiguration,
    ) -> TowerResult<TowerConfiguration> {
        if config.log_level > MAX_LOG_LEVEL {
            return Err(TowerError::InvalidRequest(format!(
                "logLevel must be between 0 and {MAX_LOG_LEVEL}"
            )));
        }
        let stored = self
            .stores
            .tower_config
            .put_tower_config(&self.stage, &config)
            .await
            .map_err(TowerError::store("update configuration"))?;
        tracing::info!(stage = %self.stage, log_level = stored.log_level, "Updated tower configuration");
        Ok(stored)
    }
}
