//! Application configuration.
//!
//! Loaded from environment variables with the `TENQ` prefix and `__` as the
//! nesting separator (`TENQ__AI__TIMEOUT_SECS=20` -> `ai.timeout_secs`),
//! with a `.env` file honored in development.

mod ai;
mod database;
mod error;
mod limits;
mod server;

pub use ai::AiConfig;
pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use limits::LimitsConfig;
pub use server::ServerConfig;

use serde::Deserialize;

/// Root configuration for the service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ai: AiConfig,
    pub limits: LimitsConfig,
}

impl AppConfig {
    /// Loads configuration from the environment (and `.env` if present).
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("TENQ")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    /// Cross-field validation, run once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ai.validate().map_err(ConfigError::Invalid)?;
        self.limits.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(AppConfig::default().validate().is_ok());
    }
}
