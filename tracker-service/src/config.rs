//! Configuration for tracker-service.

use serde::Deserialize;
use service_core::error::AppError;

/// PostgreSQL connection settings.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

/// Top-level service configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    pub database: DatabaseConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TrackerConfig {
    /// Load from `configuration.*` and `APP__`-prefixed environment variables.
    pub fn load() -> Result<Self, AppError> {
        service_core::config::load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_applied_when_fields_missing() {
        let config: TrackerConfig = serde_json::from_value(serde_json::json!({
            "database": { "url": "postgres://localhost/tracker" }
        }))
        .expect("minimal config should deserialize");

        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.database.min_connections, 1);
        assert_eq!(config.log_level, "info");
    }
}
