use crate::search::{FuzzyConfig, IndexConfig};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Index storage and writer configuration
    #[serde(default)]
    pub index: IndexConfig,

    /// Fuzzy matcher configuration
    #[serde(default)]
    pub fuzzy: FuzzyConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path = std::env::var("COMPONENT_INDEX_CONFIG")
            .unwrap_or_else(|_| "config/component-index.toml".to_string());
        Self::load_from(&config_path)
    }

    /// Load configuration layered over the embedded defaults
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(config_path).required(false))
            // Override with environment variables (prefix: COMPONENT_INDEX__)
            .add_source(
                config::Environment::with_prefix("COMPONENT_INDEX")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log filter directive (EnvFilter syntax)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Register Prometheus collectors at startup
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            metrics_enabled: true,
        }
    }
}

fn default_log_level() -> String {
    "component_index=info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_true() -> bool {
    true
}
