use std::time::Duration;

use ::config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::services::document_client::DEFAULT_API_URL;
use crate::services::rate_window::TimeUnit;

const ENV_PREFIX: &str = "CRPT";
const CONFIG_FILE_VAR: &str = "CRPT_CONFIG_FILE";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GateConfig {
    pub unit: TimeUnit,
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ApiConfig {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub gate: GateConfig,
}

impl ApiConfig {
    /// Defaults, then the TOML file named by `CRPT_CONFIG_FILE` if set, then
    /// `CRPT_*` environment variables (`CRPT_GATE__LIMIT` for nested keys).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::defaults()?;
        if let Ok(path) = std::env::var(CONFIG_FILE_VAR) {
            builder = builder.add_source(File::with_name(&path));
        }
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn defaults() -> Result<ConfigBuilder<::config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("api_url", DEFAULT_API_URL)?
            .set_default("request_timeout_secs", 30)?
            .set_default("gate.unit", "seconds")?
            .set_default("gate.limit", 10)
    }
}
