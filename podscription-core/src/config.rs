use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "podscription.toml";
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// Single-variable override for the API base URL.
pub const API_URL_ENV: &str = "PODSCRIPTION_API_URL";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PodscriptionConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Request timeout. `None` leaves it to the transport.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PodscriptionConfig {
    /// Layers, lowest precedence first: built-in defaults, the TOML file at
    /// `path` (optional), `PODSCRIPTION_*` env vars with `__` nesting, then
    /// `PODSCRIPTION_API_URL`.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        Self::builder(path)?
            .add_source(
                Environment::with_prefix("PODSCRIPTION")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("api.base_url", std::env::var(API_URL_ENV).ok())?
            .build()?
            .try_deserialize()
    }

    /// Defaults plus the optional file only, without the environment.
    pub fn load_file(path: &str) -> Result<Self, ConfigError> {
        Self::builder(path)?.build()?.try_deserialize()
    }

    fn builder(path: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("api.base_url", DEFAULT_API_URL)?
            .set_default("log.level", "info")?
            .add_source(File::with_name(path).required(false)))
    }

    /// Replace the API base URL (CLI flag wins over every other layer).
    pub fn with_api_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.api.base_url = url;
        }
        self
    }
}
