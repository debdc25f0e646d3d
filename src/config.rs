//! Configuration for the connection layer.
//!
//! [`DatabaseConfig::load`] reads the `[database]` section of `config/config.toml`
//! (optional) overlaid by `ACTIVEROW__DATABASE__*` environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const CONFIG_FILE: &str = "config/config.toml";
const ENV_PREFIX: &str = "ACTIVEROW";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// Connection used by records that do not name one.
    #[serde(default = "default_connection_name")]
    pub default_connection: String,
}

fn default_connection_name() -> String {
    "default".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            default_connection: default_connection_name(),
        }
    }
}

impl DatabaseConfig {
    /// Load the database configuration from `config/config.toml`, falling back to env vars.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if neither source yields a usable configuration.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                // An unreadable file should not take the environment down with it
                if std::path::Path::new(CONFIG_FILE).exists() {
                    log::warn!("failed to load config file, falling back to env: {}", err);
                }
                Config::builder()
                    .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        Self::from_settings(&settings)
    }

    /// Extract the `database` section, using defaults when it is absent.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the section exists but does not deserialize.
    pub fn from_settings(settings: &Config) -> Result<Self, ConfigError> {
        match settings.get::<DatabaseConfig>("database") {
            Ok(cfg) => Ok(cfg),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Database configuration could not be loaded from file or environment: {}",
                e
            ))),
        }
    }
}
