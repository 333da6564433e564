use anyhow::Result;
use config::{Config, ConfigBuilder, builder::DefaultState};
use serde::Deserialize;

use crate::constants::{
    CONFIG_FILE_NAME, DEFAULT_LOG_LEVEL, DEFAULT_LOOKAHEAD_DAYS, ENV_PREFIX,
};
use crate::error::CoreError;
use crate::types::DefaultEndPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub logging: LoggingConfig,
    pub expansion: ExpansionConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpansionConfig {
    /// Horizon for `recurrences()` calls that carry no explicit end.
    pub lookahead_days: u32,
    /// Caps the instances of one expansion; unset means no cap.
    #[serde(default)]
    pub max_instances: Option<u16>,
    #[serde(default)]
    pub timed_default_end: DefaultEndPolicy,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceConfig {
    /// Calendar files to read when none are given on the command line.
    #[serde(default)]
    pub paths: Vec<String>,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from environment variables and an optional
    /// `config.toml` into a `Settings`.
    ///
    /// ## Errors
    /// Returns an error if building the configuration, deserializing it, or
    /// validating the result fails.
    pub fn load() -> Result<Self> {
        let settings = defaults()?
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("source.paths"),
            )
            .add_source(config::File::with_name(CONFIG_FILE_NAME).required(false))
            .build()?
            .try_deserialize::<Settings>()?;

        settings.validate()?;
        Ok(settings)
    }

    /// ## Summary
    /// Builds settings from defaults overlaid with a TOML document.
    ///
    /// ## Errors
    /// Returns an error if the TOML is malformed or the values are invalid.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let settings = defaults()?
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize::<Settings>()?;

        settings.validate()?;
        Ok(settings)
    }

    /// ## Errors
    /// Returns [`CoreError::ValidationError`] when an expansion bound is zero.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.expansion.lookahead_days == 0 {
            return Err(CoreError::ValidationError(
                "expansion.lookahead_days must be greater than zero".to_string(),
            ));
        }
        if self.expansion.max_instances == Some(0) {
            return Err(CoreError::ValidationError(
                "expansion.max_instances must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>> {
    Ok(Config::builder()
        .set_default("logging.level", DEFAULT_LOG_LEVEL)?
        .set_default("expansion.lookahead_days", i64::from(DEFAULT_LOOKAHEAD_DAYS))?
        .set_default(
            "expansion.timed_default_end",
            DefaultEndPolicy::default().as_str(),
        )?)
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    if let Err(error) = dotenvy::dotenv() {
        tracing::trace!(%error, "No .env file loaded");
    }

    Settings::load()
}
