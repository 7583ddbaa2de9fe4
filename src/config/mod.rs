//! Configuration management for the edge interdiction service.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file
//! (`CONFIG_FILE`, default `config/default.toml`), then `EDGE__`-prefixed
//! environment variables such as `EDGE__RATE_LIMIT__MAX_REQUESTS=100`.
//! List values in the environment are comma separated.

use std::env;

use config::{Config as ConfigBuilder, ConfigError, Environment, File, Source};
use thiserror::Error;

use crate::core::{Classifier, ClassifierError};
use crate::models::Config;

/// Errors that abort start-up
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Source(#[from] ConfigError),
    #[error("invalid classifier configuration: {0}")]
    Classifier(#[from] ClassifierError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

const LIST_KEYS: [&str; 5] = [
    "classifier.blocked_path_substrings",
    "classifier.suspicious_agent_substrings",
    "classifier.decoy_get_paths",
    "classifier.decoy_post_paths",
    "classifier.attack_patterns",
];

/// Load and validate configuration from the file and the environment
pub fn load_config() -> Result<Config, ConfigLoadError> {
    let config_file =
        env::var("CONFIG_FILE").unwrap_or_else(|_| "config/default.toml".to_string());

    load_from(
        File::with_name(&config_file).required(false),
        Environment::with_prefix("EDGE"),
    )
}

fn load_from<F>(file: F, environment: Environment) -> Result<Config, ConfigLoadError>
where
    F: Source + Send + Sync + 'static,
{
    let environment = LIST_KEYS.iter().fold(
        environment
            .separator("__")
            .try_parsing(true)
            .list_separator(","),
        |environment, key| environment.with_list_parse_key(key),
    );

    let config: Config = ConfigBuilder::builder()
        .add_source(file)
        .add_source(environment)
        .build()?
        .try_deserialize()?;

    validate(&config)?;
    Ok(config)
}

/// Reject configurations the service cannot run with
pub fn validate(config: &Config) -> Result<(), ConfigLoadError> {
    if config.rate_limit.window_seconds == 0 {
        return Err(ConfigLoadError::Invalid(
            "rate_limit.window_seconds must be greater than zero".to_string(),
        ));
    }
    if config.rate_limit.max_requests == 0 {
        return Err(ConfigLoadError::Invalid(
            "rate_limit.max_requests must be greater than zero".to_string(),
        ));
    }
    if config.rate_limit.cleanup_interval_seconds == 0 {
        return Err(ConfigLoadError::Invalid(
            "rate_limit.cleanup_interval_seconds must be greater than zero".to_string(),
        ));
    }
    if config.event_store.capacity == 0 {
        return Err(ConfigLoadError::Invalid(
            "event_store.capacity must be greater than zero".to_string(),
        ));
    }
    if config.event_store.recent_limit == 0 {
        return Err(ConfigLoadError::Invalid(
            "event_store.recent_limit must be greater than zero".to_string(),
        ));
    }

    let honeypot = &config.honeypot;
    for (name, range) in [
        ("decoy_get", honeypot.decoy_get),
        ("decoy_post", honeypot.decoy_post),
        ("script_catch_all", honeypot.script_catch_all),
        ("attack_pattern", honeypot.attack_pattern),
    ] {
        if !range.is_valid() {
            return Err(ConfigLoadError::Invalid(format!(
                "honeypot.{} has min_ms {} above max_ms {}",
                name, range.min_ms, range.max_ms
            )));
        }
    }

    Classifier::from_config(&config.classifier)?;
    Ok(())
}
