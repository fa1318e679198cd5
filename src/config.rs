//! Runtime configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::DEFAULT_STORAGE_KEY;

pub const ENV_STORE_PATH: &str = "REDIRECT_STORE_PATH";
pub const ENV_STORAGE_KEY: &str = "REDIRECT_STORAGE_KEY";
pub const ENV_PAGE_SIZE: &str = "REDIRECT_PAGE_SIZE";
pub const ENV_EVENT_CAPACITY: &str = "REDIRECT_EVENT_CAPACITY";
pub const ENV_LOG: &str = "REDIRECT_LOG";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backing file of the rule store; `None` keeps rules in memory.
    pub store_path: Option<PathBuf>,
    /// Key holding the record list inside the store document.
    pub storage_key: String,
    /// Records per page in [`RuleBook::view()`](crate::RuleBook::view).
    pub page_size: usize,
    /// Buffered change events per subscriber.
    pub event_capacity: usize,
    /// `tracing-subscriber` filter directive.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: None,
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            page_size: 5,
            event_capacity: 64,
            log_filter: "domain_redirect=info".to_owned(),
        }
    }
}

impl Config {
    /// Build a config from the process environment. Unset variables keep
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a numeric variable does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = lookup(ENV_STORE_PATH).filter(|v| !v.is_empty()) {
            config.store_path = Some(PathBuf::from(path));
        }
        if let Some(key) = lookup(ENV_STORAGE_KEY).filter(|v| !v.is_empty()) {
            config.storage_key = key;
        }
        if let Some(value) = lookup(ENV_PAGE_SIZE) {
            config.page_size = positive(ENV_PAGE_SIZE, value)?;
        }
        if let Some(value) = lookup(ENV_EVENT_CAPACITY) {
            config.event_capacity = positive(ENV_EVENT_CAPACITY, value)?;
        }
        if let Some(filter) = lookup(ENV_LOG).filter(|v| !v.is_empty()) {
            config.log_filter = filter;
        }
        Ok(config)
    }
}

fn positive(var: &'static str, value: String) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber { var, value }),
    }
}
