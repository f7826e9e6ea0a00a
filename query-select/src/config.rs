//! Shared settings for every field a factory builds.
//!
//! Sources are merged in precedence order (later sources override earlier ones):
//! 1. Built-in defaults
//! 2. An optional TOML file
//! 3. Environment variables prefixed with `QUERY_SELECT_`

use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "QUERY_SELECT_";

/// Default quiet period before typed text becomes a search.
pub const DEFAULT_DEBOUNCE_DELAY_MS: u64 = 250;

/// Default page size (`first`) for every search query.
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// Settings shared by all selection fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectConfig {
    /// Milliseconds between the last keystroke and the search it triggers.
    pub debounce_delay_ms: u64,
    /// Number of candidates requested per search.
    pub page_size: u32,
    /// Label for a selected value whose lookup has not arrived yet.
    pub loading_label: String,
    /// Message shown when no search is running.
    pub start_typing_message: String,
    /// Message shown when a search returned nothing.
    pub no_options_message: String,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self {
            debounce_delay_ms: DEFAULT_DEBOUNCE_DELAY_MS,
            page_size: DEFAULT_PAGE_SIZE,
            loading_label: "Loading…".to_string(),
            start_typing_message: "Start typing...".to_string(),
            no_options_message: "No options".to_string(),
        }
    }
}

impl SelectConfig {
    /// Load configuration from defaults and the environment.
    pub fn load() -> Result<Self> {
        Self::extract(Self::figment())
    }

    /// Load configuration from defaults, a TOML file, and the environment.
    ///
    /// A missing file is not an error; figment treats it as empty.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading select config file");
        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX));
        Self::extract(figment)
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default())).merge(Env::prefixed(ENV_PREFIX))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        debug!(
            debounce_delay_ms = config.debounce_delay_ms,
            page_size = config.page_size,
            "select config loaded"
        );
        Ok(config)
    }

    /// The debounce delay as a [`Duration`].
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_delay_ms)
    }
}
