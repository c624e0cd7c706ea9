//! Application configuration
//!
//! Read from the environment. Variables:
//! - `BACKEND_API_BASE_URL` (default `http://127.0.0.1:8000`)
//! - `BOT_ID` (default `bot_test_1234`)
//! - `OCP_APIM_SUBSCRIPTION_KEY` (default empty)
//! - `MAX_TABS` (default 5)
//! - `LOG_LEVEL` (default `info`)
//! - `DEBUG` (`true` enables, case-insensitive)
//! - `REQUEST_TIMEOUT_SECS` (default 30)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::CoreError;
use crate::Result;

const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_BOT_ID: &str = "bot_test_1234";
const DEFAULT_MAX_TABS: usize = 5;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the backend session API
    pub backend_base_url: Url,
    /// Bot identifier sent with every backend request
    pub bot_id: String,
    /// API gateway subscription key
    #[serde(default, skip_serializing)]
    pub subscription_key: String,
    /// Maximum number of simultaneously open tabs
    pub max_tabs: usize,
    pub log_level: String,
    pub debug: bool,
    /// Backend request timeout
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend_base_url =
            Url::parse(&get("BACKEND_API_BASE_URL").unwrap_or_else(|| DEFAULT_BACKEND_URL.into()))?;

        let max_tabs = match get("MAX_TABS") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                CoreError::Config(format!("MAX_TABS must be a positive integer, got {raw:?}"))
            })?,
            None => DEFAULT_MAX_TABS,
        };

        let request_timeout_secs = match get("REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                CoreError::Config(format!(
                    "REQUEST_TIMEOUT_SECS must be a positive integer, got {raw:?}"
                ))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let config = Self {
            backend_base_url,
            bot_id: get("BOT_ID").unwrap_or_else(|| DEFAULT_BOT_ID.into()),
            subscription_key: get("OCP_APIM_SUBSCRIPTION_KEY").unwrap_or_default(),
            max_tabs,
            log_level: get("LOG_LEVEL")
                .map(|l| l.to_lowercase())
                .unwrap_or_else(|| "info".into()),
            debug: get("DEBUG").is_some_and(|v| v.eq_ignore_ascii_case("true")),
            request_timeout_secs,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_tabs == 0 {
            return Err(CoreError::Config("MAX_TABS must be at least 1".into()));
        }

        if self.request_timeout_secs == 0 {
            return Err(CoreError::Config(
                "REQUEST_TIMEOUT_SECS must be at least 1".into(),
            ));
        }

        if !matches!(self.backend_base_url.scheme(), "http" | "https") {
            return Err(CoreError::Config(format!(
                "Backend URL must be http or https: {}",
                self.backend_base_url
            )));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(CoreError::Config(format!(
                "Unknown log level: {}",
                self.log_level
            )));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
