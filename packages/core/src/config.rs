/// Runtime configuration for the store client and UI generators
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Env var holding the remote store base URL
pub const STORE_URL_ENV: &str = "NODEFORM_STORE_URL";
pub const REQUEST_TIMEOUT_ENV: &str = "NODEFORM_REQUEST_TIMEOUT_SECS";
pub const AUTOSAVE_ENV: &str = "NODEFORM_AUTOSAVE_MS";
pub const DATE_FORMAT_ENV: &str = "NODEFORM_DATE_FORMAT";
pub const DEV_PORT_ENV: &str = "NODEFORM_DEV_PORT";

/// Configuration shared by the store client, table formatting and auto-save
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the remote store API (no trailing slash needed)
    pub store_url: String,

    /// Per-request timeout
    pub request_timeout_secs: u64,

    /// Quiet period before a debounced auto-save fires
    pub autosave_quiet_period_ms: u64,

    /// chrono format string used for date cells
    pub date_format: String,

    /// Maximum characters shown for a json cell before truncation
    pub json_preview_chars: usize,

    /// Port the dev server binds to
    pub dev_server_port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            store_url: "http://127.0.0.1:3001/api".to_string(),
            request_timeout_secs: 30,
            autosave_quiet_period_ms: 1000,
            date_format: "%-m/%-d/%Y".to_string(),
            json_preview_chars: 50,
            dev_server_port: 3001,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by any `NODEFORM_*` variables that are set and parse
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();

        if let Ok(url) = env::var(STORE_URL_ENV) {
            config.store_url = url;
        }
        if let Some(secs) = parse_env(REQUEST_TIMEOUT_ENV)? {
            config.request_timeout_secs = secs;
        }
        if let Some(ms) = parse_env(AUTOSAVE_ENV)? {
            config.autosave_quiet_period_ms = ms;
        }
        if let Ok(format) = env::var(DATE_FORMAT_ENV) {
            config.date_format = format;
        }
        if let Some(port) = parse_env(DEV_PORT_ENV)? {
            config.dev_server_port = port;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn autosave_quiet_period(&self) -> Duration {
        Duration::from_millis(self.autosave_quiet_period_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.store_url.trim().is_empty() {
            return Err("store_url cannot be empty".to_string());
        }

        if !self.store_url.starts_with("http://") && !self.store_url.starts_with("https://") {
            return Err(format!(
                "store_url must be an http(s) URL, got '{}'",
                self.store_url
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than 0".to_string());
        }

        if self.json_preview_chars == 0 {
            return Err("json_preview_chars must be greater than 0".to_string());
        }

        if self.date_format.trim().is_empty() {
            return Err("date_format cannot be empty".to_string());
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, String> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("{name} has an invalid value: '{raw}'")),
        Err(_) => Ok(None),
    }
}
