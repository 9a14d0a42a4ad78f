use planner_core::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum::{Display, EnumString};

/// Where mutations are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SyncMode {
    /// Everything lives in the local cache; no remote calls.
    Local,
    /// Today's list is owned by the REST backend, with the cache as fallback.
    Server,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub mode: SyncMode,
    pub api_base_url: String,
    pub database_url: String,
    pub access_token: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            mode: SyncMode::Local,
            api_base_url: "http://localhost:8080".to_string(),
            database_url: "sqlite://planner.db?mode=rwc".to_string(),
            access_token: None,
            request_timeout_secs: 10,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `PLANNER_*` environment variables.
    pub fn from_env() -> SyncResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> SyncResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(mode) = lookup("PLANNER_MODE") {
            config.mode = mode.trim().parse().map_err(|_| {
                SyncError::Configuration(format!(
                    "PLANNER_MODE must be 'local' or 'server', got {mode:?}"
                ))
            })?;
        }
        if let Some(url) = lookup("PLANNER_API_URL") {
            config.api_base_url = url;
        }
        if let Some(url) = lookup("PLANNER_DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(token) = lookup("PLANNER_ACCESS_TOKEN").filter(|t| !t.trim().is_empty()) {
            config.access_token = Some(token);
        }
        if let Some(secs) = lookup("PLANNER_TIMEOUT_SECS") {
            config.request_timeout_secs = secs.trim().parse().map_err(|_| {
                SyncError::Configuration(format!("PLANNER_TIMEOUT_SECS is not a number: {secs:?}"))
            })?;
        }

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
