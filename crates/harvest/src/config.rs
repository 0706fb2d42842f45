//! Harvest settings
//!
//! Loaded from (in order of priority):
//! 1. An explicit JSON file path
//! 2. `~/.config/harvest/harvest.json`
//!
//! Secrets may be left out of the file and supplied through the
//! `HARVEST_PASSWORD` / `HARVEST_ACCESS_TOKEN` environment variables, which
//! override the file when set.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::checkpoint::{FolderSyncTokenStore, LastSyncStore};
use crate::ews::EwsAuth;
use crate::sync::{RunConfig, SyncMode};

/// Settings filename in the harvest config directory
const SETTINGS_FILE: &str = "harvest.json";

/// Default checkpoint database filename in the harvest config directory
const CHECKPOINT_DB_FILE: &str = "checkpoints.sqlite";

const PASSWORD_ENV: &str = "HARVEST_PASSWORD";
const ACCESS_TOKEN_ENV: &str = "HARVEST_ACCESS_TOKEN";

fn default_true() -> bool {
    true
}

fn default_folder_id_page_size() -> i64 {
    100
}

fn default_item_detail_page_size() -> i64 {
    50
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Clone, Deserialize)]
pub struct HarvestSettings {
    /// EWS endpoint, e.g. `https://mail.example.com/EWS/Exchange.asmx`
    pub endpoint: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// OAuth bearer token; takes precedence over basic auth
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_true")]
    pub impersonate: bool,
    #[serde(default)]
    pub mailboxes: Vec<String>,
    #[serde(default = "default_folder_id_page_size")]
    pub folder_id_page_size: i64,
    #[serde(default = "default_item_detail_page_size")]
    pub item_detail_page_size: i64,
    #[serde(default)]
    pub sync_mode: SyncMode,
    #[serde(default)]
    pub checkpoint_db: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl HarvestSettings {
    /// Load settings from `path`, or from the default config file when `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let settings: Self = config::load_json(SETTINGS_FILE)?;
                Ok(settings.with_env_overrides())
            }
        }
    }

    /// Load settings from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let settings: Self = config::load_json_file(path)?;
        Ok(settings.with_env_overrides())
    }

    /// Parse settings from a JSON string, without environment overrides
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse harvest settings JSON")
    }

    fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Replace secrets with non-empty values from `lookup`
    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(password) = lookup(PASSWORD_ENV).filter(|v| !v.is_empty()) {
            self.password = Some(password);
        }
        if let Some(token) = lookup(ACCESS_TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.access_token = Some(token);
        }
        self
    }

    /// Credentials to present; a bearer token wins over basic auth
    pub fn auth(&self) -> Result<EwsAuth> {
        if let Some(token) = self.access_token.as_deref().filter(|t| !t.is_empty()) {
            return Ok(EwsAuth::Bearer(token.to_string()));
        }

        let username = self
            .username
            .clone()
            .context("Settings need either access_token or username")?;
        let password = self
            .password
            .clone()
            .with_context(|| format!("No password for {} (set {})", username, PASSWORD_ENV))?;
        Ok(EwsAuth::Basic { username, password })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Checkpoint database path, falling back to the config directory
    pub fn checkpoint_db_path(&self) -> Result<PathBuf> {
        match &self.checkpoint_db {
            Some(path) => Ok(path.clone()),
            None => config::config_path(CHECKPOINT_DB_FILE),
        }
    }

    /// Run configuration backed by the given checkpoint stores
    pub fn run_config(
        &self,
        last_sync_store: Arc<dyn LastSyncStore>,
        folder_sync_token_store: Arc<dyn FolderSyncTokenStore>,
    ) -> RunConfig {
        RunConfig::new(
            self.folder_id_page_size,
            self.item_detail_page_size,
            last_sync_store,
            folder_sync_token_store,
        )
        .with_mode(self.sync_mode)
    }
}

impl std::fmt::Debug for HarvestSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarvestSettings")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("impersonate", &self.impersonate)
            .field("mailboxes", &self.mailboxes)
            .field("folder_id_page_size", &self.folder_id_page_size)
            .field("item_detail_page_size", &self.item_detail_page_size)
            .field("sync_mode", &self.sync_mode)
            .field("checkpoint_db", &self.checkpoint_db)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}
