//! Configuration and local storage paths

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::auth::Region;

const ENV_CLIENT_ID: &str = "AMAZON_ADS_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "AMAZON_ADS_CLIENT_SECRET";

/// Path the OAuth redirect lands on, relative to `base_url`.
pub const REDIRECT_PATH: &str = "amazon-ads-api-redirect";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Login with Amazon client ID of the registered application
    pub client_id: Option<String>,
    /// Login with Amazon client secret
    pub client_secret: Option<String>,
    /// Advertising region the account lives in
    pub region: Region,
    /// Web UI bind address
    pub host: String,
    /// Web UI port
    pub port: u16,
    /// Public base URL of the web UI (defaults to http://host:port)
    pub base_url: Option<String>,
    /// Directory holding tokens.json and report-data/
    pub data_dir: Option<PathBuf>,
    /// Seconds between status polls when waiting on a report
    pub poll_interval_secs: u64,
    /// Give up after this many consecutive 429 responses (unlimited when unset)
    pub max_rate_limit_retries: Option<u32>,
    /// Override of the region API base URL (e.g. the Ads API sandbox)
    pub api_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            region: Region::Na,
            host: "127.0.0.1".to_string(),
            port: 7777,
            base_url: None,
            data_dir: None,
            poll_interval_secs: 15,
            max_rate_limit_retries: None,
            api_url: None,
        }
    }
}

/// Client credentials of the registered Login with Amazon application.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Config {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "ads-reports", "ads-reports")
            .context("Could not determine config directory")
    }

    /// Default config file path
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Load configuration from disk, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup(ENV_CLIENT_ID).filter(|v| !v.is_empty()) {
            self.client_id = Some(id);
        }
        if let Some(secret) = lookup(ENV_CLIENT_SECRET).filter(|v| !v.is_empty()) {
            self.client_secret = Some(secret);
        }
    }

    /// Client credentials, required by every call against Amazon.
    pub fn credentials(&self) -> Result<ClientCredentials> {
        let client_id = self.client_id.clone().with_context(|| {
            format!("No client_id configured (set {} or config.toml)", ENV_CLIENT_ID)
        })?;
        let client_secret = self.client_secret.clone().with_context(|| {
            format!(
                "No client_secret configured (set {} or config.toml)",
                ENV_CLIENT_SECRET
            )
        })?;
        Ok(ClientCredentials {
            client_id,
            client_secret,
        })
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.host, self.port))
    }

    /// Redirect URI registered with Login with Amazon.
    pub fn redirect_url(&self) -> String {
        crate::api::client::join_url(&[&self.base_url(), REDIRECT_PATH])
    }

    /// API base URL for the configured region, unless overridden.
    pub fn api_url(&self, region: Region) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| region.api_url().to_string())
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.data_dir().to_path_buf()),
        }
    }

    pub fn tokens_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("tokens.json"))
    }

    pub fn report_data_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("report-data"))
    }
}
