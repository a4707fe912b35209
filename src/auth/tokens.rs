//! Token storage and management

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use super::Region;

/// Seconds shaved off the token lifetime before it counts as valid.
pub const EXPIRY_PADDING_SECS: i64 = 60;

/// OAuth tokens for one authorized Amazon Ads account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tokens {
    pub region: Region,
    /// Token endpoint used for refreshes
    pub url: String,
    pub refresh_token: String,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(deserialize_with = "whole_seconds")]
    pub expires_in: i64,
    /// Unix time the access token was issued
    #[serde(alias = "time", deserialize_with = "whole_seconds")]
    pub issued_at: i64,
}

/// Fields returned by a token endpoint. Absent fields leave the stored
/// value untouched.
#[derive(Debug, Default, Clone)]
pub struct TokenUpdate {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
}

// Older token files stored fractional timestamps.
fn whole_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let secs = f64::deserialize(deserializer)?;
    Ok(secs as i64)
}

pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

impl Tokens {
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_in - EXPIRY_PADDING_SECS < now - self.issued_at
    }

    /// Unix time after which the token is no longer used.
    pub fn expires_at(&self) -> i64 {
        self.issued_at + self.expires_in - EXPIRY_PADDING_SECS
    }

    /// Merge a token endpoint response into this record and restamp it.
    pub fn absorb(&mut self, update: TokenUpdate, issued_at: i64) {
        if let Some(access_token) = update.access_token {
            self.access_token = access_token;
        }
        if let Some(refresh_token) = update.refresh_token {
            self.refresh_token = refresh_token;
        }
        if let Some(token_type) = update.token_type {
            self.token_type = Some(token_type);
        }
        if let Some(expires_in) = update.expires_in {
            self.expires_in = expires_in;
        }
        self.issued_at = issued_at;
    }
}

/// Token store trait for different storage backends
pub trait TokenStore {
    fn load_tokens(&self) -> Result<Option<Tokens>>;
    fn save_tokens(&self, tokens: &Tokens) -> Result<()>;
    fn clear_tokens(&self) -> Result<()>;
}

/// Tokens kept as a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonTokenFile {
    path: PathBuf,
}

impl JsonTokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for JsonTokenFile {
    fn load_tokens(&self) -> Result<Option<Tokens>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let tokens = serde_json::from_str(&content).context("Failed to parse token file")?;
        Ok(Some(tokens))
    }

    fn save_tokens(&self, tokens: &Tokens) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).context("Failed to create token directory")?;
        }
        let content = serde_json::to_string_pretty(tokens).context("Failed to serialize tokens")?;
        fs::write(&self.path, content).context("Failed to write token file")?;

        // Restrictive permissions, the file holds a long-lived refresh token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.path, perms).context("Failed to set token permissions")?;
        }

        Ok(())
    }

    fn clear_tokens(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).context("Failed to remove token file")?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_tokens(url: &str, issued_at: i64) -> Tokens {
    Tokens {
        region: Region::Na,
        url: url.to_string(),
        refresh_token: "Atzr|refresh".to_string(),
        access_token: "Atza|access".to_string(),
        token_type: Some("bearer".to_string()),
        expires_in: 3600,
        issued_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_padding_is_expired() {
        let now = unix_now();
        let tokens = sample_tokens("https://api.amazon.com/auth/o2/token", now - 3600 + 30);
        assert!(tokens.is_expired_at(now));
    }

    #[test]
    fn test_outside_padding_is_valid() {
        let now = unix_now();
        let tokens = sample_tokens("https://api.amazon.com/auth/o2/token", now - 3600 + 120);
        assert!(!tokens.is_expired_at(now));
        assert!(!tokens.is_expired());
    }

    #[test]
    fn test_absorb_keeps_missing_fields() {
        let mut tokens = sample_tokens("https://api.amazon.com/auth/o2/token", 100);
        tokens.absorb(
            TokenUpdate {
                access_token: Some("Atza|new".into()),
                expires_in: Some(1800),
                ..TokenUpdate::default()
            },
            500,
        );
        assert_eq!(tokens.access_token, "Atza|new");
        assert_eq!(tokens.refresh_token, "Atzr|refresh");
        assert_eq!(tokens.token_type.as_deref(), Some("bearer"));
        assert_eq!(tokens.expires_in, 1800);
        assert_eq!(tokens.issued_at, 500);
        assert_eq!(tokens.expires_at(), 500 + 1800 - 60);
    }

    #[test]
    fn test_legacy_token_file_layout() {
        let json = r#"{
            "region": "North America (NA)",
            "url": "https://api.amazon.com/auth/o2/token",
            "refresh_token": "Atzr|r",
            "access_token": "Atza|a",
            "token_type": "bearer",
            "expires_in": 3600,
            "time": 1712345678.25
        }"#;
        let tokens: Tokens = serde_json::from_str(json).unwrap();
        assert_eq!(tokens.issued_at, 1712345678);
        assert_eq!(tokens.expires_in, 3600);
    }

    #[test]
    fn test_file_store_roundtrip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTokenFile::new(dir.path().join("nested").join("tokens.json"));
        assert!(store.load_tokens().unwrap().is_none());

        let tokens = sample_tokens("https://api.amazon.com/auth/o2/token", 42);
        store.save_tokens(&tokens).unwrap();
        assert_eq!(store.load_tokens().unwrap(), Some(tokens));

        store.clear_tokens().unwrap();
        assert!(!store.path().exists());
        store.clear_tokens().unwrap();
    }
}
