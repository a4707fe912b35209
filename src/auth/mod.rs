//! Authentication module for the Amazon Ads API
//!
//! Implements the Login with Amazon authorization-code flow and keeps the
//! resulting refresh/access tokens fresh on disk.

pub mod oauth;
pub mod tokens;

pub use oauth::{authorize, login, logout, status};
pub use tokens::{JsonTokenFile, TokenStore, Tokens};

use serde::{Deserialize, Serialize};

/// Scope requested on the consent page
pub const ADS_SCOPE: &str = "advertising::campaign_management";

/// Amazon Ads API region. Each region has its own consent page, token
/// endpoint and API host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "North America (NA)", alias = "NA")]
    Na,
    #[serde(rename = "Europe (EU)", alias = "EU")]
    Eu,
    #[serde(rename = "Far East (FE)", alias = "FE")]
    Fe,
}

impl Region {
    pub fn label(self) -> &'static str {
        match self {
            Region::Na => "North America (NA)",
            Region::Eu => "Europe (EU)",
            Region::Fe => "Far East (FE)",
        }
    }

    pub fn consent_url(self) -> &'static str {
        match self {
            Region::Na => "https://www.amazon.com/ap/oa",
            Region::Eu => "https://eu.account.amazon.com/ap/oa",
            Region::Fe => "https://apac.account.amazon.com/ap/oa",
        }
    }

    pub fn token_url(self) -> &'static str {
        match self {
            Region::Na => "https://api.amazon.com/auth/o2/token",
            Region::Eu => "https://api.amazon.co.uk/auth/o2/token",
            Region::Fe => "https://api.amazon.co.jp/auth/o2/token",
        }
    }

    pub fn api_url(self) -> &'static str {
        match self {
            Region::Na => "https://advertising-api.amazon.com",
            Region::Eu => "https://advertising-api-eu.amazon.com",
            Region::Fe => "https://advertising-api-fe.amazon.com",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_serializes_with_label() {
        let json = serde_json::to_string(&Region::Eu).unwrap();
        assert_eq!(json, "\"Europe (EU)\"");
    }

    #[test]
    fn test_region_accepts_short_code() {
        let region: Region = serde_json::from_str("\"FE\"").unwrap();
        assert_eq!(region, Region::Fe);
        let region: Region = serde_json::from_str("\"North America (NA)\"").unwrap();
        assert_eq!(region, Region::Na);
    }
}
