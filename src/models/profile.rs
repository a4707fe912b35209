//! Advertising profile models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Advertiser account scope returned by `GET /v2/profiles`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub profile_id: i64,
    pub country_code: Option<String>,
    pub currency_code: Option<String>,
    pub timezone: Option<String>,
    pub account_info: AccountInfo,
    /// Fields we do not model, passed through to the web UI untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    pub marketplace_string_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Profile {
    /// `"<account name> ~ <country> ~ <account type>"`
    pub fn display_name(&self) -> String {
        format!(
            "{} ~ {} ~ {}",
            self.account_info.name.as_deref().unwrap_or("(unnamed)"),
            self.country_code.as_deref().unwrap_or("??"),
            self.account_info.account_type.as_deref().unwrap_or("unknown"),
        )
    }

    pub fn matches(&self, profile_id: &str) -> bool {
        self.profile_id.to_string() == profile_id.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE_JSON: &str = r#"{
        "profileId": 123456789,
        "countryCode": "US",
        "currencyCode": "USD",
        "dailyBudget": 999999999.0,
        "timezone": "America/Los_Angeles",
        "accountInfo": {
            "marketplaceStringId": "ATVPDKIKX0DER",
            "id": "A2EXAMPLE",
            "type": "seller",
            "name": "Widgets Inc",
            "validPaymentMethod": true
        }
    }"#;

    #[test]
    fn test_display_name() {
        let profile: Profile = serde_json::from_str(PROFILE_JSON).unwrap();
        assert_eq!(profile.display_name(), "Widgets Inc ~ US ~ seller");
        assert!(profile.matches("123456789"));
        assert!(!profile.matches("12345678"));
    }

    #[test]
    fn test_unknown_fields_pass_through() {
        let profile: Profile = serde_json::from_str(PROFILE_JSON).unwrap();
        let back = serde_json::to_value(&profile).unwrap();
        assert_eq!(back["dailyBudget"], serde_json::json!(999999999.0));
        assert_eq!(back["accountInfo"]["validPaymentMethod"], true);
        assert_eq!(back["accountInfo"]["type"], "seller");
    }
}
