//! Profiles endpoint (/v2/profiles)

use anyhow::{Context, Result};

use super::client::AdsClient;
use crate::models::Profile;

/// Fetch every advertising profile the tokens can access.
pub async fn fetch_profiles(client: &mut AdsClient) -> Result<Vec<Profile>> {
    let resp = client.get("/v2/profiles", None, None).await?;
    let profiles: Vec<Profile> = resp
        .json()
        .await
        .context("Failed to parse profiles response")?;
    tracing::info!(count = profiles.len(), "Fetched profiles");
    Ok(profiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::test_client;
    use crate::test_support::spawn_server;
    use axum::{http::HeaderMap, routing::get, Json, Router};

    #[tokio::test]
    async fn test_fetch_profiles_without_scope_header() {
        let app = Router::new().route(
            "/v2/profiles",
            get(|headers: HeaderMap| async move {
                assert!(headers.get("amazon-advertising-api-scope").is_none());
                Json(serde_json::json!([
                    {"profileId": 1, "countryCode": "US",
                     "accountInfo": {"type": "seller", "name": "One"}},
                    {"profileId": 2, "countryCode": "DE",
                     "accountInfo": {"type": "vendor", "name": "Two"}}
                ]))
            }),
        );
        let base = spawn_server(app).await;
        let dir = tempfile::tempdir().unwrap();
        let mut client = test_client(&base, dir.path());

        let profiles = fetch_profiles(&mut client).await.unwrap();
        let names: Vec<String> = profiles.iter().map(Profile::display_name).collect();
        assert_eq!(names, vec!["One ~ US ~ seller", "Two ~ DE ~ vendor"]);
    }
}
