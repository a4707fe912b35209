//! Authenticated HTTP client for the Amazon Ads API
//!
//! Wraps reqwest::Client with automatic token refresh, Amazon Ads headers
//! and 429 handling.

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};

use super::error::ApiError;
use super::rate_limit::send_with_retry;
use crate::auth::{oauth, JsonTokenFile, TokenStore, Tokens};
use crate::config::{ClientCredentials, Config};

// Amazon-Advertising-API-ClientID / Amazon-Advertising-API-Scope
const CLIENT_ID_HEADER: &str = "amazon-advertising-api-clientid";
const SCOPE_HEADER: &str = "amazon-advertising-api-scope";

/// Join URL fragments with exactly one slash between neighbours.
pub fn join_url(parts: &[&str]) -> String {
    let mut iter = parts.iter();
    let mut joined = iter.next().map(|s| s.to_string()).unwrap_or_default();
    for part in iter {
        match (joined.ends_with('/'), part.starts_with('/')) {
            (true, true) => joined.push_str(&part[1..]),
            (false, false) => {
                joined.push('/');
                joined.push_str(part);
            }
            _ => joined.push_str(part),
        }
    }
    joined
}

/// Client for one authorized account.
pub struct AdsClient {
    http: reqwest::Client,
    creds: ClientCredentials,
    api_url: String,
    tokens: Tokens,
    store: JsonTokenFile,
    max_rate_limit_retries: Option<u32>,
}

impl AdsClient {
    /// Build a client from the stored token file.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = JsonTokenFile::new(config.tokens_path()?);
        let tokens = store
            .load_tokens()?
            .context("Not authorized. Run 'ads-reports login' first.")?;
        Self::new(config, tokens, store)
    }

    pub fn new(config: &Config, tokens: Tokens, store: JsonTokenFile) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            creds: config.credentials()?,
            api_url: config.api_url(tokens.region),
            tokens,
            store,
            max_rate_limit_retries: config.max_rate_limit_retries,
        })
    }

    /// Plain HTTP client, for signed URLs that must not carry our headers.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn url(&self, path: &str) -> String {
        join_url(&[&self.api_url, path])
    }

    /// Headers for an authenticated call, refreshing the access token first
    /// when it is about to expire.
    async fn auth_headers(
        &mut self,
        profile_id: Option<&str>,
        media_type: Option<&str>,
    ) -> Result<HeaderMap> {
        oauth::refresh_if_expired(&mut self.tokens, &self.creds, &self.store).await?;

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(CLIENT_ID_HEADER),
            HeaderValue::from_str(&self.creds.client_id).context("Invalid client_id")?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.tokens.access_token))
                .context("Invalid access token")?,
        );
        if let Some(profile_id) = profile_id {
            headers.insert(
                HeaderName::from_static(SCOPE_HEADER),
                HeaderValue::from_str(profile_id).context("Invalid profile id")?,
            );
        }
        if let Some(media_type) = media_type {
            let value = HeaderValue::from_str(media_type).context("Invalid media type")?;
            headers.insert(CONTENT_TYPE, value.clone());
            headers.insert(ACCEPT, value);
        }
        Ok(headers)
    }

    /// GET an API path, retrying on 429.
    pub async fn get(
        &mut self,
        path: &str,
        profile_id: Option<&str>,
        media_type: Option<&str>,
    ) -> Result<Response> {
        let headers = self.auth_headers(profile_id, media_type).await?;
        let url = self.url(path);
        tracing::debug!("Ads GET {}", url);

        let resp = send_with_retry(
            || self.http.get(&url).headers(headers.clone()),
            self.max_rate_limit_retries,
        )
        .await
        .with_context(|| format!("Ads GET {} failed", url))?;

        check_response(resp, &url).await
    }

    /// POST a JSON body to an API path, retrying on 429.
    pub async fn post(
        &mut self,
        path: &str,
        profile_id: Option<&str>,
        media_type: &str,
        body: &serde_json::Value,
    ) -> Result<Response> {
        let headers = self.auth_headers(profile_id, Some(media_type)).await?;
        let url = self.url(path);
        let body = serde_json::to_vec(body).context("Failed to encode request body")?;
        tracing::debug!("Ads POST {}", url);

        let resp = send_with_retry(
            || {
                self.http
                    .post(&url)
                    .headers(headers.clone())
                    .body(body.clone())
            },
            self.max_rate_limit_retries,
        )
        .await
        .with_context(|| format!("Ads POST {} failed", url))?;

        check_response(resp, &url).await
    }
}

/// Check HTTP response status code and return a clear error on failure.
pub async fn check_response(resp: Response, url: &str) -> Result<Response> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized {
            url: url.to_string(),
        }
        .into());
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            url: url.to_string(),
            body,
        }
        .into());
    }
    Ok(resp)
}

#[cfg(test)]
pub(crate) fn test_client(api_url: &str, data_dir: &std::path::Path) -> AdsClient {
    let config = Config {
        client_id: Some("amzn1.application-oa2-client.test".into()),
        client_secret: Some("shh".into()),
        api_url: Some(api_url.to_string()),
        data_dir: Some(data_dir.to_path_buf()),
        ..Config::default()
    };
    let tokens = crate::auth::tokens::sample_tokens(
        "http://127.0.0.1:9/auth/o2/token",
        crate::auth::tokens::unix_now(),
    );
    let store = JsonTokenFile::new(data_dir.join("tokens.json"));
    AdsClient::new(&config, tokens, store).unwrap()
}
