//! Login with Amazon authorization-code flow and token refresh

use anyhow::{Context, Result};
use oauth2::{
    basic::BasicClient, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};

use super::tokens::{unix_now, TokenUpdate};
use super::{JsonTokenFile, Region, TokenStore, Tokens, ADS_SCOPE};
use crate::config::{ClientCredentials, Config};

/// Build the OAuth2 client. Amazon expects the client credentials in the
/// form body rather than a basic auth header.
fn build_client(
    creds: &ClientCredentials,
    auth_url: &str,
    token_url: &str,
    redirect_uri: Option<&str>,
) -> Result<BasicClient> {
    let client = BasicClient::new(
        ClientId::new(creds.client_id.clone()),
        Some(ClientSecret::new(creds.client_secret.clone())),
        AuthUrl::new(auth_url.to_string())?,
        Some(TokenUrl::new(token_url.to_string())?),
    )
    .set_auth_type(AuthType::RequestBody);

    match redirect_uri {
        Some(uri) => Ok(client.set_redirect_uri(
            RedirectUrl::new(uri.to_string()).context("Invalid redirect URI")?,
        )),
        None => Ok(client),
    }
}

/// Consent page URL for `region`. Returns the URL and the CSRF state it
/// carries.
pub fn consent_url(
    creds: &ClientCredentials,
    region: Region,
    redirect_uri: &str,
) -> Result<(String, String)> {
    let client = build_client(
        creds,
        region.consent_url(),
        region.token_url(),
        Some(redirect_uri),
    )?;
    let (url, state) = client
        .authorize_url(CsrfToken::new_random)
        .add_scope(Scope::new(ADS_SCOPE.to_string()))
        .url();
    Ok((url.to_string(), state.secret().clone()))
}

/// Exchange an authorization code from the consent redirect for tokens.
pub async fn exchange_code(
    creds: &ClientCredentials,
    region: Region,
    code: &str,
    redirect_uri: &str,
) -> Result<Tokens> {
    exchange_code_at(creds, region, region.token_url(), code, redirect_uri).await
}

async fn exchange_code_at(
    creds: &ClientCredentials,
    region: Region,
    token_url: &str,
    code: &str,
    redirect_uri: &str,
) -> Result<Tokens> {
    let client = build_client(creds, region.consent_url(), token_url, Some(redirect_uri))?;

    tracing::info!("Exchanging authorization code at {}", token_url);

    let token_response = client
        .exchange_code(AuthorizationCode::new(code.to_string()))
        .request_async(oauth2::reqwest::async_http_client)
        .await
        .context("Failed to exchange authorization code")?;

    let refresh_token = token_response
        .refresh_token()
        .context("Token response missing refresh_token")?;
    let token_type: &str = token_response.token_type().as_ref();

    Ok(Tokens {
        region,
        url: token_url.to_string(),
        refresh_token: refresh_token.secret().clone(),
        access_token: token_response.access_token().secret().clone(),
        token_type: Some(token_type.to_string()),
        expires_in: token_response
            .expires_in()
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default(),
        issued_at: unix_now(),
    })
}

/// Exchange the refresh token for a new access token, updating `tokens`
/// in place.
pub async fn refresh(tokens: &mut Tokens, creds: &ClientCredentials) -> Result<()> {
    let client = build_client(creds, tokens.region.consent_url(), &tokens.url, None)?;

    tracing::info!("Refreshing access token...");

    let token_response = client
        .exchange_refresh_token(&RefreshToken::new(tokens.refresh_token.clone()))
        .request_async(oauth2::reqwest::async_http_client)
        .await
        .context("Failed to refresh access token")?;
    let token_type: &str = token_response.token_type().as_ref();

    tokens.absorb(
        TokenUpdate {
            access_token: Some(token_response.access_token().secret().clone()),
            refresh_token: token_response.refresh_token().map(|t| t.secret().clone()),
            token_type: Some(token_type.to_string()),
            expires_in: token_response.expires_in().map(|d| d.as_secs() as i64),
        },
        unix_now(),
    );
    Ok(())
}

/// Refresh and persist `tokens` if they are inside the expiry padding.
/// Returns whether a refresh happened.
pub async fn refresh_if_expired(
    tokens: &mut Tokens,
    creds: &ClientCredentials,
    store: &impl TokenStore,
) -> Result<bool> {
    if !tokens.is_expired() {
        return Ok(false);
    }
    refresh(tokens, creds).await?;
    store.save_tokens(tokens)?;
    Ok(true)
}

/// Print the consent URL to start the OAuth flow
pub async fn login(config: &Config) -> Result<()> {
    let creds = config.credentials()?;
    let redirect = config.redirect_url();
    let (url, _state) = consent_url(&creds, config.region, &redirect)?;

    println!();
    println!("To authorize, visit:");
    println!("  {}", url);
    println!();
    println!("Amazon redirects to {} with a `code` parameter.", redirect);
    println!("Either keep `ads-reports serve` running, or pass the code to");
    println!("`ads-reports authorize --code <code>`.");
    Ok(())
}

/// Exchange a pasted authorization code and save the tokens
pub async fn authorize(config: &Config, code: &str) -> Result<()> {
    let creds = config.credentials()?;
    let tokens = exchange_code(&creds, config.region, code, &config.redirect_url()).await?;
    let store = JsonTokenFile::new(config.tokens_path()?);
    store.save_tokens(&tokens)?;
    println!("Authorized. Tokens saved to {}", store.path().display());
    Ok(())
}

/// Remove stored tokens
pub async fn logout(config: &Config) -> Result<()> {
    JsonTokenFile::new(config.tokens_path()?).clear_tokens()?;
    println!("Logged out.");
    Ok(())
}

/// Display current auth status
pub async fn status(config: &Config) -> Result<()> {
    let store = JsonTokenFile::new(config.tokens_path()?);

    match store.load_tokens()? {
        Some(tokens) => {
            println!("Region:       {}", tokens.region);
            println!("Token file:   {}", store.path().display());
            if tokens.is_expired() {
                println!("Access token: expired (refreshed on next call)");
            } else {
                println!("Access token: valid");
                println!("  expires_at: {}", tokens.expires_at());
            }
            println!("Refresh tok:  present");
        }
        None => {
            println!("Not authorized.");
            println!("\nRun 'ads-reports login' to authenticate.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tokens::sample_tokens;
    use crate::test_support::spawn_server;
    use axum::{routing::post, Form, Json, Router};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    fn creds() -> ClientCredentials {
        ClientCredentials {
            client_id: "amzn1.application-oa2-client.test".into(),
            client_secret: "shh".into(),
        }
    }

    type Seen = Arc<Mutex<Vec<HashMap<String, String>>>>;

    async fn token_server(response: serde_json::Value) -> (String, Seen) {
        let seen: Seen = Arc::default();
        let recorded = seen.clone();
        let app = Router::new().route(
            "/auth/o2/token",
            post(move |Form(form): Form<HashMap<String, String>>| {
                let recorded = recorded.clone();
                let response = response.clone();
                async move {
                    recorded.lock().unwrap().push(form);
                    Json(response)
                }
            }),
        );
        let base = spawn_server(app).await;
        (format!("{}/auth/o2/token", base), seen)
    }

    #[test]
    fn test_consent_url_params() {
        let (url, state) =
            consent_url(&creds(), Region::Eu, "http://127.0.0.1:7777/amazon-ads-api-redirect")
                .unwrap();
        let parsed = url::Url::parse(&url).unwrap();
        assert_eq!(parsed.host_str(), Some("eu.account.amazon.com"));
        assert_eq!(parsed.path(), "/ap/oa");

        let params: HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "amzn1.application-oa2-client.test");
        assert_eq!(params["scope"], "advertising::campaign_management");
        assert_eq!(params["response_type"], "code");
        assert_eq!(
            params["redirect_uri"],
            "http://127.0.0.1:7777/amazon-ads-api-redirect"
        );
        assert_eq!(params["state"], state);
    }

    #[tokio::test]
    async fn test_refresh_keeps_refresh_token_when_omitted() {
        let (token_url, seen) = token_server(serde_json::json!({
            "access_token": "Atza|fresh",
            "token_type": "bearer",
            "expires_in": 3600
        }))
        .await;

        let mut tokens = sample_tokens(&token_url, 0);
        assert!(tokens.is_expired());
        refresh(&mut tokens, &creds()).await.unwrap();

        assert_eq!(tokens.access_token, "Atza|fresh");
        assert_eq!(tokens.refresh_token, "Atzr|refresh");
        assert!(!tokens.is_expired());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["grant_type"], "refresh_token");
        assert_eq!(seen[0]["refresh_token"], "Atzr|refresh");
        assert_eq!(seen[0]["client_secret"], "shh");
    }

    #[tokio::test]
    async fn test_refresh_if_expired_skips_valid_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTokenFile::new(dir.path().join("tokens.json"));
        let mut tokens = sample_tokens("http://127.0.0.1:9/unreachable", unix_now());

        let refreshed = refresh_if_expired(&mut tokens, &creds(), &store)
            .await
            .unwrap();
        assert!(!refreshed);
        assert!(store.load_tokens().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_if_expired_persists() {
        let (token_url, _seen) = token_server(serde_json::json!({
            "access_token": "Atza|fresh",
            "refresh_token": "Atzr|rotated",
            "token_type": "bearer",
            "expires_in": 3600
        }))
        .await;
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTokenFile::new(dir.path().join("tokens.json"));
        let mut tokens = sample_tokens(&token_url, 0);

        assert!(refresh_if_expired(&mut tokens, &creds(), &store)
            .await
            .unwrap());
        let saved = store.load_tokens().unwrap().unwrap();
        assert_eq!(saved.refresh_token, "Atzr|rotated");
        assert_eq!(saved, tokens);
    }

    #[tokio::test]
    async fn test_exchange_code_builds_tokens() {
        let (token_url, seen) = token_server(serde_json::json!({
            "access_token": "Atza|a",
            "refresh_token": "Atzr|r",
            "token_type": "bearer",
            "expires_in": 3600
        }))
        .await;

        let tokens = exchange_code_at(
            &creds(),
            Region::Na,
            &token_url,
            "ANcode",
            "http://127.0.0.1:7777/amazon-ads-api-redirect",
        )
        .await
        .unwrap();

        assert_eq!(tokens.url, token_url);
        assert_eq!(tokens.refresh_token, "Atzr|r");
        assert_eq!(tokens.expires_in, 3600);
        assert_eq!(tokens.token_type.as_deref(), Some("bearer"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0]["grant_type"], "authorization_code");
        assert_eq!(seen[0]["code"], "ANcode");
        assert_eq!(
            seen[0]["redirect_uri"],
            "http://127.0.0.1:7777/amazon-ads-api-redirect"
        );
    }
}
