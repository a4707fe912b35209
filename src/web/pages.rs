//! Server-rendered pages and bundled static files

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use super::{load_client, AppState, Session};
use crate::api::client::AdsClient;
use crate::auth::{oauth, JsonTokenFile, TokenStore};
use crate::config::Config;

const TEMPLATE: &str = include_str!("static/template.html");
const PROFILES_BODY: &str = include_str!("static/profiles.html");
const REPORTS_BODY: &str = include_str!("static/reports.html");
const STYLE_CSS: &str = include_str!("static/style.css");
const APP_JS: &str = include_str!("static/app.js");

fn render(title: &str, body: &str) -> String {
    TEMPLATE
        .replace("{{title}}", &escape(title))
        .replace("{{body}}", body)
}

fn page(status: StatusCode, title: &str, body: &str) -> Response {
    (status, Html(render(title, body))).into_response()
}

fn message_page(status: StatusCode, title: &str, message: &str) -> Response {
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n<p><a href=\"/\">Back to start</a></p>",
        escape(title),
        escape(message)
    );
    page(status, title, &body)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub(super) async fn index(State(state): State<AppState>) -> Response {
    let mut session = state.session.lock().await;
    match index_body(&state.config, &mut session) {
        Ok(body) => page(StatusCode::OK, "Amazon Ads Reports", &body),
        Err(err) => {
            tracing::error!("Failed to render home page: {:#}", err);
            message_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong",
                &format!("{:#}", err),
            )
        }
    }
}

fn index_body(config: &Config, session: &mut Session) -> Result<String> {
    let authorized = load_client(&mut session.client, config)?.is_some();

    let creds = match config.credentials() {
        Ok(creds) => creds,
        Err(err) => {
            return Ok(format!(
                "<h1>Amazon Ads Reports</h1>\n\
                 <p class=\"warning\">{}</p>\n\
                 <p>Register a Login with Amazon application with the allowed return URL \
                 <code>{}</code>, then put its client ID and secret in the config file \
                 and restart.</p>",
                escape(&format!("{:#}", err)),
                escape(&config.redirect_url())
            ))
        }
    };

    let (consent_url, csrf_state) =
        oauth::consent_url(&creds, config.region, &config.redirect_url())?;
    session.remember_state(csrf_state);

    let (button, status) = if authorized {
        (
            "Refresh Tokens",
            "<p>Authorized. <a href=\"/reports\">Go to reports</a></p>",
        )
    } else {
        (
            "Authorize Amazon Ads",
            "<p>Not authorized yet. Sign in with the Amazon account that manages your ads.</p>",
        )
    };

    Ok(format!(
        "<h1>Amazon Ads Reports</h1>\n\
         <p>Region: {}</p>\n{}\n\
         <p><a class=\"button\" href=\"{}\">{}</a></p>",
        escape(config.region.label()),
        status,
        escape(&consent_url),
        button
    ))
}

#[derive(Debug, Deserialize)]
pub(super) struct RedirectParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

pub(super) async fn amazon_redirect(
    State(state): State<AppState>,
    Query(params): Query<RedirectParams>,
) -> Response {
    if let Some(error) = params.error {
        let detail = params.error_description.unwrap_or(error);
        return message_page(StatusCode::BAD_REQUEST, "Authorization denied", &detail);
    }
    let Some(code) = params.code else {
        return message_page(
            StatusCode::OK,
            "Nothing to do here",
            "Amazon sends you to this page after you authorize the application. \
             Start from the home page to authorize.",
        );
    };

    let mut session = state.session.lock().await;
    if !session.accepts_state(params.state.as_deref()) {
        tracing::warn!("OAuth redirect with mismatching state rejected");
        return message_page(
            StatusCode::BAD_REQUEST,
            "Authorization rejected",
            "The state parameter does not match this session. Start again from the home page.",
        );
    }

    match store_authorization(&state.config, &mut session, &code).await {
        Ok(()) => {
            session.forget_state(params.state.as_deref());
            page(
                StatusCode::OK,
                "Authorized",
                "<h1>Authorized</h1>\n<p>Tokens saved.</p>\n\
                 <p><a href=\"/reports\">Continue to reports</a></p>",
            )
        }
        Err(err) => {
            tracing::error!("Authorization code exchange failed: {:#}", err);
            message_page(
                StatusCode::BAD_GATEWAY,
                "Authorization failed",
                &format!("{:#}", err),
            )
        }
    }
}

async fn store_authorization(config: &Config, session: &mut Session, code: &str) -> Result<()> {
    let creds = config.credentials()?;
    let tokens =
        oauth::exchange_code(&creds, config.region, code, &config.redirect_url()).await?;
    let store = JsonTokenFile::new(config.tokens_path()?);
    store.save_tokens(&tokens)?;
    tracing::info!("Tokens saved to {}", store.path().display());

    session.client = Some(AdsClient::new(config, tokens, store)?);
    session.profiles.clear();
    session.profile_id = None;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub(super) struct ReportsParams {
    #[serde(rename = "profile-html")]
    profile_html: Option<String>,
}

pub(super) async fn reports(
    State(state): State<AppState>,
    Query(params): Query<ReportsParams>,
) -> Response {
    let mut session = state.session.lock().await;
    let authorized = match load_client(&mut session.client, &state.config) {
        Ok(client) => client.is_some(),
        Err(err) => {
            tracing::error!("Failed to load tokens: {:#}", err);
            false
        }
    };
    if !authorized {
        return message_page(
            StatusCode::OK,
            "Not authorized",
            "Authorize the application on the home page first.",
        );
    }

    let pick_profile =
        session.profile_id.is_none() || params.profile_html.as_deref() == Some("yes");
    if pick_profile {
        page(StatusCode::OK, "Select a profile", PROFILES_BODY)
    } else {
        page(StatusCode::OK, "Reports", REPORTS_BODY)
    }
}

pub(super) async fn reports_api() -> Response {
    page(
        StatusCode::OK,
        "Reports API",
        "<h1>Reports API</h1>\n\
         <p>POST a JSON object with an <code>operation</code> field to this URL. \
         Operations: <code>profiles</code>, <code>select-profile</code>, \
         <code>profile-name</code>, <code>available-reports</code>, <code>reports</code>, \
         <code>get-values</code>, <code>request-report</code>, <code>report-status</code>, \
         <code>download-report</code>.</p>",
    )
}

pub(super) async fn static_file(Path(file): Path<String>) -> Response {
    let (content_type, content) = match file.as_str() {
        "style.css" => ("text/css; charset=utf-8", STYLE_CSS),
        "app.js" => ("text/javascript; charset=utf-8", APP_JS),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    ([(CONTENT_TYPE, content_type)], content).into_response()
}

#[cfg(test)]
mod tests {
    use super::super::{router, tests::test_config};
    use super::*;
    use crate::test_support::spawn_server;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("https://a.com/?x=1&y=\"2\""),
            "https://a.com/?x=1&amp;y=&quot;2&quot;"
        );
    }

    #[tokio::test]
    async fn test_index_offers_consent() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(test_config(dir.path(), "http://127.0.0.1:9"));
        let base = spawn_server(router(state.clone())).await;

        let body = reqwest::get(format!("{}/", base))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("Authorize Amazon Ads"));
        assert!(body.contains("https://www.amazon.com/ap/oa?"));
        assert_eq!(state.session.lock().await.pending_states.len(), 1);

        // A second tab gets its own link; the first one stays valid
        reqwest::get(format!("{}/", base)).await.unwrap();
        let session = state.session.lock().await;
        assert_eq!(session.pending_states.len(), 2);
        assert!(session.accepts_state(session.pending_states.front().map(String::as_str)));
    }

    #[tokio::test]
    async fn test_index_without_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            client_id: None,
            ..test_config(dir.path(), "http://127.0.0.1:9")
        };
        let base = spawn_server(router(AppState::new(config))).await;

        let resp = reqwest::get(format!("{}/", base)).await.unwrap();
        assert_eq!(resp.status(), 200);
        let body = resp.text().await.unwrap();
        assert!(body.contains("No client_id configured"));
        assert!(body.contains("/amazon-ads-api-redirect"));
    }

    #[tokio::test]
    async fn test_redirect_without_code() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_server(router(AppState::new(test_config(
            dir.path(),
            "http://127.0.0.1:9",
        ))))
        .await;

        let resp = reqwest::get(format!("{}/amazon-ads-api-redirect", base))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert!(resp.text().await.unwrap().contains("Nothing to do here"));
    }

    #[tokio::test]
    async fn test_redirect_rejects_foreign_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(test_config(dir.path(), "http://127.0.0.1:9"));
        state
            .session
            .lock()
            .await
            .remember_state("expected".into());
        let base = spawn_server(router(state)).await;

        let resp = reqwest::get(format!(
            "{}/amazon-ads-api-redirect?code=abc&state=forged",
            base
        ))
        .await
        .unwrap();
        assert_eq!(resp.status(), 400);
        assert!(!dir.path().join("tokens.json").exists());
    }
}
