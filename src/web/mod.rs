//! Browser front end: HTML pages, the OAuth redirect and the JSON
//! operation dispatcher.

mod errors;
mod operations;
mod pages;

pub use errors::WebError;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::api::client::AdsClient;
use crate::auth::{JsonTokenFile, TokenStore};
use crate::config::{Config, REDIRECT_PATH};
use crate::models::Profile;
use crate::report::Report;

/// Everything the browser session has accumulated.
#[derive(Default)]
pub struct Session {
    client: Option<AdsClient>,
    profiles: Vec<Profile>,
    profile_id: Option<String>,
    reports: Vec<Report>,
    pending_states: VecDeque<String>,
}

/// Consent links handed out that may still come back through the redirect
const MAX_PENDING_STATES: usize = 8;

impl Session {
    fn remember_state(&mut self, state: String) {
        self.pending_states.push_back(state);
        while self.pending_states.len() > MAX_PENDING_STATES {
            self.pending_states.pop_front();
        }
    }

    /// Whether a redirect carrying `state` answers a consent link from this
    /// server. Nothing issued (e.g. after a restart) accepts any state.
    fn accepts_state(&self, state: Option<&str>) -> bool {
        self.pending_states.is_empty()
            || state.is_some_and(|s| self.pending_states.iter().any(|p| p == s))
    }

    fn forget_state(&mut self, state: Option<&str>) {
        self.pending_states.retain(|p| Some(p.as_str()) != state);
    }
}

/// Shared handler state. The session mutex is held for the whole of each
/// operation, so operations run one at a time.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    session: Arc<Mutex<Session>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            session: Arc::new(Mutex::new(Session::default())),
        }
    }
}

/// Load the client from the token file unless the session already has one.
/// Returns `None` while the account is not authorized.
fn load_client<'a>(
    client: &'a mut Option<AdsClient>,
    config: &Config,
) -> Result<Option<&'a mut AdsClient>> {
    if client.is_none() {
        let store = JsonTokenFile::new(config.tokens_path()?);
        if let Some(tokens) = store.load_tokens()? {
            *client = Some(AdsClient::new(config, tokens, store)?);
        }
    }
    Ok(client.as_mut())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route(&format!("/{}", REDIRECT_PATH), get(pages::amazon_redirect))
        .route("/reports", get(pages::reports))
        .route("/static/:file", get(pages::static_file))
        .route(
            "/reports-api",
            get(pages::reports_api).post(operations::dispatch),
        )
        .with_state(state)
}

/// Run the web front end until the process is stopped.
pub async fn serve(config: Config) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Open {} in a browser to authorize", config.base_url());

    let app = router(AppState::new(config));
    axum::serve(listener, app).await.context("Web server failed")
}
