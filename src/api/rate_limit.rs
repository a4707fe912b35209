//! HTTP 429 handling.
//!
//! Amazon throttles per account and answers with `429 Too Many Requests`
//! and a `Retry-After` header in seconds. Throttled calls sleep for that long
//! and reissue the identical request. The wait never grows between attempts.

use anyhow::{Context, Result};
use reqwest::{header::RETRY_AFTER, RequestBuilder, Response, StatusCode};
use std::time::Duration;

use super::error::ApiError;

/// Wait used when the server omits `Retry-After` or sends garbage.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(10);

/// Parses a `Retry-After` header value given in whole seconds.
pub fn parse_retry_after(value: Option<&str>) -> Duration {
    match value.map(|v| v.trim().parse::<u64>()) {
        Some(Ok(seconds)) => Duration::from_secs(seconds),
        Some(Err(_)) => {
            tracing::warn!(?value, "Could not parse Retry-After header, using default");
            DEFAULT_RETRY_AFTER
        }
        None => DEFAULT_RETRY_AFTER,
    }
}

/// Send the request produced by `build`, sleeping and resending while the
/// server answers 429. `max_retries` of `None` retries forever.
pub async fn send_with_retry<F>(build: F, max_retries: Option<u32>) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut retries = 0u32;
    loop {
        let resp = build().send().await.context("Request failed")?;
        if resp.status() != StatusCode::TOO_MANY_REQUESTS {
            return Ok(resp);
        }

        if let Some(max) = max_retries {
            if retries >= max {
                return Err(ApiError::RateLimited { retries }.into());
            }
        }
        retries += 1;

        let delay = parse_retry_after(
            resp.headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
        );
        tracing::warn!(
            url = %resp.url(),
            delay_secs = delay.as_secs(),
            retries,
            "Rate limited, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_server;
    use axum::{http::StatusCode as AxumStatus, response::IntoResponse, routing::get, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    /// Server answering 429 `throttled` times, then 200.
    async fn throttling_server(
        throttled: usize,
        retry_after: &'static str,
    ) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/v2/profiles",
            get(move || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n < throttled {
                        (AxumStatus::TOO_MANY_REQUESTS, [("Retry-After", retry_after)], "slow down")
                            .into_response()
                    } else {
                        (AxumStatus::OK, "[]").into_response()
                    }
                }
            }),
        );
        let base = spawn_server(app).await;
        (format!("{}/v2/profiles", base), hits)
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after(Some("2")), Duration::from_secs(2));
        assert_eq!(parse_retry_after(Some(" 30 ")), Duration::from_secs(30));
        assert_eq!(parse_retry_after(Some("soon")), DEFAULT_RETRY_AFTER);
        assert_eq!(parse_retry_after(None), DEFAULT_RETRY_AFTER);
    }

    #[tokio::test]
    async fn test_429_sleeps_then_reissues_once() {
        let (url, hits) = throttling_server(1, "2").await;
        let http = reqwest::Client::new();

        let started = Instant::now();
        let resp = send_with_retry(|| http.get(&url), None).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_one_reissue_per_429() {
        let (url, hits) = throttling_server(3, "0").await;
        let http = reqwest::Client::new();

        let resp = send_with_retry(|| http.get(&url), None).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_retry_ceiling() {
        let (url, hits) = throttling_server(usize::MAX, "0").await;
        let http = reqwest::Client::new();

        let err = send_with_retry(|| http.get(&url), Some(2)).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::RateLimited { retries: 2 })
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}
