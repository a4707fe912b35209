use thiserror::Error;

/// Failures reported by the Amazon Ads API itself.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP {status} for {url}: {body}")]
    Status { status: u16, url: String, body: String },

    #[error("401 Unauthorized for {url}. Tokens may be revoked -- run 'ads-reports login'.")]
    Unauthorized { url: String },

    #[error("Still rate limited after {retries} retries")]
    RateLimited { retries: u32 },
}
