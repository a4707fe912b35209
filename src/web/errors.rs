use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::report::ReportError;

/// Error answered to the browser as `{"error": "..."}`.
#[derive(Debug)]
pub struct WebError {
    status: StatusCode,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<anyhow::Error> for WebError {
    fn from(err: anyhow::Error) -> Self {
        let status = match err.downcast_ref::<ReportError>() {
            Some(
                ReportError::UnknownReportType { .. }
                | ReportError::InvalidDateRange { .. }
                | ReportError::NotRequested,
            ) => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        tracing::warn!("Operation failed: {:#}", err);
        Self::new(status, format!("{:#}", err))
    }
}

impl From<ReportError> for WebError {
    fn from(err: ReportError) -> Self {
        anyhow::Error::from(err).into()
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(ErrorEnvelope { error: self.message })).into_response()
    }
}
