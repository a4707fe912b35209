//! Reporting v3 endpoints (/reporting/reports)

use anyhow::{Context, Result};
use serde::Deserialize;

use super::client::AdsClient;

const CREATE_MEDIA_TYPE: &str = "application/vnd.createasyncreportrequest.v3+json";
const STATUS_MEDIA_TYPE: &str = "application/vnd.getasyncreportrequeststatus.v3+json";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateReportResponse {
    report_id: String,
}

/// Status of an async report as reported by the server
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatusResponse {
    pub status: String,
    pub url: Option<String>,
    pub failure_reason: Option<String>,
}

/// Start report generation; returns the server-assigned report id.
pub async fn create_report(
    client: &mut AdsClient,
    profile_id: &str,
    body: &serde_json::Value,
) -> Result<String> {
    let resp = client
        .post("/reporting/reports", Some(profile_id), CREATE_MEDIA_TYPE, body)
        .await?;
    let created: CreateReportResponse = resp
        .json()
        .await
        .context("Failed to parse create report response")?;
    Ok(created.report_id)
}

/// Poll the status and download URL of a report.
pub async fn report_status(
    client: &mut AdsClient,
    profile_id: &str,
    report_id: &str,
) -> Result<ReportStatusResponse> {
    let path = format!("/reporting/reports/{}", report_id);
    let resp = client
        .get(&path, Some(profile_id), Some(STATUS_MEDIA_TYPE))
        .await?;
    resp.json()
        .await
        .context("Failed to parse report status response")
}
