//! Async report lifecycle: request, poll, download, persist.

pub mod download;
pub mod registry;

pub use registry::{AdType, ReportType};

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::api::client::AdsClient;
use crate::api::reports::{create_report, report_status};
use crate::models::Row;
use registry::ReportDefinition;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("No report data found for key {key} ({ad_type}, {report_type})")]
    UnknownReportType {
        key: String,
        ad_type: &'static str,
        report_type: &'static str,
    },

    #[error("Invalid date range {start} to {end}: {reason}")]
    InvalidDateRange {
        start: NaiveDate,
        end: NaiveDate,
        reason: String,
    },

    #[error("Report has not been requested yet")]
    NotRequested,

    #[error("Request has expired")]
    DownloadExpired,

    #[error("Report {report_id} failed: {reason}")]
    Failed { report_id: String, reason: String },
}

/// Server-side processing status. Values this client does not know are
/// kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Unknown(String),
}

impl ReportStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ReportStatus::Pending => "PENDING",
            ReportStatus::Processing => "PROCESSING",
            ReportStatus::Completed => "COMPLETED",
            ReportStatus::Failed => "FAILED",
            ReportStatus::Unknown(raw) => raw,
        }
    }
}

impl From<&str> for ReportStatus {
    fn from(s: &str) -> Self {
        match s {
            "PENDING" => ReportStatus::Pending,
            "PROCESSING" | "IN_PROGRESS" => ReportStatus::Processing,
            "COMPLETED" | "SUCCESS" => ReportStatus::Completed,
            "FAILED" | "FAILURE" => ReportStatus::Failed,
            other => ReportStatus::Unknown(other.to_string()),
        }
    }
}

impl From<String> for ReportStatus {
    fn from(s: String) -> Self {
        ReportStatus::from(s.as_str())
    }
}

impl From<ReportStatus> for String {
    fn from(status: ReportStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a report is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPhase {
    Created,
    Requested,
    Pending,
    Completed,
    Failed,
    Downloaded,
}

/// One requested report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub report_id: Option<String>,
    pub profile_id: String,
    pub ad_type: AdType,
    pub report_type: ReportType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: Option<ReportStatus>,
    pub failure_reason: Option<String>,
    pub download_url: Option<String>,
    pub data_path: Option<PathBuf>,
}

impl Report {
    /// Describe a report for `profile_id`. Fails without touching the
    /// network when the registry has no entry for the pair or the dates
    /// are out of bounds.
    pub fn new(
        profile_id: impl Into<String>,
        ad_type: AdType,
        report_type: ReportType,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, ReportError> {
        let report = Self {
            report_id: None,
            profile_id: profile_id.into(),
            ad_type,
            report_type,
            start_date,
            end_date,
            status: None,
            failure_reason: None,
            download_url: None,
            data_path: None,
        };
        report.validate()?;
        Ok(report)
    }

    pub fn definition(&self) -> Result<&'static ReportDefinition, ReportError> {
        registry::lookup(self.ad_type, self.report_type)
    }

    fn validate(&self) -> Result<&'static ReportDefinition, ReportError> {
        let def = self.definition()?;
        let invalid = |reason: String| ReportError::InvalidDateRange {
            start: self.start_date,
            end: self.end_date,
            reason,
        };
        if self.start_date > self.end_date {
            return Err(invalid("start date is after end date".into()));
        }
        let days = (self.end_date - self.start_date).num_days() + 1;
        if days > def.max_date_range_days {
            return Err(invalid(format!(
                "{} days requested, {} allows at most {}",
                days, def.key, def.max_date_range_days
            )));
        }
        Ok(def)
    }

    pub fn phase(&self) -> ReportPhase {
        if self.data_path.is_some() {
            return ReportPhase::Downloaded;
        }
        match (&self.report_id, &self.status) {
            (None, _) => ReportPhase::Created,
            (Some(_), None) => ReportPhase::Requested,
            (Some(_), Some(ReportStatus::Completed)) => ReportPhase::Completed,
            (Some(_), Some(ReportStatus::Failed)) => ReportPhase::Failed,
            (Some(_), Some(_)) => ReportPhase::Pending,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == Some(ReportStatus::Completed) && self.download_url.is_some()
    }

    /// Ask Amazon to start generating the report.
    pub async fn request(&mut self, client: &mut AdsClient) -> Result<()> {
        let def = self.validate()?;
        let body = def.request_body(self.start_date, self.end_date);

        let report_id = create_report(client, &self.profile_id, &body).await?;
        tracing::info!(report_id = %report_id, key = def.key, "Report requested");

        self.report_id = Some(report_id);
        self.status = None;
        self.download_url = None;
        self.data_path = None;
        Ok(())
    }

    /// Poll the report status. Once the report is completed its data is
    /// downloaded into `data_dir` and `true` is returned.
    pub async fn fetch_status(&mut self, client: &mut AdsClient, data_dir: &Path) -> Result<bool> {
        let report_id = self.report_id.clone().ok_or(ReportError::NotRequested)?;
        let resp = report_status(client, &self.profile_id, &report_id).await?;

        let status = ReportStatus::from(resp.status.as_str());
        if self.status.as_ref() != Some(&status) {
            tracing::info!(report_id = %report_id, status = %status, "Report status changed");
        }
        self.status = Some(status);
        self.download_url = resp.url;
        self.failure_reason = resp.failure_reason;

        if !self.is_ready() {
            return Ok(false);
        }
        if !self.has_cached_data(data_dir)? {
            self.download_data(client.http(), data_dir).await?;
        }
        Ok(true)
    }

    /// Whether rows are already on disk, adopting a file downloaded earlier
    /// for the same report id.
    fn has_cached_data(&mut self, data_dir: &Path) -> Result<bool> {
        if self.data_path.as_deref().is_some_and(Path::exists) {
            return Ok(true);
        }
        let Some(report_id) = &self.report_id else {
            return Ok(false);
        };
        self.data_path = download::cached_path(data_dir, report_id)?;
        Ok(self.data_path.is_some())
    }

    /// Download, normalize and cache the report rows.
    pub async fn download_data(
        &mut self,
        http: &reqwest::Client,
        data_dir: &Path,
    ) -> Result<Vec<Row>> {
        let (Some(report_id), Some(url)) = (&self.report_id, &self.download_url) else {
            return Err(ReportError::NotRequested.into());
        };
        let (rows, path) = download::download_and_record(http, url, data_dir, report_id).await?;
        self.data_path = Some(path);
        Ok(rows)
    }

    /// Rows of the report, from the local cache when present.
    pub async fn report_data(
        &mut self,
        http: &reqwest::Client,
        data_dir: &Path,
    ) -> Result<Vec<Row>> {
        if self.has_cached_data(data_dir)? {
            if let Some(path) = &self.data_path {
                return download::load_rows(path);
            }
        }
        self.download_data(http, data_dir).await
    }

    /// Poll every `interval` until the data is downloaded.
    pub async fn wait_until_ready(
        &mut self,
        client: &mut AdsClient,
        data_dir: &Path,
        interval: Duration,
    ) -> Result<()> {
        loop {
            if self.fetch_status(client, data_dir).await? {
                return Ok(());
            }
            if self.status == Some(ReportStatus::Failed) {
                return Err(ReportError::Failed {
                    report_id: self.report_id.clone().unwrap_or_default(),
                    reason: self
                        .failure_reason
                        .clone()
                        .unwrap_or_else(|| "no reason given".into()),
                }
                .into());
            }
            tracing::debug!(
                "Report not ready, checking again in {}s",
                interval.as_secs()
            );
            tokio::time::sleep(interval).await;
        }
    }
}
