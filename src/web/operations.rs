//! JSON operation dispatcher behind `POST /reports-api`

use axum::{body::Bytes, extract::State, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use super::{load_client, AppState, Session, WebError};
use crate::api::client::AdsClient;
use crate::api::profiles::fetch_profiles;
use crate::config::Config;
use crate::models::{normalize_rows, title_case_key, Row};
use crate::report::{registry, AdType, Report, ReportType};

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
enum Operation {
    Profiles,
    SelectProfile {
        #[serde(deserialize_with = "string_or_number")]
        profile_id: String,
    },
    ProfileName,
    AvailableReports,
    Reports,
    GetValues,
    RequestReport {
        ad_type: AdType,
        report_type: ReportType,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    ReportStatus {
        #[serde(deserialize_with = "string_or_number")]
        report_id: String,
    },
    DownloadReport {
        #[serde(deserialize_with = "string_or_number")]
        report_id: String,
    },
}

/// Profile ids arrive as numbers from `profiles` and as strings from forms.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {}",
            other
        ))),
    }
}

fn parse_operation(body: &[u8]) -> Result<Operation, WebError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|_| WebError::bad_request("Must post a json."))?;
    match value.get("operation") {
        Some(Value::String(_)) => {}
        Some(_) => return Err(WebError::bad_request("Operation must be a string.")),
        None => return Err(WebError::bad_request("Must specify operation.")),
    }
    serde_json::from_value(value)
        .map_err(|e| WebError::bad_request(format!("Invalid operation: {}", e)))
}

pub(super) async fn dispatch(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, WebError> {
    let operation = parse_operation(&body)?;
    tracing::debug!("Dispatching {:?}", operation);

    let mut session = state.session.lock().await;
    let session = &mut *session;
    let config = state.config.as_ref();

    let response = match operation {
        Operation::Profiles => {
            let client = authorized(&mut session.client, config)?;
            if session.profiles.is_empty() {
                session.profiles = fetch_profiles(client).await?;
            }
            json!({ "profiles": session.profiles })
        }
        Operation::SelectProfile { profile_id } => {
            session.profile_id = Some(profile_id);
            json!({ "success": true })
        }
        Operation::ProfileName => {
            let profile_id = selected_profile(session)?;
            let profile = session
                .profiles
                .iter()
                .find(|p| p.matches(&profile_id))
                .ok_or_else(|| {
                    WebError::bad_request(format!("Profile {} is not known", profile_id))
                })?;
            json!({ "name": profile.display_name() })
        }
        Operation::AvailableReports => json!({ "reports": registry::available_reports() }),
        Operation::Reports => json!({ "reports": reports_table(&session.reports)? }),
        Operation::GetValues => json!({
            "ad_types": AdType::ALL.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
            "report_types": ReportType::ALL.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
        }),
        Operation::RequestReport {
            ad_type,
            report_type,
            start_date,
            end_date,
        } => {
            let profile_id = selected_profile(session)?;
            let mut report = Report::new(profile_id, ad_type, report_type, start_date, end_date)?;
            let client = authorized(&mut session.client, config)?;
            report.request(client).await?;
            session.reports.push(report);
            json!({ "reports": reports_table(&session.reports)? })
        }
        Operation::ReportStatus { report_id } => {
            let data_dir = config.report_data_dir()?;
            let client = authorized(&mut session.client, config)?;
            let report = find_report(&mut session.reports, &report_id)?;
            report.fetch_status(client, &data_dir).await?;
            json!({ "reports": reports_table(&session.reports)? })
        }
        Operation::DownloadReport { report_id } => {
            let data_dir = config.report_data_dir()?;
            let client = authorized(&mut session.client, config)?;
            let report = find_report(&mut session.reports, &report_id)?;
            if !report.is_ready() && report.data_path.is_none() {
                return Err(WebError::bad_request(format!(
                    "Report {} is not ready yet",
                    report_id
                )));
            }
            let rows = report.report_data(client.http(), &data_dir).await?;
            json!({ "rows": rows })
        }
    };
    Ok(Json(response))
}

fn authorized<'a>(
    client: &'a mut Option<AdsClient>,
    config: &Config,
) -> Result<&'a mut AdsClient, WebError> {
    load_client(client, config)?.ok_or_else(|| WebError::bad_request("Must authorize first."))
}

fn selected_profile(session: &Session) -> Result<String, WebError> {
    session
        .profile_id
        .clone()
        .ok_or_else(|| WebError::bad_request("No profile selected."))
}

fn find_report<'a>(reports: &'a mut [Report], report_id: &str) -> Result<&'a mut Report, WebError> {
    reports
        .iter_mut()
        .find(|r| r.report_id.as_deref() == Some(report_id))
        .ok_or_else(|| WebError::bad_request(format!("Unknown report {}", report_id)))
}

/// Requested reports as a table for the browser: normalized, without the
/// signed URL, with readable column names.
fn reports_table(reports: &[Report]) -> anyhow::Result<Vec<Row>> {
    let rows = reports
        .iter()
        .map(|report| match serde_json::to_value(report)? {
            Value::Object(row) => Ok(row),
            other => anyhow::bail!("Report serialized to {}", other),
        })
        .collect::<anyhow::Result<Vec<Row>>>()?;

    Ok(normalize_rows(rows)
        .into_iter()
        .map(|row| {
            row.into_iter()
                .filter(|(key, _)| key != "download_url")
                .map(|(key, value)| (title_case_key(&key), value))
                .collect()
        })
        .collect())
}
