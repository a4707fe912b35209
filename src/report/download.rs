//! Report payload download and local caching

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::ReportError;
use crate::models::{normalize_rows, Row};

/// S3 answers an expired signed URL with an XML error containing this.
const EXPIRED_MARKER: &str = "Request has expired";
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
/// `report_id -> data file` for everything downloaded into a directory
const INDEX_FILE: &str = "index.json";

/// Fetch a completed report from its signed URL and return normalized rows.
pub async fn download_report(http: &reqwest::Client, url: &str) -> Result<Vec<Row>> {
    tracing::debug!("Report download GET {}", url);

    let resp = http
        .get(url)
        .send()
        .await
        .context("Report download failed")?;
    let status = resp.status();
    let body = resp
        .bytes()
        .await
        .context("Failed to read report payload")?;

    let expired = String::from_utf8_lossy(&body).contains(EXPIRED_MARKER);
    if !body.starts_with(&GZIP_MAGIC) && expired {
        return Err(ReportError::DownloadExpired.into());
    }
    if !status.is_success() {
        anyhow::bail!(
            "HTTP {} downloading report: {}",
            status.as_u16(),
            String::from_utf8_lossy(&body)
        );
    }

    decode_payload(&body)
}

/// Decompress a GZIP_JSON payload (every gzip member) into normalized rows.
pub fn decode_payload(bytes: &[u8]) -> Result<Vec<Row>> {
    let rows: Vec<Row> = serde_json::from_reader(MultiGzDecoder::new(bytes))
        .context("Report payload is not gzip-compressed JSON rows")?;
    Ok(normalize_rows(rows))
}

/// Write rows to a freshly named JSON file under `dir`.
pub fn persist_rows(dir: &Path, rows: &[Row]) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(format!("{}.json", uuid::Uuid::new_v4()));
    let content = serde_json::to_string_pretty(rows).context("Failed to serialize report rows")?;
    fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

pub fn load_rows(path: &Path) -> Result<Vec<Row>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).context("Failed to parse cached report data")
}

fn load_index(dir: &Path) -> Result<BTreeMap<String, PathBuf>> {
    let path = dir.join(INDEX_FILE);
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Data file previously downloaded for `report_id`, if it is still there.
pub fn cached_path(dir: &Path, report_id: &str) -> Result<Option<PathBuf>> {
    Ok(load_index(dir)?
        .remove(report_id)
        .filter(|path| path.exists()))
}

pub fn record_download(dir: &Path, report_id: &str, data_path: &Path) -> Result<()> {
    let mut index = load_index(dir)?;
    index.insert(report_id.to_string(), data_path.to_path_buf());
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(INDEX_FILE);
    let content = serde_json::to_string_pretty(&index).context("Failed to serialize index")?;
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Download a report, write its rows to `dir` and remember the file under
/// `report_id`.
pub async fn download_and_record(
    http: &reqwest::Client,
    url: &str,
    dir: &Path,
    report_id: &str,
) -> Result<(Vec<Row>, PathBuf)> {
    let rows = download_report(http, url).await?;
    let path = persist_rows(dir, &rows)?;
    record_download(dir, report_id, &path)?;
    tracing::info!(
        report_id = %report_id,
        rows = rows.len(),
        path = %path.display(),
        "Report data saved"
    );
    Ok((rows, path))
}

#[cfg(test)]
pub(crate) fn gzip_bytes(raw: &[u8]) -> Vec<u8> {
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw).expect("gzip write");
    encoder.finish().expect("gzip finish")
}

#[cfg(test)]
pub(crate) fn gzip_json(value: &serde_json::Value) -> Vec<u8> {
    gzip_bytes(value.to_string().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_server;
    use axum::{http::StatusCode, routing::get, Router};
    use serde_json::{json, Value};

    #[test]
    fn test_decode_payload_normalizes() {
        let bytes = gzip_json(&json!([
            {"campaignId": 1, "impressions": 10},
            {"campaignId": 2, "clicks": 3}
        ]));
        let rows = decode_payload(&bytes).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["clicks"], Value::Null);
        assert_eq!(rows[1]["impressions"], Value::Null);
        assert_eq!(rows[1]["clicks"], json!(3));
    }

    #[test]
    fn test_decode_reads_every_gzip_member() {
        let mut bytes = gzip_bytes(b"[{\"a\": 1},");
        bytes.extend(gzip_bytes(b"{\"b\": 2}]"));

        let rows = decode_payload(&bytes).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["b"], json!(2));
        assert_eq!(rows[1]["a"], Value::Null);
    }

    #[test]
    fn test_download_index() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cached_path(dir.path(), "r-1").unwrap(), None);

        let data = persist_rows(dir.path(), &[]).unwrap();
        record_download(dir.path(), "r-1", &data).unwrap();
        assert_eq!(cached_path(dir.path(), "r-1").unwrap(), Some(data.clone()));
        assert_eq!(cached_path(dir.path(), "r-2").unwrap(), None);

        fs::remove_file(&data).unwrap();
        assert_eq!(cached_path(dir.path(), "r-1").unwrap(), None);
    }

    #[test]
    fn test_decode_rejects_plain_json() {
        assert!(decode_payload(b"[]").is_err());
    }

    #[test]
    fn test_persist_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let rows = decode_payload(&gzip_json(&json!([{"a": 1}, {"b": 2}]))).unwrap();

        let first = persist_rows(&dir.path().join("report-data"), &rows).unwrap();
        let second = persist_rows(&dir.path().join("report-data"), &rows).unwrap();
        assert_ne!(first, second);
        assert_eq!(first.extension().and_then(|e| e.to_str()), Some("json"));
        assert_eq!(load_rows(&first).unwrap(), rows);
    }

    #[tokio::test]
    async fn test_expired_signed_url() {
        let app = Router::new().route(
            "/report.json.gz",
            get(|| async {
                (
                    StatusCode::FORBIDDEN,
                    concat!(
                        "<Error><Code>AccessDenied</Code>",
                        "<Message>Request has expired</Message></Error>"
                    ),
                )
            }),
        );
        let base = spawn_server(app).await;

        let err = download_report(&reqwest::Client::new(), &format!("{}/report.json.gz", base))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReportError>(),
            Some(ReportError::DownloadExpired)
        ));
    }

    #[tokio::test]
    async fn test_other_http_error() {
        let app = Router::new().route(
            "/report.json.gz",
            get(|| async { (StatusCode::NOT_FOUND, "gone") }),
        );
        let base = spawn_server(app).await;

        let err = download_report(&reqwest::Client::new(), &format!("{}/report.json.gz", base))
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<ReportError>().is_none());
        assert!(err.to_string().contains("404"));
    }
}
