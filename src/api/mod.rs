//! API client module for Amazon Ads

pub mod client;
pub mod error;
pub mod profiles;
pub mod rate_limit;
pub mod reports;

use anyhow::Result;
use chrono::NaiveDate;
use std::time::Duration;

use crate::config::Config;
use crate::report::{download, registry, AdType, Report, ReportStatus, ReportType};
use client::AdsClient;

/// List advertising profiles the account can access
pub async fn list_profiles(config: &Config) -> Result<()> {
    let mut client = AdsClient::from_config(config)?;
    let profiles = profiles::fetch_profiles(&mut client).await?;

    println!("\nProfiles:");
    for profile in &profiles {
        println!("  {:<16} {}", profile.profile_id, profile.display_name());
    }
    if profiles.is_empty() {
        println!("  (none)");
    }
    Ok(())
}

/// List the report types this client knows how to request
pub fn list_report_types() {
    println!("\nReport types (ad type / report type -> reportTypeId):");
    for def in registry::REGISTRY {
        println!(
            "  {:<20} {:<20} -> {:<28} max {} days, kept {} days",
            def.ad_type.as_str(),
            def.report_type.as_str(),
            def.report_type_id,
            def.max_date_range_days,
            def.data_retention_days
        );
    }
}

/// Request a report, optionally waiting until its data is downloaded
pub async fn request_report(
    config: &Config,
    profile_id: &str,
    ad_type: AdType,
    report_type: ReportType,
    start_date: NaiveDate,
    end_date: NaiveDate,
    wait: bool,
) -> Result<()> {
    let mut report = Report::new(profile_id, ad_type, report_type, start_date, end_date)?;
    let mut client = AdsClient::from_config(config)?;

    report.request(&mut client).await?;
    let report_id = report.report_id.clone().unwrap_or_default();
    println!("Requested report {}", report_id);

    if wait {
        let data_dir = config.report_data_dir()?;
        let interval = Duration::from_secs(config.poll_interval_secs);
        report
            .wait_until_ready(&mut client, &data_dir, interval)
            .await?;
        print_downloaded(&report);
    } else {
        println!(
            "Check on it with: ads-reports poll --profile {} --report-id {}",
            profile_id, report_id
        );
    }
    Ok(())
}

/// Poll a previously requested report once, downloading its data the
/// first time it is seen completed.
pub async fn poll_report(config: &Config, profile_id: &str, report_id: &str) -> Result<()> {
    let mut client = AdsClient::from_config(config)?;
    let data_dir = config.report_data_dir()?;

    let resp = reports::report_status(&mut client, profile_id, report_id).await?;
    let status = ReportStatus::from(resp.status.as_str());
    println!("Status: {}", status);
    if let Some(reason) = &resp.failure_reason {
        println!("Reason: {}", reason);
    }

    let Some(url) = resp.url.filter(|_| status == ReportStatus::Completed) else {
        return Ok(());
    };
    let path = match download::cached_path(&data_dir, report_id)? {
        Some(path) => path,
        None => {
            download::download_and_record(client.http(), &url, &data_dir, report_id)
                .await?
                .1
        }
    };
    println!("Report data saved to {}", path.display());
    Ok(())
}

fn print_downloaded(report: &Report) {
    match &report.data_path {
        Some(path) => println!("Report data saved to {}", path.display()),
        None => println!("Report finished without data"),
    }
}
