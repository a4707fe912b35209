//! ads-reports - Amazon Ads reporting client
//!
//! Authorizes an advertiser account, requests asynchronous reports and
//! downloads their data, from the command line or a small web UI.

mod api;
mod auth;
mod config;
mod models;
mod report;
#[cfg(test)]
mod test_support;
mod web;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use report::{AdType, ReportType};

#[derive(Parser)]
#[command(name = "ads-reports")]
#[command(about = "Request and download Amazon Ads reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web UI
    Serve,

    /// Print the consent URL to authorize this application
    Login,

    /// Exchange the code from the consent redirect for tokens
    Authorize {
        /// `code` query parameter of the redirect URL
        #[arg(short, long)]
        code: String,
    },

    /// Delete stored tokens
    Logout,

    /// Show current authorization status
    Status,

    /// List advertising profiles
    Profiles,

    /// List supported report types
    ReportTypes,

    /// Request a report
    Request {
        /// Profile ID (from `profiles` output)
        #[arg(short, long)]
        profile: String,

        /// SPONSORED_PRODUCTS, SPONSORED_BRANDS, SPONSORED_DISPLAY (or sp, sb, sd)
        #[arg(long)]
        ad_type: AdType,

        /// e.g. campaign, ad_group, search_term
        #[arg(long)]
        report_type: ReportType,

        /// First day, YYYY-MM-DD
        #[arg(long)]
        start: NaiveDate,

        /// Last day, YYYY-MM-DD
        #[arg(long)]
        end: NaiveDate,

        /// Poll until the report is ready and download it
        #[arg(short, long)]
        wait: bool,
    },

    /// Check a requested report once, downloading it when complete
    Poll {
        /// Profile ID the report was requested for
        #[arg(short, long)]
        profile: String,

        /// Report ID printed by `request`
        #[arg(short, long)]
        report_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => {
            web::serve(config).await?;
        }
        Commands::Login => {
            auth::login(&config).await?;
        }
        Commands::Authorize { code } => {
            auth::authorize(&config, &code).await?;
        }
        Commands::Logout => {
            tracing::info!("Logging out...");
            auth::logout(&config).await?;
        }
        Commands::Status => {
            auth::status(&config).await?;
        }
        Commands::Profiles => {
            tracing::info!("Fetching profiles...");
            api::list_profiles(&config).await?;
        }
        Commands::ReportTypes => {
            api::list_report_types();
        }
        Commands::Request {
            profile,
            ad_type,
            report_type,
            start,
            end,
            wait,
        } => {
            api::request_report(&config, &profile, ad_type, report_type, start, end, wait)
                .await?;
        }
        Commands::Poll { profile, report_id } => {
            api::poll_report(&config, &profile, &report_id).await?;
        }
    }

    Ok(())
}
