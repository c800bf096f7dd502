use std::fs;
use std::path::Path;

use anyhow::Context;
use folio_analytics_core::{AnalyticsService, AnalyticsSettings, PortfolioFeed, PortfolioReport};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the subscriber. Output goes to stderr so stdout stays pure JSON.
/// `log` records from the core crate are bridged in by `init`.
pub fn init_tracing() {
    let log_format = std::env::var("FOLIO_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Settings from an optional JSON file, with the base currency override applied last.
pub fn load_settings(
    path: Option<&Path>,
    base_currency: Option<&str>,
) -> anyhow::Result<AnalyticsSettings> {
    let mut settings = match path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings file {}", path.display()))?;
            AnalyticsSettings::from_json_str(&json)
                .with_context(|| format!("Invalid settings in {}", path.display()))?
        }
        None => AnalyticsSettings::default(),
    };
    if let Some(code) = base_currency {
        settings = settings.with_base_currency(code);
    }
    settings.validate().context("Invalid base currency override")?;
    Ok(settings)
}

pub fn parse_feed(json: &str) -> anyhow::Result<PortfolioFeed> {
    serde_json::from_str(json).context("Feed is not a valid portfolio feed document")
}

pub fn load_feed(path: &Path) -> anyhow::Result<PortfolioFeed> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read feed file {}", path.display()))?;
    parse_feed(&json).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn run(settings: AnalyticsSettings, feed: &PortfolioFeed) -> anyhow::Result<PortfolioReport> {
    let service = AnalyticsService::new(settings).context("Failed to initialize analytics")?;
    Ok(service.run(feed))
}

pub fn render_report(report: &PortfolioReport, pretty: bool) -> anyhow::Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    };
    rendered.context("Failed to serialize report")
}
