mod main_lib;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use main_lib::{init_tracing, load_feed, load_settings, render_report, run};

#[derive(Parser, Debug)]
#[command(name = "folio-analytics")]
#[command(about = "Cost basis, realized P&L and XIRR for a portfolio transaction feed", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON feed: transactions, valuations, fxRates, positions
    feed: PathBuf,

    /// JSON settings file
    #[arg(short, long, env = "FOLIO_SETTINGS")]
    settings: Option<PathBuf>,

    /// Overrides the base currency from the settings file
    #[arg(short, long, env = "FOLIO_BASE_CURRENCY")]
    base_currency: Option<String>,

    /// Pretty-print the report
    #[arg(long)]
    pretty: bool,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let settings = load_settings(cli.settings.as_deref(), cli.base_currency.as_deref())?;
    tracing::info!("Base currency: {}", settings.base_currency);

    let feed = load_feed(&cli.feed)?;
    tracing::info!(
        "Loaded {} transactions, {} valuations, {} positions",
        feed.transactions.len(),
        feed.valuations.len(),
        feed.positions.len()
    );

    let report = run(settings, &feed)?;
    if report.xirr.is_none() {
        log::warn!("Portfolio XIRR unavailable");
    }

    let rendered = render_report(&report, cli.pretty)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", rendered).context("Failed to write report")?;
    Ok(())
}
