//! Outlay scenario replayer
//!
//! Seeds an in-memory store from a JSON scenario, runs its steps through the
//! approval workflow and prints one JSON report per step.

mod scenario;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use outlay_core::currency::{CurrencyConverter, HttpRateSource, RateSource};
use outlay_db::WorkflowRepository;
use outlay_shared::AppConfig;
use outlay_shared::config::LoggingConfig;

use crate::scenario::Scenario;

#[derive(Debug, Parser)]
#[command(
    name = "outlay-replay",
    about = "Replay an expense approval scenario",
    after_help = "Examples:\n  outlay-replay bins/replay/scenarios/sequential.json\n  outlay-replay scenario.json --live-rates"
)]
struct Cli {
    /// Scenario JSON file.
    scenario: PathBuf,

    /// Fetch exchange rates from the configured rates API instead of the
    /// scenario's fixed table.
    #[arg(long)]
    live_rates: bool,
}

fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));
    let registry = tracing_subscriber::registry().with(filter);

    // Reports go to stdout, logs to stderr
    if config.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    let path = cli.scenario.display();
    let text = std::fs::read_to_string(&cli.scenario)
        .with_context(|| format!("failed to read scenario {path}"))?;
    let scenario = Scenario::from_json(&text).with_context(|| format!("invalid scenario {path}"))?;

    let source: Arc<dyn RateSource> = if cli.live_rates {
        info!(base_url = %config.rates.base_url, "using live exchange rates");
        Arc::new(HttpRateSource::new(&config.rates)?)
    } else {
        Arc::new(scenario.rate_source())
    };

    let store = scenario.seed();
    let repo = WorkflowRepository::new(
        store,
        CurrencyConverter::new(source),
        config.workflow.clone(),
    );

    let reports = scenario::run(&scenario, &repo).await;
    let failed = reports.iter().filter(|r| !r.ok).count();
    for report in &reports {
        println!("{}", serde_json::to_string(report)?);
    }

    info!(steps = reports.len(), failed, "scenario finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parses_scenario_and_live_rates() {
        let cli = Cli::try_parse_from(["outlay-replay", "trip.json", "--live-rates"]).unwrap();
        assert_eq!(cli.scenario, PathBuf::from("trip.json"));
        assert!(cli.live_rates);

        let cli = Cli::try_parse_from(["outlay-replay", "trip.json"]).unwrap();
        assert!(!cli.live_rates);
    }

    #[test]
    fn test_cli_requires_scenario() {
        assert!(Cli::try_parse_from(["outlay-replay"]).is_err());
    }
}
