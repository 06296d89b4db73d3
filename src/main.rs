// ------------------------------------------------------------
// Module declarations
// ------------------------------------------------------------
//
// Each module represents a well-defined responsibility:
//
// - config:    Command line flags and the resolved configuration
// - schema:    Upstream wallet records and body parsing
// - fetcher:   Single-shot HTTP access to the upstream API
// - metrics:   Metric descriptors, observations and exposition sink
// - collector: Scrape cycle (fetch -> parse -> emit)
// - server:    HTTP endpoint serving the exposition
//
mod collector;
mod config;
mod fetcher;
mod metrics;
mod schema;
mod server;

#[cfg(test)]
mod test_support;

// ------------------------------------------------------------
// External dependencies
// ------------------------------------------------------------

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::info;

use collector::{Collector, WalletCollector};
use config::{Cli, Config};
use metrics::PrometheusSink;

// ------------------------------------------------------------
// Application entry point
// ------------------------------------------------------------
//
// Responsibilities:
// - Initialize logging (RUST_LOG, defaults to `info`)
// - Resolve configuration from flags / environment
// - Build the wallet collector and validate its descriptors
// - Serve the metrics endpoint until Ctrl-C
//
// Any error returned here terminates the process with a
// non-zero exit code. At runtime the only such error is a
// listen address that cannot be bound.
//
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_cli(Cli::parse()).context("invalid configuration")?;

    let collector = WalletCollector::new(&config).context("failed to build HTTP client")?;

    // Registration: descriptors are checked once, before the
    // first scrape can reach them.
    PrometheusSink::new(collector.describe())
        .map_err(|e| anyhow::anyhow!("invalid metric descriptors: {e}"))?;

    info!("Metrics endpoint: {}", config.metrics_endpoint);
    info!("Metrics namespace: {}", config.metrics_namespace);
    info!(
        "Exported families: {}, {}",
        collector.describe().balance.fq_name(),
        collector.describe().reserved.fq_name()
    );
    info!("Scraping information from : {}", config.scrape_uri);
    info!("Scrape timeout: {}s", config.scrape_timeout.as_secs());

    server::serve(&config, Arc::new(collector)).await
}
