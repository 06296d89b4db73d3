use std::time::Duration;

use clap::Parser;
use reqwest::Url;
use thiserror::Error;

// ------------------------------------------------------------
// Command line
// ------------------------------------------------------------
//
// Raw flags as typed by the operator. Flag names keep the
// snake_case spelling used by existing deployments
// (e.g. `--scrape_uri`), every flag can also come from the
// environment.
//
// Nothing here is validated beyond its type. Call
// `Config::from_cli` to obtain a usable configuration.
//
#[derive(Debug, Clone, Parser)]
#[command(
    name = "wallet-balance-exporter",
    version,
    about = "Republishes a JSON wallet-balance feed as Prometheus gauges",
    long_about = None
)]
pub struct Cli {
    /// Address on which to expose metrics.
    #[arg(long = "address", env = "WALLET_EXPORTER_ADDRESS", default_value = ":9913")]
    pub address: String,

    /// Path under which to expose metrics.
    #[arg(
        long = "metrics_endpoint",
        env = "WALLET_EXPORTER_METRICS_ENDPOINT",
        default_value = "/metrics"
    )]
    pub metrics_endpoint: String,

    /// Prometheus metrics namespace.
    #[arg(
        long = "metrics_namespace",
        env = "WALLET_EXPORTER_METRICS_NAMESPACE",
        default_value = "wallet"
    )]
    pub metrics_namespace: String,

    /// URI of the wallet balances API.
    #[arg(
        long = "scrape_uri",
        env = "WALLET_EXPORTER_SCRAPE_URI",
        default_value = "http://localhost/api/WalletsClientBalances/0"
    )]
    pub scrape_uri: String,

    /// Seconds to wait for the wallet balances API to answer.
    #[arg(
        long = "scrape_timeout",
        env = "WALLET_EXPORTER_SCRAPE_TIMEOUT",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub scrape_timeout: u64,
}

// ------------------------------------------------------------
// Resolved configuration
// ------------------------------------------------------------
//
// Built exactly once at startup and shared read-only with the
// collector and the HTTP server.
//
// INVARIANTS:
// - `listen_address` always carries a host and a port
// - `metrics_endpoint` is a literal path below '/' (no route
//   captures or wildcards)
// - `scrape_uri` is an absolute http(s) URL
// - `scrape_timeout` is at least one second
//
#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address handed to the listener (`HOST:PORT`)
    pub listen_address: String,

    /// Route serving the text exposition
    pub metrics_endpoint: String,

    /// Prefix of every exported metric name (may be empty)
    pub metrics_namespace: String,

    /// Upstream wallet balances endpoint
    pub scrape_uri: Url,

    /// Bound on one upstream round trip (connect + body)
    pub scrape_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid listen address {0:?}: expected [HOST]:PORT")]
    ListenAddress(String),

    #[error(
        "invalid metrics endpoint {0:?}: must be a literal path below '/' \
         (no ':', '*', '{{' or '}}' segments)"
    )]
    MetricsEndpoint(String),

    #[error("invalid metrics namespace {0:?}: must match [a-zA-Z_:][a-zA-Z0-9_:]*")]
    MetricsNamespace(String),

    #[error("invalid scrape uri {uri:?}: {reason}")]
    ScrapeUri { uri: String, reason: String },

    #[error("scrape timeout must be at least one second")]
    ScrapeTimeout,
}

impl Config {
    /// Validates raw flags and resolves them into a `Config`.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        if cli.scrape_timeout == 0 {
            return Err(ConfigError::ScrapeTimeout);
        }

        Ok(Self {
            listen_address: resolve_listen_address(&cli.address)?,
            metrics_endpoint: validate_endpoint(cli.metrics_endpoint)?,
            metrics_namespace: validate_namespace(cli.metrics_namespace)?,
            scrape_uri: parse_scrape_uri(&cli.scrape_uri)?,
            scrape_timeout: Duration::from_secs(cli.scrape_timeout),
        })
    }
}

/// `:9913` listens on every interface (IPv6 wildcard, which also
/// accepts IPv4 on dual-stack hosts), `HOST:PORT` is kept verbatim.
fn resolve_listen_address(raw: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::ListenAddress(raw.to_string());

    let (host, port) = raw.rsplit_once(':').ok_or_else(invalid)?;
    port.parse::<u16>().map_err(|_| invalid())?;

    let host = if host.is_empty() { "[::]" } else { host };
    Ok(format!("{host}:{port}"))
}

/// The endpoint is mounted as a literal route: segments that the
/// router would read as captures or wildcards are rejected.
fn validate_endpoint(endpoint: String) -> Result<String, ConfigError> {
    let literal = endpoint
        .split('/')
        .skip(1)
        .all(|segment| !segment.starts_with([':', '*']) && !segment.contains(['{', '}']));

    if !endpoint.starts_with('/') || endpoint == "/" || !literal {
        return Err(ConfigError::MetricsEndpoint(endpoint));
    }
    Ok(endpoint)
}

/// An empty namespace is allowed and yields bare metric names.
fn validate_namespace(namespace: String) -> Result<String, ConfigError> {
    let mut chars = namespace.chars();
    let valid = match chars.next() {
        None => true,
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_' || first == ':')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
    };

    if valid {
        Ok(namespace)
    } else {
        Err(ConfigError::MetricsNamespace(namespace))
    }
}

fn parse_scrape_uri(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::ScrapeUri {
        uri: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::ScrapeUri {
            uri: raw.to_string(),
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}
