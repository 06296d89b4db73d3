use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Url;
use thiserror::Error;

use crate::{
    config::Config,
    fetcher::{FetchError, Fetcher, HttpFetcher},
    metrics::{MetricSink, Observation, WalletDescriptors, WalletMetric},
    schema::{ScrapeResult, parse_wallets},
};

use super::Collector;

/// Why a scrape cycle produced no samples.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("fetch failed: {0}")]
    FetchFailed(#[from] FetchError),

    #[error("parse failed: {0}")]
    ParseFailed(#[from] serde_json::Error),
}

impl CollectError {
    /// Diagnostic kind written to the log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FetchFailed(_) => "FetchFailed",
            Self::ParseFailed(_) => "ParseFailed",
        }
    }
}

/// Exports wallet balances from the upstream API.
///
/// Every cycle:
/// 1. GET `uri`, bounded by `timeout`
/// 2. Parse the body as a list of wallet records
/// 3. Emit `balance` then `reserved` for each record, in input order
///
/// Any failure ends the cycle before step 3, so a cycle emits
/// either every sample or none.
pub struct WalletCollector {
    uri: Url,
    timeout: Duration,
    fetcher: Arc<dyn Fetcher>,
    descriptors: WalletDescriptors,
}

impl WalletCollector {
    /// Collector talking HTTP to the configured upstream.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self::with_fetcher(config, Arc::new(HttpFetcher::new()?)))
    }

    pub fn with_fetcher(config: &Config, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            uri: config.scrape_uri.clone(),
            timeout: config.scrape_timeout,
            fetcher,
            descriptors: WalletDescriptors::new(&config.metrics_namespace),
        }
    }

    /// Fetch and parse, without emitting anything.
    pub async fn scrape(&self) -> Result<ScrapeResult, CollectError> {
        let body = self.fetcher.fetch(&self.uri, self.timeout).await?;
        Ok(parse_wallets(&body)?)
    }
}

#[async_trait]
impl Collector for WalletCollector {
    fn describe(&self) -> &WalletDescriptors {
        &self.descriptors
    }

    async fn collect(&self, sink: &mut dyn MetricSink) {
        let wallets = match self.scrape().await {
            Ok(wallets) => wallets,
            Err(e) => {
                warn!(
                    "scrape cycle failed kind={} uri={} error={}",
                    e.kind(),
                    self.uri,
                    e
                );
                return;
            }
        };

        debug!("scraped {} wallets from {}", wallets.len(), self.uri);

        for wallet in wallets {
            sink.observe(Observation::new(
                WalletMetric::Balance,
                wallet.asset_id.clone(),
                wallet.balance,
            ));
            sink.observe(Observation::new(
                WalletMetric::Reserved,
                wallet.asset_id,
                wallet.reserved,
            ));
        }
    }
}
