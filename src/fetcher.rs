use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;

/// Failure of a single upstream request.
///
/// Every variant is final for the current scrape cycle: the
/// fetcher never retries.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP status {0}")]
    Status(StatusCode),

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
}

/// Source of raw upstream documents.
///
/// The collector only depends on this trait, which keeps the
/// scrape cycle testable without a network.
///
/// CONTRACT:
/// - Exactly one request per call, no retries
/// - `timeout` bounds the whole round trip, body included
/// - Only 2xx responses produce a body
///
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, uri: &Url, timeout: Duration) -> Result<Bytes, FetchError>;
}

// ------------------------------------------------------------
// HTTP implementation
// ------------------------------------------------------------
//
// Wraps one shared reqwest client so that scrapes reuse pooled
// connections. The client itself carries no timeout, it is set
// per request from the resolved configuration.
//
// The response is owned by `fetch` and dropped on every exit
// path, which hands the connection back to the pool (or closes
// it) without an explicit close call.
//
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, uri: &Url, timeout: Duration) -> Result<Bytes, FetchError> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout(timeout)
            } else {
                FetchError::Transport(e)
            }
        };

        let response = self
            .client
            .get(uri.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(timeout)
            } else {
                FetchError::Body(e)
            }
        })
    }
}
