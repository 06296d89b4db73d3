/// Collector module
///
/// This module groups the logic that turns one scrape request into
/// metric observations:
/// - Fetching the upstream wallet document
/// - Parsing it into wallet records
/// - Emitting one gauge pair per record into a sink
///
/// The collector layer sits between:
/// - The fetcher (upstream HTTP access)
/// - The exposition layer (sink + HTTP server)
///
/// Design notes:
/// - Collectors hold no mutable state across cycles
/// - Failures stay inside the cycle: they are logged, never returned
pub mod wallet;

use async_trait::async_trait;

use crate::metrics::{MetricSink, WalletDescriptors};

pub use wallet::WalletCollector;

/// Registration-facing side of a collector.
///
/// THREAD SAFETY:
/// - Must be Send + Sync
/// - One instance serves all concurrent scrape requests
///
#[async_trait]
pub trait Collector: Send + Sync {
    /// Static descriptors of every family this collector emits.
    fn describe(&self) -> &WalletDescriptors;

    /// Runs one scrape cycle, emitting observations into `sink`.
    ///
    /// Never fails from the caller's point of view: a broken
    /// cycle simply emits nothing.
    async fn collect(&self, sink: &mut dyn MetricSink);
}
