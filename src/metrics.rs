use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

/// Label carried by every wallet metric.
pub const ASSET_LABEL: &str = "asset";

/// Static description of one exported metric family.
///
/// Created once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub namespace: String,
    pub name: &'static str,
    pub help: &'static str,
    pub label: &'static str,
}

impl MetricDescriptor {
    /// `<namespace>_<name>`, or the bare name when no namespace is set.
    pub fn fq_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.to_string()
        } else {
            format!("{}_{}", self.namespace, self.name)
        }
    }

    fn opts(&self) -> Opts {
        Opts::new(self.name, self.help).namespace(self.namespace.clone())
    }
}

/// The two metric families exported per asset.
///
/// The set is closed, hence a fixed pair rather than a lookup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletDescriptors {
    pub balance: MetricDescriptor,
    pub reserved: MetricDescriptor,
}

impl WalletDescriptors {
    pub fn new(namespace: &str) -> Self {
        let describe = |name, help| MetricDescriptor {
            namespace: namespace.to_string(),
            name,
            help,
            label: ASSET_LABEL,
        };

        Self {
            balance: describe("balance", "balance by asset"),
            reserved: describe("reserved", "reserved by asset"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletMetric {
    Balance,
    Reserved,
}

/// A single gauge sample produced by a scrape cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub metric: WalletMetric,
    pub asset: String,
    pub value: f64,
}

impl Observation {
    pub fn new(metric: WalletMetric, asset: impl Into<String>, value: f64) -> Self {
        Self {
            metric,
            asset: asset.into(),
            value,
        }
    }
}

/// Destination of the observations emitted by a collector.
///
/// A sink belongs to exactly one scrape cycle.
pub trait MetricSink: Send {
    fn observe(&mut self, observation: Observation);
}

/// Records observations verbatim, duplicates included.
impl MetricSink for Vec<Observation> {
    fn observe(&mut self, observation: Observation) {
        self.push(observation);
    }
}

// ------------------------------------------------------------
// Prometheus exposition
// ------------------------------------------------------------
//
// One sink per scrape request. Each sink owns a private registry
// holding only the two wallet gauge families, so nothing else
// (process or runtime collectors) ends up in the output.
//
// NOTES:
// - Families without samples are left out of the rendered text.
// - Within one exposition a (metric, asset) pair can appear once.
//   When the upstream repeats an asset, the last observed value
//   is the one rendered.
//
pub struct PrometheusSink {
    registry: Registry,
    balance: GaugeVec,
    reserved: GaugeVec,
}

impl PrometheusSink {
    /// Builds the gauge families from their descriptors.
    ///
    /// Fails when a descriptor does not form a valid metric name,
    /// which `main` relies on to reject a bad namespace at startup.
    pub fn new(descriptors: &WalletDescriptors) -> prometheus::Result<Self> {
        let registry = Registry::new();

        let balance = GaugeVec::new(descriptors.balance.opts(), &[descriptors.balance.label])?;
        registry.register(Box::new(balance.clone()))?;

        let reserved =
            GaugeVec::new(descriptors.reserved.opts(), &[descriptors.reserved.label])?;
        registry.register(Box::new(reserved.clone()))?;

        Ok(Self {
            registry,
            balance,
            reserved,
        })
    }

    /// Renders every observed sample in the text exposition format.
    pub fn render(&self) -> prometheus::Result<String> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }

    /// `Content-Type` of the rendered text.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

impl MetricSink for PrometheusSink {
    fn observe(&mut self, observation: Observation) {
        let family = match observation.metric {
            WalletMetric::Balance => &self.balance,
            WalletMetric::Reserved => &self.reserved,
        };

        family
            .with_label_values(&[observation.asset.as_str()])
            .set(observation.value);
    }
}
