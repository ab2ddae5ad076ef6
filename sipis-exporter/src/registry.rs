//! Gauge registry shared by the sample collector and the HTTP endpoint.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use parking_lot::RwLock;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

use crate::mapping::{METRIC_PREFIX, MetricField};
use crate::measurement::Measurement;

/// Label set attached to every series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EncodeLabelSet)]
pub struct InstanceLabels {
    pub instance: String,
}

type InstanceGauge = Family<InstanceLabels, Gauge<f64, AtomicU64>>;

/// The fixed set of instance-labelled gauges.
///
/// All families are registered in [`GaugeSet::new`]; afterwards only values
/// change. A series for an instance exists once that instance has been
/// recorded at least once and is never removed.
#[derive(Debug)]
pub struct GaugeSet {
    registry: Registry,
    gauges: Vec<(MetricField, InstanceGauge)>,
    /// Instances with at least one recorded measurement.
    recorded: RwLock<BTreeSet<String>>,
}

impl GaugeSet {
    /// Create the registry and register one gauge family per [`MetricField`].
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix(METRIC_PREFIX);
        let mut gauges = Vec::with_capacity(MetricField::ALL.len());

        for field in MetricField::ALL {
            let family = InstanceGauge::default();
            registry.register(field.name(), field.help(), family.clone());
            gauges.push((field, family));
        }

        Self {
            registry,
            gauges,
            recorded: RwLock::new(BTreeSet::new()),
        }
    }

    /// Write every field of `measurement` under the given instance label.
    ///
    /// Each gauge is set independently; a concurrent reader may observe
    /// some fields updated before others.
    pub fn record(&self, instance: &str, measurement: &Measurement) {
        let labels = InstanceLabels {
            instance: instance.to_string(),
        };

        for (field, family) in &self.gauges {
            family.get_or_create(&labels).set(field.extract(measurement));
        }

        if !self.recorded.read().contains(instance) {
            self.recorded.write().insert(instance.to_string());
        }
    }

    /// Instances that currently have series, sorted.
    pub fn instances(&self) -> Vec<String> {
        self.recorded.read().iter().cloned().collect()
    }

    /// Number of live series across all gauges.
    pub fn series_count(&self) -> usize {
        self.recorded.read().len() * self.gauges.len()
    }

    /// Render the registry in the OpenMetrics text format.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut output = String::new();
        encode(&mut output, &self.registry)?;
        Ok(output)
    }
}

impl Default for GaugeSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Shareable registry handle.
pub type SharedGauges = Arc<GaugeSet>;
