//! Prometheus exposition of the published snapshot.
//!
//! A [`prometheus_client`] registry holds one collector that, on every scrape,
//! encodes the current snapshot together with the live refresh health. Every
//! described family gets its `# HELP` and `# TYPE` lines, even when the
//! snapshot holds no samples for it yet.

use conoha_collector::{
    LabeledSample,
    MetricDescriptor,
    MetricType,
    SnapshotCollector,
};
use prometheus_client::{
    collector::Collector,
    encoding::{
        text,
        DescriptorEncoder,
        MetricEncoder,
        NoLabelSet,
    },
    metrics::MetricType as FamilyType,
    registry::Registry,
};
use std::{
    fmt,
    sync::Arc,
};

pub const CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Registry serving `collector` on every encode.
pub fn registry(collector: Arc<SnapshotCollector>) -> Registry {
    let mut registry = Registry::default();
    registry.register_collector(Box::new(SnapshotMetrics { collector }));
    registry
}

pub fn render(registry: &Registry) -> Result<String, fmt::Error> {
    let mut body = String::new();
    text::encode(&mut body, registry)?;
    Ok(body)
}

struct SnapshotMetrics {
    collector: Arc<SnapshotCollector>,
}

impl fmt::Debug for SnapshotMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotMetrics")
            .field("collectors", &self.collector.collector_names())
            .finish()
    }
}

impl Collector for SnapshotMetrics {
    fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), fmt::Error> {
        let snapshot = self.collector.current_snapshot();
        let health = self.collector.status().samples();
        let samples = snapshot.samples().iter().chain(health.iter());

        for descriptor in self.collector.describe() {
            let family = samples.clone().filter(|sample| sample.metric == descriptor.name);
            encode_family(&mut encoder, descriptor, family)?;
        }
        Ok(())
    }
}

/// Counters are described without their `_total` suffix; the encoder adds it
/// to the sample lines.
fn encode_family<'a>(
    encoder: &mut DescriptorEncoder,
    descriptor: &MetricDescriptor,
    samples: impl Iterator<Item = &'a LabeledSample>,
) -> fmt::Result {
    let family_type = match descriptor.metric_type {
        MetricType::Gauge => FamilyType::Gauge,
        MetricType::Counter => FamilyType::Counter,
    };
    let mut family = encoder.encode_descriptor(descriptor.name, descriptor.help, None, family_type)?;

    for sample in samples {
        if sample.labels.is_empty() {
            encode_value(descriptor.metric_type, sample.value, &mut family)?;
        } else {
            let mut labeled = family.encode_family(&sample.labels)?;
            encode_value(descriptor.metric_type, sample.value, &mut labeled)?;
        }
    }
    Ok(())
}

fn encode_value(metric_type: MetricType, value: f64, encoder: &mut MetricEncoder<'_>) -> fmt::Result {
    match metric_type {
        MetricType::Gauge => encoder.encode_gauge(&value),
        MetricType::Counter => encoder.encode_counter::<NoLabelSet, _, u64>(&value, None),
    }
}
