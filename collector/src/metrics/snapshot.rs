use super::shared::MetricType;
use chrono::{
    DateTime,
    Utc,
};
use eyre::{
    ensure,
    Result,
};
use serde::Serialize;

/// Static description of a metric family: name, help text and label schema.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
    pub metric_type: MetricType,
}

impl MetricDescriptor {
    pub const fn gauge(name: &'static str, help: &'static str, labels: &'static [&'static str]) -> Self {
        Self {
            name,
            help,
            labels,
            metric_type: MetricType::Gauge,
        }
    }

    pub const fn counter(name: &'static str, help: &'static str, labels: &'static [&'static str]) -> Self {
        Self {
            name,
            help,
            labels,
            metric_type: MetricType::Counter,
        }
    }
}

/// One value of a metric family with its label values, in descriptor order.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LabeledSample {
    pub metric: &'static str,
    pub labels: Vec<(&'static str, String)>,
    pub value: f64,
}

impl LabeledSample {
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(label, _)| *label == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Immutable result of one complete refresh cycle.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Snapshot {
    generation: u64,
    taken_at: Option<DateTime<Utc>>,
    samples: Vec<LabeledSample>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl Snapshot {
    /// What readers see before the first cycle completed: generation 0, no samples.
    pub fn empty() -> Self {
        Self {
            generation: 0,
            taken_at: None,
            samples: Vec::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        self.taken_at
    }

    pub fn samples(&self) -> &[LabeledSample] {
        &self.samples
    }

    pub fn samples_for<'a>(&'a self, metric: &'a str) -> impl Iterator<Item = &'a LabeledSample> + 'a {
        self.samples.iter().filter(move |sample| sample.metric == metric)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Accumulates samples of a cycle in isolation until [`SnapshotBuilder::finish`].
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    samples: Vec<LabeledSample>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sample; `label_values` must line up with `descriptor.labels`.
    pub fn push<L: AsRef<str>>(&mut self, descriptor: &MetricDescriptor, label_values: &[L], value: f64) -> Result<()> {
        ensure!(
            label_values.len() == descriptor.labels.len(),
            "{} expects {} label values, got {}",
            descriptor.name,
            descriptor.labels.len(),
            label_values.len()
        );

        self.samples.push(LabeledSample {
            metric: descriptor.name,
            labels: descriptor
                .labels
                .iter()
                .zip(label_values)
                .map(|(name, value)| (*name, value.as_ref().to_string()))
                .collect(),
            value,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn finish(self, generation: u64, taken_at: DateTime<Utc>) -> Snapshot {
        Snapshot {
            generation,
            taken_at: Some(taken_at),
            samples: self.samples,
        }
    }
}
