use crate::metrics::{
    MetricDescriptor,
    SnapshotBuilder,
};
use eyre::Result;
use std::{
    future::Future,
    pin::Pin,
};

/// One category of upstream data turned into samples.
pub trait Collector: Send + Sync {
    /// The metric families this collector may emit, fixed for its lifetime.
    fn describe(&self) -> &'static [MetricDescriptor];

    /// Fetch the current values and append them to `builder`.
    ///
    /// An error aborts the whole cycle; whatever was already pushed is discarded
    /// together with the builder.
    fn collect<'a>(&'a self, builder: &'a mut SnapshotBuilder) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Get the name of this collector
    fn name(&self) -> &'static str;
}
