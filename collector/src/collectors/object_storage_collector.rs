use crate::{
    collectors::Collector,
    metrics::*,
};
use conoha_client::ConohaClient;
use eyre::{
    Result,
    WrapErr as _,
};
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
};

pub const OBJECT_STORAGE_REQUESTS: MetricDescriptor = MetricDescriptor::gauge(
    "conoha_object_storage_requests",
    "Requests to ConoHa object storage",
    &["method"],
);
pub const OBJECT_STORAGE_USAGE: MetricDescriptor = MetricDescriptor::gauge(
    "conoha_object_storage_usage",
    "Usage of ConoHa object storage in bytes",
    &["field"],
);

const DESCRIPTORS: &[MetricDescriptor] = &[OBJECT_STORAGE_REQUESTS, OBJECT_STORAGE_USAGE];

pub struct ObjectStorageCollector {
    client: Arc<ConohaClient>,
}

impl ObjectStorageCollector {
    pub fn new(client: Arc<ConohaClient>) -> Self {
        Self { client }
    }

    async fn collect_object_storage(&self, builder: &mut SnapshotBuilder) -> Result<()> {
        let requests = self
            .client
            .object_storage_requests()
            .await
            .wrap_err("failed to read object storage requests")?;
        for (method, value) in requests.measurements() {
            builder.push(&OBJECT_STORAGE_REQUESTS, &[method], value)?;
        }

        let usage = self
            .client
            .object_storage_usage()
            .await
            .wrap_err("failed to read object storage usage")?;
        for (field, value) in usage.measurements() {
            builder.push(&OBJECT_STORAGE_USAGE, &[field], value)?;
        }

        Ok(())
    }
}

impl Collector for ObjectStorageCollector {
    fn describe(&self) -> &'static [MetricDescriptor] {
        DESCRIPTORS
    }

    fn collect<'a>(&'a self, builder: &'a mut SnapshotBuilder) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(self.collect_object_storage(builder))
    }

    fn name(&self) -> &'static str {
        "object_storage"
    }
}
