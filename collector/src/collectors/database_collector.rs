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
    collections::BTreeSet,
    future::Future,
    pin::Pin,
    sync::Arc,
};

pub const DATABASE_SIZE: MetricDescriptor = MetricDescriptor::gauge(
    "conoha_database_size",
    "Size of ConoHa database in GB",
    &["database", "name", "service"],
);
pub const DATABASE_QUOTA: MetricDescriptor =
    MetricDescriptor::gauge("conoha_database_quota", "Quota of ConoHa database service in GB", &["service"]);
pub const DATABASE_USAGE: MetricDescriptor = MetricDescriptor::gauge(
    "conoha_database_usage",
    "Total usage of ConoHa database service in GB",
    &["service"],
);

const DESCRIPTORS: &[MetricDescriptor] = &[DATABASE_SIZE, DATABASE_QUOTA, DATABASE_USAGE];

/// Database sizes plus the quota of every database service.
///
/// Several databases usually share one service, so each distinct service id
/// is queried for its quota exactly once per cycle.
pub struct DatabaseCollector {
    client: Arc<ConohaClient>,
}

impl DatabaseCollector {
    pub fn new(client: Arc<ConohaClient>) -> Self {
        Self { client }
    }

    async fn collect_databases(&self, builder: &mut SnapshotBuilder) -> Result<()> {
        let databases = self.client.databases().await.wrap_err("failed to list databases")?;
        debug!(count = databases.len(), "listed databases");

        let mut service_ids = BTreeSet::new();
        for listed in &databases {
            let database = self
                .client
                .database(&listed.database_id)
                .await
                .wrap_err_with(|| format!("failed to read database {}", listed.database_id))?;
            builder.push(
                &DATABASE_SIZE,
                &[&database.database_id, &database.db_name, &database.service_id],
                database.db_size,
            )?;
            service_ids.insert(database.service_id);
        }

        for service_id in &service_ids {
            let quota = self
                .client
                .database_quota(service_id)
                .await
                .wrap_err_with(|| format!("failed to read quota of service {service_id}"))?;
            builder.push(&DATABASE_QUOTA, &[service_id], quota.quota)?;
            builder.push(&DATABASE_USAGE, &[service_id], quota.total_usage)?;
        }

        Ok(())
    }
}

impl Collector for DatabaseCollector {
    fn describe(&self) -> &'static [MetricDescriptor] {
        DESCRIPTORS
    }

    fn collect<'a>(&'a self, builder: &'a mut SnapshotBuilder) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(self.collect_databases(builder))
    }

    fn name(&self) -> &'static str {
        "database"
    }
}
