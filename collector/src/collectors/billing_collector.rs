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

pub const DEPOSIT: MetricDescriptor =
    MetricDescriptor::gauge("conoha_deposit", "Remaining deposit of the ConoHa account", &[]);

const DESCRIPTORS: &[MetricDescriptor] = &[DEPOSIT];

pub struct BillingCollector {
    client: Arc<ConohaClient>,
}

impl BillingCollector {
    pub fn new(client: Arc<ConohaClient>) -> Self {
        Self { client }
    }
}

impl Collector for BillingCollector {
    fn describe(&self) -> &'static [MetricDescriptor] {
        DESCRIPTORS
    }

    fn collect<'a>(&'a self, builder: &'a mut SnapshotBuilder) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let summary = self
                .client
                .payment_summary()
                .await
                .wrap_err("failed to read payment summary")?;
            builder.push::<&str>(&DEPOSIT, &[], summary.total_deposit_amount)?;
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "billing"
    }
}
