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
use strum::IntoEnumIterator as _;

pub const CPU: MetricDescriptor = MetricDescriptor::gauge("conoha_cpu", "CPU usage of ConoHa instance", &["instance"]);
pub const DISK: MetricDescriptor =
    MetricDescriptor::gauge("conoha_disk", "Disk usage of ConoHa instance", &["instance", "rw"]);
pub const INTERFACE: MetricDescriptor = MetricDescriptor::gauge(
    "conoha_interface",
    "Interface usage of ConoHa instance",
    &["instance", "mac", "direction"],
);

const DESCRIPTORS: &[MetricDescriptor] = &[CPU, DISK, INTERFACE];

/// CPU, disk and interface usage for every compute instance.
///
/// The instance inventory is listed again on every cycle so that servers
/// created or deleted after start-up are picked up.
pub struct ComputeCollector {
    client: Arc<ConohaClient>,
}

impl ComputeCollector {
    pub fn new(client: Arc<ConohaClient>) -> Self {
        Self { client }
    }

    async fn collect_servers(&self, builder: &mut SnapshotBuilder) -> Result<()> {
        let servers = self.client.servers().await.wrap_err("failed to list servers")?;
        debug!(count = servers.len(), "listed servers");

        for server in &servers {
            let instance = server.name.as_str();

            let cpu = self
                .client
                .cpu_usage(server)
                .await
                .wrap_err_with(|| format!("failed to read CPU usage of {instance}"))?;
            builder.push(&CPU, &[instance], cpu.require("value")?)?;

            let disk = self
                .client
                .disk_usage(server)
                .await
                .wrap_err_with(|| format!("failed to read disk usage of {instance}"))?;
            for op in DiskOperation::iter() {
                builder.push(&DISK, &[instance, op.as_str()], disk.require(op.as_str())?)?;
            }

            for interface in &server.interfaces {
                let usage = self
                    .client
                    .interface_usage(server, interface)
                    .await
                    .wrap_err_with(|| format!("failed to read usage of {instance} port {}", interface.port_id))?;
                for direction in Direction::iter() {
                    builder.push(
                        &INTERFACE,
                        &[instance, interface.mac_addr.as_str(), direction.as_str()],
                        usage.require(direction.as_str())?,
                    )?;
                }
            }
        }

        Ok(())
    }
}

impl Collector for ComputeCollector {
    fn describe(&self) -> &'static [MetricDescriptor] {
        DESCRIPTORS
    }

    fn collect<'a>(&'a self, builder: &'a mut SnapshotBuilder) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(self.collect_servers(builder))
    }

    fn name(&self) -> &'static str {
        "compute"
    }
}
