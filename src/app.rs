use color_eyre::Result;
use conoha_client::ConohaClient;
use conoha_collector::{
    BillingCollector,
    Collector,
    ComputeCollector,
    DatabaseCollector,
    ObjectStorageCollector,
    SnapshotCollector,
};
use conoha_exporter_config::Config;
use conoha_exporter_http::create_router;
use eyre::WrapErr as _;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        config.validate().wrap_err("invalid configuration")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Authenticate, wire up the enabled collectors and complete one refresh.
    ///
    /// Any failure here is fatal: the exporter never serves without having
    /// seen the account once.
    pub async fn prepare(&self) -> Result<Arc<SnapshotCollector>> {
        let client = ConohaClient::connect(self.config.client_options())
            .await
            .wrap_err_with(|| format!("failed to connect to ConoHa region {}", self.config.region))?;
        let client = Arc::new(client);

        let collect = self.config.collect;
        let mut collectors: Vec<Box<dyn Collector>> = Vec::new();
        if collect.compute {
            collectors.push(Box::new(ComputeCollector::new(client.clone())));
        }
        if collect.object_storage {
            collectors.push(Box::new(ObjectStorageCollector::new(client.clone())));
        }
        if collect.database {
            collectors.push(Box::new(DatabaseCollector::new(client.clone())));
        }
        if collect.billing {
            collectors.push(Box::new(BillingCollector::new(client.clone())));
        }

        let collector = Arc::new(SnapshotCollector::new(collectors, self.config.refresh_interval));
        let snapshot = collector.refresh().await.wrap_err("initial refresh failed")?;
        info!(samples = snapshot.len(), "initial snapshot ready");

        Ok(collector)
    }

    /// Serve until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        info!(
            region = %self.config.region,
            listen_address = %self.config.listen_address,
            "starting ConoHa exporter"
        );
        let collector = self.prepare().await?;
        let listener = TcpListener::bind(self.config.listen_address)
            .await
            .wrap_err_with(|| format!("failed to bind {}", self.config.listen_address))?;

        let cancel = CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => info!("received Ctrl-C, shutting down"),
                    Err(err) => error!("failed to listen for Ctrl-C: {err}"),
                }
                cancel.cancel();
            }
        });

        serve(collector, listener, cancel).await
    }
}

/// Run the refresh loop and the HTTP server until `cancel` fires.
pub async fn serve(collector: Arc<SnapshotCollector>, listener: TcpListener, cancel: CancellationToken) -> Result<()> {
    let refresh = tokio::spawn({
        let collector = collector.clone();
        let cancel = cancel.clone();
        async move { collector.run(cancel).await }
    });

    info!("listening on {}", listener.local_addr()?);
    let served = axum::serve(listener, create_router(collector))
        .with_graceful_shutdown(cancel.clone().cancelled_owned())
        .await;

    cancel.cancel();
    refresh.await.wrap_err("refresh loop panicked")?;
    served.wrap_err("HTTP server failed")
}
