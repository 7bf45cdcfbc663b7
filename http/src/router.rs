use crate::{
    error::AppError,
    exposition,
};
use axum::{
    extract::State,
    http::header,
    response::{
        Html,
        IntoResponse,
    },
    routing::get,
    Json,
    Router,
};
use conoha_collector::SnapshotCollector;
use prometheus_client::registry::Registry;
use serde::Serialize;
use std::sync::Arc;

const INDEX_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>ConoHa Exporter</title>
</head>
<body>
    <h1>ConoHa Exporter</h1>
    <p><a href="/metrics">Metrics</a></p>
</body>
</html>
"#;

#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<SnapshotCollector>,
    pub registry: Arc<Registry>,
}

pub fn create_router(collector: Arc<SnapshotCollector>) -> Router {
    let registry = Arc::new(exposition::registry(collector.clone()));
    let state = AppState { collector, registry };

    Router::new()
        .route("/", get(index))
        .route("/metrics", get(metrics))
        .route("/status", get(status))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

/// Render the published snapshot together with the live refresh health.
async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = exposition::render(&state.registry)?;
    trace!(
        generation = state.collector.current_snapshot().generation(),
        bytes = body.len(),
        "served metrics"
    );

    Ok(([(header::CONTENT_TYPE, exposition::CONTENT_TYPE)], body))
}

#[derive(Serialize)]
struct StatusBody {
    #[serde(flatten)]
    status: conoha_collector::CollectorStatus,
    samples: usize,
    collectors: Vec<&'static str>,
    interval_secs: u64,
}

async fn status(State(state): State<AppState>) -> Json<StatusBody> {
    let collector = &state.collector;
    Json(StatusBody {
        status: collector.status(),
        samples: collector.current_snapshot().len(),
        collectors: collector.collector_names(),
        interval_secs: collector.interval().as_secs(),
    })
}

async fn healthz() -> &'static str {
    "ok"
}
