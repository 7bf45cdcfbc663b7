#![allow(dead_code)]

//! In-process stand-in for the ConoHa identity, compute, database-hosting
//! and account APIs, with hit counters for the assertions.

use axum::{
    extract::{
        Path,
        Query,
        State,
    },
    http::{
        HeaderMap,
        StatusCode,
    },
    routing::{
        get,
        post,
    },
    Json,
    Router,
};
use chrono::Utc;
use conoha_exporter::Config;
use serde_json::{
    json,
    Value,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        atomic::{
            AtomicBool,
            AtomicI64,
            AtomicUsize,
            Ordering,
        },
        Arc,
        Mutex,
    },
};
use tokio::{
    net::TcpListener,
    task::JoinHandle,
};

pub const TENANT: &str = "tenant-1";
pub const USERNAME: &str = "gncu12345678";
pub const PASSWORD: &str = "correct horse";
pub const REGION: &str = "tyo1";

/// Four rows per series; with the default offset of 3 the second row is reported.
const ROWS: usize = 4;

pub struct FakeDatabase {
    pub id: &'static str,
    pub name: &'static str,
    pub service: &'static str,
    pub size: f64,
}

pub struct UpstreamState {
    pub base: String,
    pub token_ttl_secs: AtomicI64,
    pub reject_credentials: AtomicBool,
    pub fail_database_detail: AtomicBool,
    pub tokens_issued: AtomicUsize,
    pub server_listings: AtomicUsize,
    pub quota_requests: Mutex<Vec<String>>,
    pub tokens_seen: Mutex<Vec<String>>,
    pub servers: Mutex<Vec<(&'static str, &'static str)>>,
    pub databases: Mutex<Vec<FakeDatabase>>,
    pub last_token_request: Mutex<Option<Value>>,
}

impl UpstreamState {
    pub fn tokens_issued(&self) -> usize {
        self.tokens_issued.load(Ordering::SeqCst)
    }

    pub fn set_token_ttl(&self, secs: i64) {
        self.token_ttl_secs.store(secs, Ordering::SeqCst);
    }

    pub fn quota_requests(&self) -> Vec<String> {
        self.quota_requests.lock().unwrap().clone()
    }

    pub fn tokens_seen(&self) -> Vec<String> {
        self.tokens_seen.lock().unwrap().clone()
    }
}

pub struct Upstream {
    pub addr: SocketAddr,
    pub state: Arc<UpstreamState>,
    handle: JoinHandle<()>,
}

impl Drop for Upstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl Upstream {
    /// One server with one interface, three databases across two services.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state = Arc::new(UpstreamState {
            base: format!("http://{addr}"),
            token_ttl_secs: AtomicI64::new(3600),
            reject_credentials: AtomicBool::new(false),
            fail_database_detail: AtomicBool::new(false),
            tokens_issued: AtomicUsize::new(0),
            server_listings: AtomicUsize::new(0),
            quota_requests: Mutex::new(Vec::new()),
            tokens_seen: Mutex::new(Vec::new()),
            servers: Mutex::new(vec![("server-1", "web-1")]),
            databases: Mutex::new(vec![
                FakeDatabase {
                    id: "db-1",
                    name: "app",
                    service: "svc-a",
                    size: 0.25,
                },
                FakeDatabase {
                    id: "db-2",
                    name: "wiki",
                    service: "svc-a",
                    size: 0.5,
                },
                FakeDatabase {
                    id: "db-3",
                    name: "blog",
                    service: "svc-b",
                    size: 1.0,
                },
            ]),
            last_token_request: Mutex::new(None),
        });

        let router = Router::new()
            .route("/v2.0/tokens", post(tokens))
            .route("/compute/v2/{tenant}/servers", get(servers))
            .route("/compute/v2/{tenant}/servers/{id}/os-interface", get(interfaces))
            .route("/compute/v2/{tenant}/servers/{id}/rrd/cpu", get(cpu))
            .route("/compute/v2/{tenant}/servers/{id}/rrd/disk", get(disk))
            .route("/compute/v2/{tenant}/servers/{id}/rrd/interface", get(interface))
            .route("/database/v1/databases", get(databases))
            .route("/database/v1/databases/{id}", get(database))
            .route("/database/v1/services/{id}/quotas", get(quota))
            .route("/account/v1/{tenant}/object-storage/rrd/request", get(object_storage_requests))
            .route("/account/v1/{tenant}/object-storage/rrd/size", get(object_storage_size))
            .route("/account/v1/{tenant}/payment-summary", get(payment_summary))
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, state, handle }
    }

    pub fn identity_url(&self) -> String {
        format!("{}/v2.0/tokens", self.state.base)
    }

    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.region = REGION.to_string();
        config.tenant_id = TENANT.to_string();
        config.username = USERNAME.to_string();
        config.password = PASSWORD.to_string();
        config.identity_url = Some(self.identity_url().parse().unwrap());
        config.listen_address = "127.0.0.1:0".parse().unwrap();
        config
    }
}

type Reply = Result<Json<Value>, StatusCode>;

fn authorize(state: &UpstreamState, headers: &HeaderMap) -> Result<(), StatusCode> {
    let token = headers
        .get("x-auth-token")
        .and_then(|value| value.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;
    if !token.starts_with("token-") {
        return Err(StatusCode::UNAUTHORIZED);
    }
    state.tokens_seen.lock().unwrap().push(token.to_string());
    Ok(())
}

/// `schema` after the timestamp; row `i` holds `base * i` for each field,
/// except the newest row, which is still provisional and holds `null`.
fn series(key: &str, fields: &[(&str, f64)]) -> Value {
    let schema: Vec<&str> = std::iter::once("unixtime").chain(fields.iter().map(|(name, _)| *name)).collect();
    let start = Utc::now().timestamp() - 300 * ROWS as i64;
    let rows: Vec<Vec<Option<f64>>> = (0..ROWS)
        .map(|i| {
            std::iter::once(Some((start + 300 * i as i64) as f64))
                .chain(
                    fields
                        .iter()
                        .map(|(_, base)| (i + 1 < ROWS).then(|| base * i as f64)),
                )
                .collect()
        })
        .collect();
    json!({ key: { "schema": schema, "data": rows } })
}

async fn tokens(State(state): State<Arc<UpstreamState>>, Json(body): Json<Value>) -> Reply {
    *state.last_token_request.lock().unwrap() = Some(body.clone());

    let credentials = &body["auth"]["passwordCredentials"];
    if state.reject_credentials.load(Ordering::SeqCst)
        || body["auth"]["tenantId"] != TENANT
        || credentials["username"] != USERNAME
        || credentials["password"] != PASSWORD
    {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let n = state.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
    let expires = Utc::now() + chrono::Duration::seconds(state.token_ttl_secs.load(Ordering::SeqCst));
    let base = &state.base;
    let endpoint = |path: String| json!([{ "region": REGION, "publicURL": format!("{base}{path}") }]);

    Ok(Json(json!({
        "access": {
            "token": { "id": format!("token-{n}"), "expires": expires.to_rfc3339() },
            "serviceCatalog": [
                { "type": "account", "name": "Account Service", "endpoints": endpoint(format!("/account/v1/{TENANT}")) },
                { "type": "compute", "name": "Compute Service", "endpoints": endpoint(format!("/compute/v2/{TENANT}")) },
                { "type": "databasehosting", "name": "Database Hosting Service", "endpoints": endpoint("/database/v1".to_string()) },
                { "type": "identity", "name": "Identity Service", "endpoints": endpoint("/v2.0".to_string()) },
            ],
        }
    })))
}

async fn servers(State(state): State<Arc<UpstreamState>>, headers: HeaderMap) -> Reply {
    authorize(&state, &headers)?;
    state.server_listings.fetch_add(1, Ordering::SeqCst);
    let servers: Vec<Value> = state
        .servers
        .lock()
        .unwrap()
        .iter()
        .map(|(id, name)| json!({ "id": id, "name": name, "links": [] }))
        .collect();
    Ok(Json(json!({ "servers": servers })))
}

async fn interfaces(
    State(state): State<Arc<UpstreamState>>,
    Path((_, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Reply {
    authorize(&state, &headers)?;
    Ok(Json(json!({
        "interfaceAttachments": [{
            "port_id": format!("port-{id}"),
            "mac_addr": "fa:16:3e:00:00:01",
            "net_id": "net-1",
            "port_state": "ACTIVE",
        }]
    })))
}

async fn cpu(State(state): State<Arc<UpstreamState>>, headers: HeaderMap) -> Reply {
    authorize(&state, &headers)?;
    Ok(Json(series("cpu", &[("value", 1.0)])))
}

async fn disk(State(state): State<Arc<UpstreamState>>, headers: HeaderMap) -> Reply {
    authorize(&state, &headers)?;
    Ok(Json(series("disk", &[("read", 10.0), ("write", 20.0)])))
}

async fn interface(
    State(state): State<Arc<UpstreamState>>,
    Path((_, id)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Reply {
    authorize(&state, &headers)?;
    if query.get("port_id") != Some(&format!("port-{id}")) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(series("interface", &[("rx", 100.0), ("tx", 200.0)])))
}

async fn databases(State(state): State<Arc<UpstreamState>>, headers: HeaderMap) -> Reply {
    authorize(&state, &headers)?;
    let databases: Vec<Value> = state.databases.lock().unwrap().iter().map(database_json).collect();
    Ok(Json(json!({ "databases": databases })))
}

async fn database(
    State(state): State<Arc<UpstreamState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Reply {
    authorize(&state, &headers)?;
    if state.fail_database_detail.load(Ordering::SeqCst) {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    let databases = state.databases.lock().unwrap();
    let database = databases
        .iter()
        .find(|database| database.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({ "database": database_json(database) })))
}

fn database_json(database: &FakeDatabase) -> Value {
    json!({
        "database_id": database.id,
        "db_name": database.name,
        "db_size": database.size,
        "service_id": database.service,
        "status": "ACTIVE",
        "type": "mysql",
        "charset": "utf8",
        "memo": null,
        "internal_hostname": null,
        "external_hostname": format!("{}.example.jp", database.name),
    })
}

async fn quota(State(state): State<Arc<UpstreamState>>, Path(id): Path<String>, headers: HeaderMap) -> Reply {
    authorize(&state, &headers)?;
    state.quota_requests.lock().unwrap().push(id.clone());
    let total_usage: f64 = state
        .databases
        .lock()
        .unwrap()
        .iter()
        .filter(|database| database.service == id)
        .map(|database| database.size)
        .sum();
    Ok(Json(json!({ "quota": { "total_usage": total_usage, "quota": 10 } })))
}

async fn object_storage_requests(State(state): State<Arc<UpstreamState>>, headers: HeaderMap) -> Reply {
    authorize(&state, &headers)?;
    Ok(Json(series("request", &[("get", 5.0), ("put", 3.0), ("delete", 1.0)])))
}

async fn object_storage_size(State(state): State<Arc<UpstreamState>>, headers: HeaderMap) -> Reply {
    authorize(&state, &headers)?;
    Ok(Json(series("size", &[("size", 4096.0)])))
}

async fn payment_summary(State(state): State<Arc<UpstreamState>>, headers: HeaderMap) -> Reply {
    authorize(&state, &headers)?;
    Ok(Json(json!({
        "payment_summary": { "total_deposit_amount": 1200, "currency": "JPY" }
    })))
}
