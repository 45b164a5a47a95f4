// tests/common/mod.rs
//
// In-process stand-in for the source registry and its object store.
// Serves /ping, the credential endpoints, /client/{id}/source and signed
// blob URLs (/blob/{*key}) on an ephemeral port.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path as UrlPath, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDateTime;
use parking_lot::Mutex;
use serde_json::{json, Value};

use wildfire_augment::augment::clock::Clock;
use wildfire_augment::config::AugmentConfig;
use wildfire_augment::registry::{Protocol, RegistryConfig, SourceData};

pub const TOKEN: &str = "test-token";

/// Clock pinned to one instant so artifact names are predictable.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[derive(Default)]
pub struct FakeState {
    pub base: Mutex<String>,
    pub sources: Mutex<Vec<SourceData>>,
    pub blobs: Mutex<HashMap<String, Vec<u8>>>,
    pub down: AtomicBool,
    pub fail_uploads: AtomicBool,
    /// Reject uploads whose key contains this fragment.
    pub fail_uploads_matching: Mutex<Option<String>>,
    /// Hold uploads whose key contains the fragment for the given delay.
    pub slow_uploads_matching: Mutex<Option<(String, Duration)>>,
    /// Echo a different name on registration.
    pub corrupt_register: AtomicBool,
    /// Leave `protocol` out of the registration echo.
    pub partial_register: AtomicBool,
}

pub struct FakeRegistry {
    pub state: Arc<FakeState>,
    pub port: u16,
}

impl FakeRegistry {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake registry");
        let port = listener.local_addr().expect("local addr").port();
        *state.base.lock() = format!("http://127.0.0.1:{port}");

        let app = Router::new()
            .route("/ping", get(ping))
            .route("/client/{id}/upload-credentials", get(credentials))
            .route("/client/{id}/download-credentials", get(credentials))
            .route("/client/{id}/source", get(list_sources).post(register_source))
            .route("/blob/{*key}", get(get_blob).put(put_blob))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve fake registry");
        });

        Self { state, port }
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            scheme: "http".into(),
            host: "127.0.0.1".into(),
            port: self.port,
            auth_token: TOKEN.into(),
            client_id: 1,
            request_timeout: Duration::from_secs(5),
        }
    }

    pub fn augment_config(&self, protocol: Protocol, work_dir: &Path) -> AugmentConfig {
        AugmentConfig {
            job_id: "1".into(),
            tracer_id: "trace-1".into(),
            work_dir: work_dir.join("work"),
            storage_protocol: protocol,
            local_data_dir: work_dir.join("data"),
            run_budget: Duration::from_secs(30),
            registry: self.registry_config(),
        }
    }

    /// Register a source and put its bytes behind the blob store.
    pub fn seed(&self, relative_path: &str, content: &Value) {
        let name = relative_path.rsplit('/').next().unwrap_or(relative_path);
        self.state
            .sources
            .lock()
            .push(SourceData::new(name, Protocol::S3, relative_path));
        self.state
            .blobs
            .lock()
            .insert(relative_path.to_string(), content.to_string().into_bytes());
    }

    pub fn blob_json(&self, relative_path: &str) -> Option<Value> {
        self.state
            .blobs
            .lock()
            .get(relative_path)
            .map(|b| serde_json::from_slice(b).expect("blob is json"))
    }

    /// Relative paths of every blob under `prefix`, sorted.
    pub fn blobs_under(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .state
            .blobs
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn registered_under(&self, prefix: &str) -> Vec<SourceData> {
        self.state
            .sources
            .lock()
            .iter()
            .filter(|s| s.relative_path.starts_with(prefix))
            .cloned()
            .collect()
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("x-auth-token").and_then(|v| v.to_str().ok()) == Some(TOKEN)
}

async fn ping(State(state): State<Arc<FakeState>>) -> StatusCode {
    if state.down.load(Ordering::SeqCst) {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

async fn credentials(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let Some(path) = q.get("relative_path") else {
        return (StatusCode::UNPROCESSABLE_ENTITY, "relative_path missing").into_response();
    };
    let base = state.base.lock().clone();
    Json(json!({ "signed_url": format!("{base}/blob/{path}") })).into_response()
}

async fn list_sources(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let list = state.sources.lock().clone();
    Json(json!({ "source_data_list": list })).into_response()
}

async fn register_source(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let field = |k: &str| q.get(k).cloned().unwrap_or_default();
    let (name, protocol, relative_path) = (
        field("source_data_name"),
        field("source_data_protocol"),
        field("source_data_relative_path"),
    );

    let echoed_name = if state.corrupt_register.load(Ordering::SeqCst) {
        format!("{name}-corrupted")
    } else {
        name.clone()
    };
    if state.partial_register.load(Ordering::SeqCst) {
        return Json(json!({ "source_data": { "name": echoed_name, "relative_path": relative_path } }))
            .into_response();
    }

    if let Ok(p) = protocol.parse::<Protocol>() {
        state
            .sources
            .lock()
            .push(SourceData::new(name, p, relative_path.clone()));
    }
    Json(json!({
        "source_data": { "name": echoed_name, "protocol": protocol, "relative_path": relative_path }
    }))
    .into_response()
}

async fn put_blob(
    State(state): State<Arc<FakeState>>,
    UrlPath(key): UrlPath<String>,
    body: Bytes,
) -> StatusCode {
    if state.fail_uploads.load(Ordering::SeqCst) {
        return StatusCode::FORBIDDEN;
    }
    if let Some(fragment) = state.fail_uploads_matching.lock().as_deref() {
        if key.contains(fragment) {
            return StatusCode::FORBIDDEN;
        }
    }
    let delay = state
        .slow_uploads_matching
        .lock()
        .as_ref()
        .filter(|(fragment, _)| key.contains(fragment.as_str()))
        .map(|(_, d)| *d);
    if let Some(d) = delay {
        tokio::time::sleep(d).await;
    }
    state.blobs.lock().insert(key, body.to_vec());
    StatusCode::OK
}

async fn get_blob(State(state): State<Arc<FakeState>>, UrlPath(key): UrlPath<String>) -> Response {
    match state.blobs.lock().get(&key) {
        Some(bytes) => (StatusCode::OK, bytes.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "no such object").into_response(),
    }
}

// --- fixtures ---

pub fn detections(rows: &[(f64, f64, &str)]) -> Value {
    let mut table = serde_json::Map::new();
    for (i, (lat, lon, status)) in rows.iter().enumerate() {
        table.insert(
            i.to_string(),
            json!({ "latitude": lat, "longitude": lon, "status": status }),
        );
    }
    Value::Object(table)
}

/// (year, month name, day, disaster type, title)
pub fn posts(body_column: &str, rows: &[(i64, &str, i64, &str, &str)]) -> Value {
    let mut table = serde_json::Map::new();
    for (i, (year, month, day, disaster, title)) in rows.iter().enumerate() {
        table.insert(
            i.to_string(),
            json!({
                "Title": title,
                body_column: format!("{title} body"),
                "Extracted_Location": "Attica",
                "Resolved_Latitude": 38.1,
                "Resolved_Longitude": 23.7,
                "Month": month,
                "Day": day,
                "Year": year,
                "Disaster_Type": disaster
            }),
        );
    }
    Value::Object(table)
}
