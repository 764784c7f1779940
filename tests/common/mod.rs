//! Shared fixtures: an in-memory id store and a mock shard master that also
//! serves volume blobs, both counting the calls they receive.
//! Note: #[allow(dead_code)] because each test file compiles common/ separately.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use image_gateway::{
    config::AppConfig,
    models::resize::OutputFormat,
    services::{
        gateway_service::GatewayService,
        id_resolver::{IdStore, IdStoreError},
    },
};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use std::{
    collections::HashMap,
    io::Cursor,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::net::TcpListener;

/// Id store backed by a map.
#[derive(Default)]
pub struct MemoryIdStore {
    values: Mutex<HashMap<String, String>>,
    pub get_calls: AtomicUsize,
    /// Make `ping` report the store as down.
    pub ping_fails: AtomicBool,
}

impl MemoryIdStore {
    pub fn insert(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }

    pub fn gets(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdStore for MemoryIdStore {
    async fn get(&self, key: &str) -> Result<Option<String>, IdStoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.values.lock().get(key).cloned())
    }

    async fn ping(&self) -> Result<(), IdStoreError> {
        if self.ping_fails.load(Ordering::SeqCst) {
            return Err(IdStoreError::Other("connection refused".into()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct UpstreamState {
    /// shard → host; absent shards get an empty location list.
    volumes: Mutex<HashMap<String, String>>,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    lookup_delay: Mutex<Duration>,
    blob_delay: Mutex<Duration>,
    pub lookup_calls: AtomicUsize,
    pub blob_calls: AtomicUsize,
}

/// Mock shard master + volume server on an ephemeral port.
pub struct MockUpstream {
    pub addr: SocketAddr,
    pub state: Arc<UpstreamState>,
}

#[derive(Deserialize)]
struct LookupQuery {
    #[serde(rename = "volumeId")]
    volume_id: String,
}

async fn lookup(
    State(state): State<Arc<UpstreamState>>,
    Query(q): Query<LookupQuery>,
) -> Response {
    state.lookup_calls.fetch_add(1, Ordering::SeqCst);
    let delay = *state.lookup_delay.lock();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let host = state.volumes.lock().get(&q.volume_id).cloned();
    match host {
        Some(host) => axum::Json(json!({
            "locations": [{ "publicUrl": host, "url": "internal:8080" }]
        }))
        .into_response(),
        None => axum::Json(json!({ "locations": [] })).into_response(),
    }
}

async fn blob(State(state): State<Arc<UpstreamState>>, Path(fid): Path<String>) -> Response {
    state.blob_calls.fetch_add(1, Ordering::SeqCst);
    let delay = *state.blob_delay.lock();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let bytes = state.blobs.lock().get(&fid).cloned();
    match bytes {
        Some(bytes) => Response::new(Body::from(bytes)),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

impl MockUpstream {
    pub async fn start() -> Self {
        let state = Arc::new(UpstreamState::default());
        let router = Router::new()
            .route("/dir/lookup", get(lookup))
            .route("/{fid}", get(blob))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, state }
    }

    /// `host:port` of this server, as the master reports it.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    /// Make `shard` resolve to this server.
    pub fn serve_volume(&self, shard: &str) {
        self.state.volumes.lock().insert(shard.to_string(), self.host());
    }

    pub fn put_blob(&self, fid: &str, bytes: Vec<u8>) {
        self.state.blobs.lock().insert(fid.to_string(), bytes);
    }

    pub fn set_lookup_delay(&self, delay: Duration) {
        *self.state.lookup_delay.lock() = delay;
    }

    pub fn set_blob_delay(&self, delay: Duration) {
        *self.state.blob_delay.lock() = delay;
    }

    pub fn lookups(&self) -> usize {
        self.state.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn blob_fetches(&self) -> usize {
        self.state.blob_calls.load(Ordering::SeqCst)
    }
}

pub fn test_config(master_addr: String) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        redis_url: "redis://unused".into(),
        master_addr,
        default_width: 1000,
        output_format: OutputFormat::Webp,
        quality: 95,
        blur: 0.8,
        upstream_timeout: Duration::from_secs(5),
        location_ttl: None,
        max_concurrent_transforms: 2,
    }
}

/// Gateway router wired to `upstream` and `store`.
pub fn gateway(upstream: &MockUpstream, store: Arc<MemoryIdStore>) -> Router {
    let service = GatewayService::new(&test_config(upstream.host()), store).unwrap();
    image_gateway::app(service)
}

/// PNG-encoded gradient of the given size.
pub fn png_image(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 251) as u8, (y % 241) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}
