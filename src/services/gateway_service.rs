//! GatewayService: one request in, one resized image out.
//!
//! Chains id resolution, shard resolution, blob fetch and the resize
//! pipeline strictly in order. The first failure short-circuits the chain;
//! nothing is retried. CPU work runs on the blocking pool, bounded by a
//! semaphore so that concurrent transforms cannot exhaust the host.

use crate::{
    config::AppConfig,
    errors::{GatewayError, GatewayResult},
    models::resize::ResizeSpec,
    services::{
        fetcher::BlobFetcher,
        id_resolver::{IdResolver, IdStore},
        location_cache::LocationCache,
        resize_pipeline::{ResizePipeline, ResizedImage},
        shard_resolver::ShardResolver,
    },
};
use bytes::Bytes;
use std::{sync::Arc, time::Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct GatewayService {
    pub ids: IdResolver,
    pub shards: ShardResolver,
    pub fetcher: BlobFetcher,
    pub pipeline: ResizePipeline,
    pub default_width: u32,
    transform_permits: Arc<Semaphore>,
}

impl GatewayService {
    /// Wire every component from `cfg`. The single `reqwest::Client` is
    /// shared by the shard resolver and the fetcher.
    pub fn new(cfg: &AppConfig, store: Arc<dyn IdStore>) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.upstream_timeout)
            .build()
            .map_err(|err| GatewayError::UpstreamUnavailable(format!("http client: {}", err)))?;
        let cache = Arc::new(LocationCache::new(cfg.location_ttl));

        Ok(Self {
            ids: IdResolver::new(store, cfg.upstream_timeout),
            shards: ShardResolver::new(client.clone(), cfg.master_url(), cache),
            fetcher: BlobFetcher::new(client),
            pipeline: ResizePipeline::new(cfg.output_format, cfg.quality, cfg.blur),
            default_width: cfg.default_width,
            transform_permits: Arc::new(Semaphore::new(cfg.max_concurrent_transforms)),
        })
    }

    /// Serve `request_id` at the width given by the raw `w` parameter.
    pub async fn handle(
        &self,
        request_id: &str,
        width_param: Option<&str>,
    ) -> GatewayResult<ResizedImage> {
        let started = Instant::now();
        let result = self.run(request_id, width_param, started).await;
        if let Err(err) = &result {
            warn!(
                request_id,
                stage = err.stage(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "image request failed: {}",
                err
            );
        }
        result
    }

    async fn run(
        &self,
        request_id: &str,
        width_param: Option<&str>,
        started: Instant,
    ) -> GatewayResult<ResizedImage> {
        let spec = ResizeSpec::from_query(width_param, self.default_width)?;

        let fid = self.ids.resolve(request_id).await?;
        let location = self.shards.resolve_host(fid.shard_id()).await?;
        let url = location.blob_url(&fid);
        debug!("id:{} -> url:{}", request_id, url);

        let raw = self.fetcher.fetch(&url).await?;
        let resized = self.transform(raw, spec.target_width).await?;

        info!(
            request_id,
            fid = %fid,
            width = spec.target_width,
            height = resized.height,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "resized image"
        );
        Ok(resized)
    }

    async fn transform(&self, raw: Bytes, target_width: u32) -> GatewayResult<ResizedImage> {
        let _permit = self
            .transform_permits
            .acquire()
            .await
            .map_err(|_| GatewayError::ResizeFailed("transform pool closed".into()))?;

        let pipeline = self.pipeline;
        tokio::task::spawn_blocking(move || pipeline.transform(&raw, target_width))
            .await
            .map_err(|err| GatewayError::ResizeFailed(format!("transform task aborted: {}", err)))?
    }
}
