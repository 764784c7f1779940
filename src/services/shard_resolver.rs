//! Shard id → host resolution through the shard master, fronted by the
//! location cache.

use crate::{
    errors::{GatewayError, GatewayResult},
    models::location::{ShardLocation, VolumeLookup},
    services::location_cache::LocationCache,
};
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct ShardResolver {
    client: Client,
    /// e.g. `http://master:9333`
    master_url: String,
    cache: Arc<LocationCache>,
}

impl ShardResolver {
    pub fn new(client: Client, master_url: impl Into<String>, cache: Arc<LocationCache>) -> Self {
        Self {
            client,
            master_url: master_url.into(),
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<LocationCache> {
        &self.cache
    }

    /// Cached location for `shard_id`, asking the master on a miss.
    pub async fn resolve_host(&self, shard_id: &str) -> GatewayResult<ShardLocation> {
        self.cache
            .get_or_try_resolve(shard_id, || self.lookup(shard_id))
            .await
    }

    /// `GET <master>/dir/lookup?volumeId=<shard>`; every failure is a
    /// `VolumeLookupFailed` and is left out of the cache by the caller.
    async fn lookup(&self, shard_id: &str) -> GatewayResult<ShardLocation> {
        let url = format!("{}/dir/lookup", self.master_url);
        let failed = |reason: String| {
            GatewayError::VolumeLookupFailed(format!("volume {}: {}", shard_id, reason))
        };

        let response = self
            .client
            .get(&url)
            .query(&[("volumeId", shard_id)])
            .send()
            .await
            .map_err(|err| failed(err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| failed(err.to_string()))?;
        let reply: VolumeLookup = serde_json::from_slice(&body)
            .map_err(|err| failed(format!("malformed master reply (status {}): {}", status, err)))?;

        if !status.is_success() {
            let reason = reply.error.unwrap_or_else(|| "no reason given".into());
            return Err(failed(format!("master returned {}: {}", status, reason)));
        }

        let location = reply
            .first_location()
            .ok_or_else(|| failed("master returned no locations".into()))?;
        debug!("volume {} resolved to {}", shard_id, location.host);
        Ok(location)
    }
}
