//! Request id → content-file-id resolution against the key-value store.

use crate::{
    errors::{GatewayError, GatewayResult},
    models::file_id::ContentFileId,
};
use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::time::timeout;

#[derive(Debug, Error)]
pub enum IdStoreError {
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
    #[error("stored value is not valid UTF-8")]
    InvalidValue,
    #[error("{0}")]
    Other(String),
}

/// Point-lookup key-value store holding `request id → content-file-id`.
#[async_trait]
pub trait IdStore: Send + Sync {
    /// `Ok(None)` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, IdStoreError>;

    /// Cheap round trip used by readiness checks.
    async fn ping(&self) -> Result<(), IdStoreError>;
}

/// Redis-backed store. `ConnectionManager` multiplexes one connection and
/// reconnects on failure; each call works on its own clone of the handle.
#[derive(Clone)]
pub struct RedisIdStore {
    manager: ConnectionManager,
}

impl RedisIdStore {
    /// Connect once at startup. Failing here is fatal for the process.
    pub async fn connect(url: &str) -> Result<Self, IdStoreError> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl IdStore for RedisIdStore {
    async fn get(&self, key: &str) -> Result<Option<String>, IdStoreError> {
        let mut conn = self.manager.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        value
            .map(|bytes| String::from_utf8(bytes).map_err(|_| IdStoreError::InvalidValue))
            .transpose()
    }

    async fn ping(&self) -> Result<(), IdStoreError> {
        let mut conn = self.manager.clone();
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        if reply == "PONG" {
            Ok(())
        } else {
            Err(IdStoreError::Other(format!("unexpected PING reply `{}`", reply)))
        }
    }
}

/// Resolves opaque request ids with a single bounded lookup; no retries.
#[derive(Clone)]
pub struct IdResolver {
    store: Arc<dyn IdStore>,
    timeout: Duration,
}

impl IdResolver {
    pub fn new(store: Arc<dyn IdStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn store(&self) -> &Arc<dyn IdStore> {
        &self.store
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn resolve(&self, request_id: &str) -> GatewayResult<ContentFileId> {
        let value = timeout(self.timeout, self.store.get(request_id))
            .await
            .map_err(|_| {
                GatewayError::UpstreamUnavailable(format!(
                    "id store GET timed out after {:?}",
                    self.timeout
                ))
            })?
            .map_err(|err| GatewayError::UpstreamUnavailable(format!("id store GET failed: {}", err)))?;

        match value {
            Some(raw) => ContentFileId::parse(&raw),
            None => Err(GatewayError::NotFound(request_id.to_string())),
        }
    }
}
