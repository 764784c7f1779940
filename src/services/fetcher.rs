//! Blob fetches from volume servers. Bytes are never cached.

use crate::errors::{GatewayError, GatewayResult};
use bytes::Bytes;
use reqwest::Client;

#[derive(Clone)]
pub struct BlobFetcher {
    client: Client,
}

impl BlobFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// GET `url` and read the whole body. Non-2xx replies and truncated
    /// bodies both fail; there is no partial success.
    pub async fn fetch(&self, url: &str) -> GatewayResult<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| GatewayError::FetchFailed(format!("GET {}: {}", url, err)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::FetchFailed(format!(
                "GET {} returned {}",
                url, status
            )));
        }

        response
            .bytes()
            .await
            .map_err(|err| GatewayError::FetchFailed(format!("reading body of {}: {}", url, err)))
    }
}
