//! Shard locations and the shard-master lookup reply.

use serde::Deserialize;

use super::file_id::ContentFileId;

/// A reachable address for one shard, e.g. `host-a:8765` or
/// `https://volume.example.com`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardLocation {
    pub host: String,
}

impl ShardLocation {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// Blob URL for `fid` on this shard; plain `http` unless the host names a scheme.
    pub fn blob_url(&self, fid: &ContentFileId) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}/{}", host, fid.as_str())
        } else {
            format!("http://{}/{}", host, fid.as_str())
        }
    }
}

/// Reply body of `GET /dir/lookup?volumeId=<shard>`.
///
/// `{"locations":[{"publicUrl":"node5:8765","url":"localhost:8765"}]}`
#[derive(Debug, Deserialize)]
pub struct VolumeLookup {
    #[serde(default)]
    pub locations: Vec<VolumeLocation>,
    /// Set by the master when the volume is unknown.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VolumeLocation {
    #[serde(rename = "publicUrl", default)]
    pub public_url: String,
    #[serde(default)]
    pub url: String,
}

impl VolumeLookup {
    /// First location is authoritative; its public address wins over the internal one.
    pub fn first_location(&self) -> Option<ShardLocation> {
        let first = self.locations.first()?;
        let host = if first.public_url.is_empty() {
            &first.url
        } else {
            &first.public_url
        };
        (!host.is_empty()).then(|| ShardLocation::new(host.clone()))
    }
}
