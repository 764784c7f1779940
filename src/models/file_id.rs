//! Represents a content-file-id as returned by the id store.

use crate::errors::{GatewayError, GatewayResult};
use std::fmt;

/// Two-part blob identifier of the form `<shardId>,<objectId>`.
///
/// The shard part selects the volume (and therefore the host) holding the
/// blob; the whole string is the path used when fetching it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFileId {
    raw: String,
    split: usize,
}

impl ContentFileId {
    /// Parse a raw store value, trimming surrounding whitespace.
    ///
    /// The shard is everything before the first `,`. Values without a
    /// separator or with an empty shard/object part cannot be located.
    pub fn parse(value: &str) -> GatewayResult<Self> {
        let raw = value.trim();
        let split = raw.find(',').ok_or_else(|| {
            GatewayError::VolumeLookupFailed(format!("malformed content-file-id `{}`", raw))
        })?;
        if split == 0 || split + 1 == raw.len() {
            return Err(GatewayError::VolumeLookupFailed(format!(
                "malformed content-file-id `{}`",
                raw
            )));
        }
        Ok(Self {
            raw: raw.to_string(),
            split,
        })
    }

    /// Volume/shard identifier.
    pub fn shard_id(&self) -> &str {
        &self.raw[..self.split]
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ContentFileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
