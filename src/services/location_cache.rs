//! Process-wide `shard id → location` cache with single-flight resolution.
//!
//! A shard is either resolved or has one resolution in flight. The first
//! caller to miss becomes the leader and runs the upstream lookup; callers
//! that arrive meanwhile subscribe to the leader's `watch` channel and
//! receive the same outcome, success or failure. The map lock only guards
//! entry lookup/insertion and is never held across an await.
//!
//! Only successes are stored. On failure the in-flight entry is removed, so
//! the next request after the outcome runs a fresh lookup. If the leader is
//! dropped mid-flight its entry is removed too and one waiter takes over.

use crate::{errors::GatewayResult, models::location::ShardLocation};
use parking_lot::RwLock;
use std::{collections::HashMap, future::Future, time::Duration};
use tokio::{sync::watch, time::Instant};
use tracing::debug;

type Outcome = Option<GatewayResult<ShardLocation>>;

#[derive(Debug, Clone)]
struct Resolved {
    location: ShardLocation,
    resolved_at: Instant,
}

#[derive(Debug)]
enum Entry {
    Ready(Resolved),
    InFlight(watch::Receiver<Outcome>),
}

enum Join {
    Hit(ShardLocation),
    Lead(watch::Sender<Outcome>),
    Follow(watch::Receiver<Outcome>),
}

#[derive(Debug)]
pub struct LocationCache {
    entries: RwLock<HashMap<String, Entry>>,
    /// `None` keeps entries for the process lifetime.
    ttl: Option<Duration>,
}

impl LocationCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Fresh cached location, if any. Never blocks on an in-flight resolution.
    pub fn get(&self, shard_id: &str) -> Option<ShardLocation> {
        match self.entries.read().get(shard_id) {
            Some(Entry::Ready(resolved)) if !self.is_expired(resolved) => {
                Some(resolved.location.clone())
            }
            _ => None,
        }
    }

    /// Return the cached location or run `resolve` to fill it.
    ///
    /// At most one `resolve` runs per shard at a time; callers that arrive
    /// while it is running receive its result instead of running their own.
    pub async fn get_or_try_resolve<F, Fut>(
        &self,
        shard_id: &str,
        resolve: F,
    ) -> GatewayResult<ShardLocation>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GatewayResult<ShardLocation>>,
    {
        let tx = loop {
            match self.join(shard_id) {
                Join::Hit(location) => return Ok(location),
                Join::Lead(tx) => break tx,
                Join::Follow(mut rx) => {
                    if let Ok(outcome) = rx.wait_for(Option::is_some).await {
                        if let Some(result) = outcome.as_ref() {
                            return result.clone();
                        }
                    }
                    debug!("leader for shard {} went away, taking over", shard_id);
                }
            }
        };

        let flight = Flight {
            cache: self,
            shard_id,
            tx: Some(tx),
        };
        debug!("location cache miss for shard {}", shard_id);
        let result = resolve().await;
        flight.finish(&result);
        result
    }

    /// Number of shards with a resolved location.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|entry| matches!(entry, Entry::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of shards tracked at all, resolved or in flight.
    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.entries.read().len()
    }

    fn join(&self, shard_id: &str) -> Join {
        let mut entries = self.entries.write();
        match entries.get(shard_id) {
            Some(Entry::Ready(resolved)) if !self.is_expired(resolved) => {
                return Join::Hit(resolved.location.clone());
            }
            Some(Entry::Ready(_)) => debug!("location for shard {} expired", shard_id),
            Some(Entry::InFlight(rx)) => return Join::Follow(rx.clone()),
            None => {}
        }
        let (tx, rx) = watch::channel(None);
        entries.insert(shard_id.to_string(), Entry::InFlight(rx));
        Join::Lead(tx)
    }

    fn is_expired(&self, resolved: &Resolved) -> bool {
        self.ttl
            .is_some_and(|ttl| resolved.resolved_at.elapsed() >= ttl)
    }
}

impl Default for LocationCache {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Leader side of one in-flight resolution.
struct Flight<'a> {
    cache: &'a LocationCache,
    shard_id: &'a str,
    tx: Option<watch::Sender<Outcome>>,
}

impl Flight<'_> {
    /// Store a success (or drop the entry on failure), then wake every waiter.
    fn finish(mut self, result: &GatewayResult<ShardLocation>) {
        {
            let mut entries = self.cache.entries.write();
            match result {
                Ok(location) => {
                    entries.insert(
                        self.shard_id.to_string(),
                        Entry::Ready(Resolved {
                            location: location.clone(),
                            resolved_at: Instant::now(),
                        }),
                    );
                }
                Err(_) => {
                    entries.remove(self.shard_id);
                }
            }
        }
        if let Some(tx) = self.tx.take() {
            tx.send_replace(Some(result.clone()));
        }
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        // Leader cancelled before finishing: free the slot for a waiter.
        if self.tx.is_some() {
            let mut entries = self.cache.entries.write();
            if matches!(entries.get(self.shard_id), Some(Entry::InFlight(_))) {
                entries.remove(self.shard_id);
            }
        }
    }
}
