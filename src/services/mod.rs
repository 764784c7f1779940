pub mod fetcher;
pub mod gateway_service;
pub mod id_resolver;
pub mod location_cache;
pub mod resize_pipeline;
pub mod shard_resolver;
