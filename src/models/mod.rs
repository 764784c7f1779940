//! Core data models for the image gateway.
//!
//! These types describe what flows through a single request: the resolved
//! content-file-id, the shard location it lives on, and the resize contract.
//! Wire shapes of upstream replies deserialize via `serde`.

pub mod file_id;
pub mod location;
pub mod resize;
