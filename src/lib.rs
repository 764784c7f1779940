//! On-demand image resizing gateway.
//!
//! Resolves an opaque image id to a blob in a sharded blob store, fetches
//! it, resizes and transcodes it, and serves the result over HTTP.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

use axum::Router;
use services::gateway_service::GatewayService;

/// Router with state attached, ready to serve.
pub fn app(service: GatewayService) -> Router {
    routes::routes::routes().with_state(service)
}
