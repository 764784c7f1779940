//! Defines the gateway's HTTP surface.
//!
//! - `GET /images/{id}?w={width}`: resized, transcoded image
//! - `GET /healthz` / `GET /readyz`: liveness and readiness

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        image_handlers::get_image,
    },
    services::gateway_service::GatewayService,
};
use axum::{Router, routing::get};

/// Build and return the router.
///
/// The router carries shared state (`GatewayService`) to all handlers.
pub fn routes() -> Router<GatewayService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/images/{id}", get(get_image))
}
