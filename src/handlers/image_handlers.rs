//! HTTP handler for resized image delivery.
//! Parses the request, delegates the whole pipeline to `GatewayService` and
//! writes the encoded bytes only once they are complete.

use crate::{errors::AppError, services::gateway_service::GatewayService};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use serde::Deserialize;

/// Query params accepted by `GET /images/{id}`.
#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    /// Target width; kept raw so malformed values surface as `BadRequest`.
    pub w: Option<String>,
}

/// `GET /images/{id}?w={width}`: resize and transcode one image.
pub async fn get_image(
    State(service): State<GatewayService>,
    Path(id): Path<String>,
    Query(q): Query<ImageQuery>,
) -> Result<Response, AppError> {
    let resized = service.handle(&id, q.w.as_deref()).await?;

    let content_type = resized.content_type();
    let length = resized.bytes.len();
    let mut response = Response::new(Body::from(resized.bytes));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));

    Ok(response)
}
