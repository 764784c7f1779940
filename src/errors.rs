use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Every way a single image request can fail, tagged by pipeline stage.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("no such id: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("volume lookup failed: {0}")]
    VolumeLookupFailed(String),
    #[error("fetch failed: {0}")]
    FetchFailed(String),
    #[error("decode failed: {0}")]
    DecodeFailed(String),
    #[error("invalid width: {0}")]
    InvalidWidth(String),
    #[error("resize failed: {0}")]
    ResizeFailed(String),
    #[error("encode failed: {0}")]
    EncodeFailed(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    /// Short stage name used in log events.
    pub fn stage(&self) -> &'static str {
        match self {
            GatewayError::NotFound(_) | GatewayError::UpstreamUnavailable(_) => "id_lookup",
            GatewayError::BadRequest(_) => "request",
            GatewayError::VolumeLookupFailed(_) => "volume_lookup",
            GatewayError::FetchFailed(_) => "fetch",
            GatewayError::DecodeFailed(_) => "decode",
            GatewayError::InvalidWidth(_) | GatewayError::ResizeFailed(_) => "resize",
            GatewayError::EncodeFailed(_) => "encode",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::BadRequest(_) | GatewayError::InvalidWidth(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::new(err.status(), err.to_string())
    }
}
