//! HTTP API handlers for booth-ingest

pub mod groups;
pub mod health;

pub use groups::{create_group, get_active_group, get_group, list_groups, move_group};
pub use health::health_routes;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use booth_common::api::ErrorResponse;
use tracing::error;

/// Error returned by API handlers
#[derive(Debug)]
pub struct ApiError(booth_common::Error);

impl From<booth_common::Error> for ApiError {
    fn from(e: booth_common::Error) -> Self {
        Self(e)
    }
}

/// Malformed request bodies are 400s with the usual error body
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(booth_common::Error::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            booth_common::Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            booth_common::Error::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            other => {
                error!("Request failed: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
            }
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}
