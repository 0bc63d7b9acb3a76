//! HTTP API handlers

pub mod alts;
pub mod auth;
pub mod revert;
pub mod whois;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mgeops_common::Error;
use serde_json::json;

/// HTTP wrapper for core errors
///
/// Handlers return `Result<Json<T>, ApiError>` and propagate core errors
/// with `?`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidIdentifier(_) | Error::NotConvertible(_) | Error::SelfLink => {
                StatusCode::BAD_REQUEST
            }
            Error::ConflictingRole(_) => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Forbidden => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.0.to_string(),
        }));

        (status, body).into_response()
    }
}

/// GET /health - liveness probe, no auth
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "mgeops-wi",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
