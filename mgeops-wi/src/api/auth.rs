//! Shared-secret authentication middleware
//!
//! Stands in for the surrounding system's session/role check: callers that
//! reach the protected routes are assumed to have passed operator
//! authorization upstream, and prove it with the shared secret. No
//! configured secret disables checking entirely (development mode).

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::AppState;

/// Authentication middleware for protected routes
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let Some(secret) = state.config.api_secret.as_deref().filter(|s| !s.is_empty()) else {
        // Auth disabled - pass through without validation
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == secret => Ok(next.run(request).await),
        Some(_) => {
            warn!("request with invalid API secret rejected");
            Err(AuthError::InvalidSecret)
        }
        None => Err(AuthError::MissingSecret),
    }
}

/// Authentication error types for HTTP responses
#[derive(Debug)]
pub enum AuthError {
    MissingSecret,
    InvalidSecret,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingSecret => "Missing Authorization header",
            AuthError::InvalidSecret => "Invalid API secret",
        };

        let body = Json(json!({
            "error": message,
        }));

        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}
