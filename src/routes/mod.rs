//! Router assembly.

mod common;
mod entity;

pub use common::common_routes;
pub use entity::entity_routes;

use crate::error::AppError;
use crate::response::Envelope;
use crate::state::AppState;
use axum::{
    body::to_bytes,
    http::{header, Uri},
    middleware::map_response,
    response::{IntoResponse, Response},
    Json, Router,
};
use std::time::Duration;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Bodies of non-JSON error responses are short messages; anything longer is cut off.
const ERROR_BODY_LIMIT: usize = 8 * 1024;

/// Full application: common routes, entity routes, request tracing, deadline and body limit.
/// On deadline expiry the handler future is dropped, which aborts its in-flight query.
pub fn app(state: AppState, request_timeout: Duration, body_limit_bytes: usize) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(entity_routes(state))
        .fallback(route_not_found)
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(map_response(envelope_errors))
        .layer(TraceLayer::new_for_http())
}

async fn route_not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

/// Wrap error responses built outside the handlers (body limit, deadline, method routing)
/// in the standard envelope. JSON responses pass through untouched.
async fn envelope_errors(response: Response) -> Response {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_json(&response) {
        return response;
    }
    let (parts, body) = response.into_parts();
    let text = match to_bytes(body, ERROR_BODY_LIMIT).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
        Err(_) => String::new(),
    };
    let message = if text.is_empty() {
        status.canonical_reason().unwrap_or("error").to_lowercase()
    } else {
        text
    };
    tracing::debug!(status = status.as_u16(), %message, "enveloping middleware response");

    let mut enveloped = (status, Json(Envelope::new(status, message))).into_response();
    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            enveloped.headers_mut().append(name.clone(), value.clone());
        }
    }
    enveloped
}
