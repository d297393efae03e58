//! Common routes: health, readiness, version.

use crate::response::{ok, success, Envelope};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    database: &'static str,
}

async fn health() -> (StatusCode, Json<Envelope<HealthBody>>) {
    ok(HealthBody { status: "ok" })
}

async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Envelope<ReadyBody>>) {
    if let Err(e) = state.repo.ping().await {
        tracing::warn!(error = %e, "readiness check failed");
        return success(
            StatusCode::SERVICE_UNAVAILABLE,
            ReadyBody {
                status: "degraded",
                database: "unavailable",
            },
        );
    }
    success(
        StatusCode::OK,
        ReadyBody {
            status: "ok",
            database: "ok",
        },
    )
}

async fn version() -> (StatusCode, Json<Envelope<Value>>) {
    ok(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /health, /ready (store ping), /version.
pub fn common_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .with_state(state)
}
