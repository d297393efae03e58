//! Entity CRUD routes built from the resolved model.
//! Parameterized paths so one set of handlers serves every entity; handlers resolve the entity by path.

use crate::handlers::entity::{change_password, create, delete as delete_handler, list, read, update};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/:path_segment", get(list).post(create))
        .route(
            "/:path_segment/:id",
            get(read).put(update).delete(delete_handler).patch(change_password),
        )
        .with_state(state)
}
