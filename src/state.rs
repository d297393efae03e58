//! Shared application state for all routes.

use crate::config::ResolvedModel;
use crate::repository::Repository;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// One repository (and so one connection pool) shared by every entity.
    pub repo: Arc<dyn Repository>,
    pub model: Arc<ResolvedModel>,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repository>, model: ResolvedModel) -> Self {
        AppState {
            repo,
            model: Arc::new(model),
        }
    }
}
