//! Shifolink: healthcare-commerce REST backend.
//!
//! Sixteen entities share one generic CRUD engine driven by the descriptors in
//! `config/entities.json`: transport (`handlers`, `routes`) → orchestration (`service`)
//! → storage (`repository`, `sql`) → PostgreSQL.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod repository;
pub mod response;
pub mod routes;
pub mod rules;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;

pub use config::{builtin_model, resolve, ResolvedEntity, ResolvedModel, Settings};
pub use error::{AppError, ConfigError};
pub use repository::{MemoryRepository, PgRepository, Repository};
pub use response::Envelope;
pub use routes::{app, common_routes, entity_routes};
pub use schema::ensure_schema;
pub use service::CrudService;
pub use state::AppState;
