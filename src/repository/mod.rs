//! Storage layer: one generic repository serving every entity through its descriptor.

mod memory;
mod pg;

pub use memory::MemoryRepository;
pub use pg::PgRepository;

use crate::config::ResolvedEntity;
use crate::error::AppError;
use crate::rules::{age_on, parse_date};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Column name to JSON value, as decoded from a request or rendered from a row.
pub type Record = Map<String, Value>;

/// 1-indexed page request with an optional free-text filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListRequest {
    pub page: u32,
    pub limit: u32,
    pub search: String,
}

impl ListRequest {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// The filter text as sent; only an empty string disables filtering.
    pub fn search(&self) -> Option<&str> {
        (!self.search.is_empty()).then_some(self.search.as_str())
    }
}

impl Default for ListRequest {
    fn default() -> Self {
        ListRequest {
            page: 1,
            limit: 10,
            search: String::new(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Page {
    pub items: Vec<Value>,
    /// All live rows matching the filter, not just this page.
    pub count: u64,
}

/// Single-statement operations against the backing store. Every read and write sees live rows only.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Mint an id and insert; derived columns are computed here. Returns the new id.
    async fn create(&self, entity: &ResolvedEntity, fields: &Record) -> Result<Uuid, AppError>;

    async fn get(&self, entity: &ResolvedEntity, id: Uuid) -> Result<Value, AppError>;

    async fn get_list(&self, entity: &ResolvedEntity, request: &ListRequest) -> Result<Page, AppError>;

    /// Overwrite the supplied update-writable fields and bump updated_at.
    async fn update(&self, entity: &ResolvedEntity, id: Uuid, fields: &Record) -> Result<Uuid, AppError>;

    /// Stamp deleted_at. A row that is already deleted is NotFound.
    async fn delete(&self, entity: &ResolvedEntity, id: Uuid) -> Result<(), AppError>;

    async fn get_password(&self, entity: &ResolvedEntity, id: Uuid) -> Result<String, AppError>;

    async fn update_password(&self, entity: &ResolvedEntity, id: Uuid, new_password: &str) -> Result<(), AppError>;

    /// Readiness check.
    async fn ping(&self) -> Result<(), AppError>;
}

pub(crate) fn not_found(entity: &ResolvedEntity, id: Uuid) -> AppError {
    AppError::NotFound(format!("{} {}", entity.path_segment, id))
}

pub(crate) fn password_column(entity: &ResolvedEntity) -> Result<&str, AppError> {
    entity
        .password_column
        .as_deref()
        .ok_or_else(|| AppError::BadRequest(format!("{} has no password", entity.path_segment)))
}

/// Row to insert: create-writable fields from the command plus derived columns.
/// Age is computed once, as of `today`; a missing birth date leaves it null.
pub fn prepare_insert(entity: &ResolvedEntity, fields: &Record, today: NaiveDate) -> Result<Record, AppError> {
    let mut row = Record::new();
    for c in entity.columns.iter().filter(|c| c.on_create) {
        if let Some(v) = fields.get(&c.name) {
            row.insert(c.name.clone(), v.clone());
        }
    }
    for c in &entity.columns {
        let Some(source) = &c.age_from else { continue };
        let age = match row.get(source) {
            Some(Value::String(raw)) => {
                let birth = parse_date(raw)
                    .ok_or_else(|| AppError::Validation(format!("{} must be a date (YYYY-MM-DD)", source)))?;
                Value::from(age_on(birth, today))
            }
            _ => Value::Null,
        };
        row.insert(c.name.clone(), age);
    }
    Ok(row)
}
