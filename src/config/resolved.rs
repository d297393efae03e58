//! Resolved entity model: catalog validated and flattened for runtime use.

use crate::config::{ColumnType, ValidationRule};
use std::collections::HashMap;

/// Operations an entity can expose over HTTP.
pub const OP_CREATE: &str = "create";
pub const OP_READ: &str = "read";
pub const OP_UPDATE: &str = "update";
pub const OP_DELETE: &str = "delete";
pub const OP_CHANGE_PASSWORD: &str = "change_password";

pub const KNOWN_OPERATIONS: &[&str] = &[OP_CREATE, OP_READ, OP_UPDATE, OP_DELETE, OP_CHANGE_PASSWORD];

/// Identity and audit columns present on every table and never supplied by callers.
pub const ID_COLUMN: &str = "id";
pub const AUDIT_COLUMNS: &[&str] = &["created_at", "updated_at", "deleted_at"];

pub const PASSWORD_COLUMN: &str = "password";

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub on_create: bool,
    pub on_update: bool,
    pub sensitive: bool,
    /// Parent table name (already resolved from the referenced path segment).
    pub references: Option<String>,
    pub age_from: Option<String>,
}

impl ColumnInfo {
    pub fn pg_type(&self) -> &'static str {
        self.column_type.pg_type()
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub path_segment: String,
    pub table_name: String,
    pub columns: Vec<ColumnInfo>,
    /// Columns matched (OR) by the list search filter.
    pub search_columns: Vec<String>,
    pub operations: Vec<String>,
    /// Set for account-bearing entities.
    pub password_column: Option<String>,
    pub validation: HashMap<String, ValidationRule>,
}

impl ResolvedEntity {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn allows(&self, operation: &str) -> bool {
        self.operations.iter().any(|o| o == operation)
    }

    pub fn is_account(&self) -> bool {
        self.password_column.is_some()
    }

    /// Columns returned to callers, in declaration order.
    pub fn visible_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter().filter(|c| !c.sensitive)
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    pub entities: Vec<ResolvedEntity>,
    pub entity_by_path: HashMap<String, ResolvedEntity>,
}

impl ResolvedModel {
    pub fn entity_by_path(&self, path: &str) -> Option<&ResolvedEntity> {
        self.entity_by_path.get(path)
    }
}
