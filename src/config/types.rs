//! Raw descriptor types matching `config/entities.json`.

use serde::{Deserialize, Serialize};

/// Column storage type. Each maps to one PostgreSQL type used for DDL and parameter casts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Integer,
    Numeric,
    Date,
    Uuid,
}

impl ColumnType {
    /// PostgreSQL type name for casts (e.g. `$1::uuid`) and DDL.
    pub fn pg_type(self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "int4",
            ColumnType::Numeric => "numeric",
            ColumnType::Date => "date",
            ColumnType::Uuid => "uuid",
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: ColumnType,
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Accepted in create bodies.
    #[serde(default = "default_true")]
    pub on_create: bool,
    /// Accepted in update bodies.
    #[serde(default = "default_true")]
    pub on_update: bool,
    /// Never selected into API responses.
    #[serde(default)]
    pub sensitive: bool,
    /// Path segment of the parent entity; rendered as a foreign key to its `id`.
    #[serde(default)]
    pub references: Option<String>,
    /// Date column this column's age is derived from at insert.
    #[serde(default)]
    pub age_from: Option<String>,
    #[serde(default)]
    pub validation: Option<ValidationRule>,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    pub path_segment: String,
    pub table: String,
    /// Account-bearing: stores a password and exposes the password-change operation.
    #[serde(default)]
    pub account: bool,
    #[serde(default)]
    pub search: Vec<String>,
    #[serde(default)]
    pub operations: Option<Vec<String>>,
    pub columns: Vec<ColumnConfig>,
}

/// The full catalog, in table-creation order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub entities: Vec<EntityConfig>,
}
