//! Catalog validation: referential integrity and API consistency.

use crate::config::resolved::{AUDIT_COLUMNS, ID_COLUMN, KNOWN_OPERATIONS, PASSWORD_COLUMN};
use crate::config::{CatalogConfig, ColumnType};
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate(config: &CatalogConfig) -> Result<(), ConfigError> {
    if config.entities.is_empty() {
        return Err(ConfigError::Validation("catalog declares no entities".into()));
    }

    let mut path_segments = HashSet::new();
    let mut tables = HashSet::new();

    for e in &config.entities {
        if !path_segments.insert(e.path_segment.as_str()) {
            return Err(ConfigError::DuplicatePathSegment(e.path_segment.clone()));
        }
        if !tables.insert(e.table.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate table: {}", e.table)));
        }

        let mut column_names = HashSet::new();
        for c in &e.columns {
            if c.name == ID_COLUMN || AUDIT_COLUMNS.contains(&c.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "{}.{} is a reserved column",
                    e.table, c.name
                )));
            }
            if !column_names.insert(c.name.as_str()) {
                return Err(ConfigError::Validation(format!("duplicate column: {}.{}", e.table, c.name)));
            }
            if let Some(parent) = &c.references {
                // Parents must already be declared so tables can be created in catalog order.
                if !path_segments.contains(parent.as_str()) || parent == &e.path_segment {
                    return Err(ConfigError::MissingReference {
                        kind: "entity",
                        id: parent.clone(),
                    });
                }
                if c.type_ != ColumnType::Uuid {
                    return Err(ConfigError::Validation(format!(
                        "{}.{} references {} but is not a uuid column",
                        e.table, c.name, parent
                    )));
                }
            }
        }

        for c in &e.columns {
            if let Some(source) = &c.age_from {
                let source_col = e
                    .columns
                    .iter()
                    .find(|s| &s.name == source)
                    .ok_or_else(|| ConfigError::MissingReference {
                        kind: "column",
                        id: format!("{}.{}", e.table, source),
                    })?;
                if source_col.type_ != ColumnType::Date || c.type_ != ColumnType::Integer {
                    return Err(ConfigError::Validation(format!(
                        "{}.{} must be an integer derived from a date column",
                        e.table, c.name
                    )));
                }
            }
        }

        if e.search.len() > 2 {
            return Err(ConfigError::Validation(format!(
                "{} declares {} search columns; at most two are supported",
                e.path_segment,
                e.search.len()
            )));
        }
        for s in &e.search {
            if !column_names.contains(s.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "search column",
                    id: format!("{}.{}", e.table, s),
                });
            }
        }

        if e.account {
            let password = e.columns.iter().find(|c| c.name == PASSWORD_COLUMN);
            match password {
                Some(c) if c.type_ == ColumnType::Text && c.sensitive => {}
                _ => {
                    return Err(ConfigError::Validation(format!(
                        "account entity {} needs a sensitive text '{}' column",
                        e.path_segment, PASSWORD_COLUMN
                    )))
                }
            }
        }

        if let Some(ops) = &e.operations {
            for op in ops {
                if !KNOWN_OPERATIONS.contains(&op.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "{}: unknown operation '{}'",
                        e.path_segment, op
                    )));
                }
            }
        }
    }

    Ok(())
}
