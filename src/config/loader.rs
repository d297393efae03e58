//! Load the entity catalog and resolve it into the runtime model.

use crate::config::resolved::{
    ColumnInfo, ResolvedEntity, ResolvedModel, OP_CHANGE_PASSWORD, OP_CREATE, OP_DELETE, OP_READ, OP_UPDATE,
    PASSWORD_COLUMN,
};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use std::collections::HashMap;

const BUILTIN_CATALOG: &str = include_str!("../../config/entities.json");

/// Parse the catalog compiled into the binary.
pub fn builtin_catalog() -> Result<CatalogConfig, ConfigError> {
    parse_catalog(BUILTIN_CATALOG)
}

pub fn parse_catalog(json: &str) -> Result<CatalogConfig, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(format!("entity catalog: {}", e)))
}

/// Validated model for the built-in catalog.
pub fn builtin_model() -> Result<ResolvedModel, ConfigError> {
    resolve(&builtin_catalog()?)
}

/// Build resolved model from catalog (validates first).
pub fn resolve(config: &CatalogConfig) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;

    let table_by_path: HashMap<&str, &str> = config
        .entities
        .iter()
        .map(|e| (e.path_segment.as_str(), e.table.as_str()))
        .collect();

    let mut entities = Vec::new();
    let mut entity_by_path = HashMap::new();

    for e in &config.entities {
        let columns = e
            .columns
            .iter()
            .map(|c| {
                let references = match &c.references {
                    Some(parent) => Some(
                        table_by_path
                            .get(parent.as_str())
                            .map(|t| t.to_string())
                            .ok_or_else(|| ConfigError::MissingReference {
                                kind: "entity",
                                id: parent.clone(),
                            })?,
                    ),
                    None => None,
                };
                Ok(ColumnInfo {
                    name: c.name.clone(),
                    column_type: c.type_,
                    nullable: c.nullable,
                    on_create: c.on_create && c.age_from.is_none(),
                    on_update: c.on_update && c.age_from.is_none() && c.name != PASSWORD_COLUMN,
                    sensitive: c.sensitive,
                    references,
                    age_from: c.age_from.clone(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let operations = e.operations.clone().unwrap_or_else(|| {
            let mut ops: Vec<String> = [OP_CREATE, OP_READ, OP_UPDATE, OP_DELETE]
                .iter()
                .map(|s| s.to_string())
                .collect();
            if e.account {
                ops.push(OP_CHANGE_PASSWORD.to_string());
            }
            ops
        });

        let validation = e
            .columns
            .iter()
            .filter_map(|c| c.validation.clone().map(|v| (c.name.clone(), v)))
            .collect();

        let entity = ResolvedEntity {
            path_segment: e.path_segment.clone(),
            table_name: e.table.clone(),
            columns,
            search_columns: e.search.clone(),
            operations,
            password_column: e.account.then(|| PASSWORD_COLUMN.to_string()),
            validation,
        };
        entity_by_path.insert(e.path_segment.clone(), entity.clone());
        entities.push(entity);
    }

    Ok(ResolvedModel {
        entities,
        entity_by_path,
    })
}
