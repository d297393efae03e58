//! Table bootstrap from the resolved model: `CREATE TABLE IF NOT EXISTS` in catalog order
//! (parents before children). Not a migration tool: existing tables are left as they are.

use crate::config::{ResolvedEntity, ResolvedModel, ID_COLUMN};
use crate::error::AppError;
use sqlx::PgPool;

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub fn create_table_sql(entity: &ResolvedEntity) -> String {
    let mut defs = vec![format!("{} UUID PRIMARY KEY", quote(ID_COLUMN))];
    for c in &entity.columns {
        let mut def = format!("{} {}", quote(&c.name), c.pg_type().to_uppercase());
        if !c.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(parent) = &c.references {
            def.push_str(&format!(" REFERENCES {} ({})", quote(parent), quote(ID_COLUMN)));
        }
        defs.push(def);
    }
    defs.push(format!("{} TIMESTAMPTZ NOT NULL DEFAULT NOW()", quote("created_at")));
    defs.push(format!("{} TIMESTAMPTZ", quote("updated_at")));
    defs.push(format!("{} TIMESTAMPTZ", quote("deleted_at")));
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        quote(&entity.table_name),
        defs.join(",\n    ")
    )
}

pub async fn ensure_schema(pool: &PgPool, model: &ResolvedModel) -> Result<(), AppError> {
    for entity in &model.entities {
        let ddl = create_table_sql(entity);
        tracing::debug!(table = %entity.table_name, "ensuring table");
        sqlx::query(&ddl).execute(pool).await?;
    }
    tracing::info!(tables = model.entities.len(), "schema ready");
    Ok(())
}
