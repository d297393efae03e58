//! In-process repository with the same visibility, search, paging and foreign-key rules as PostgreSQL.
//! Backs the test suite and local runs without a database.

use super::{not_found, password_column, prepare_insert, ListRequest, Page, Record, Repository};
use crate::config::{ResolvedEntity, ID_COLUMN};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct StoredRow {
    id: Uuid,
    fields: Record,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
}

impl StoredRow {
    fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    fn render(&self, entity: &ResolvedEntity) -> Value {
        let mut map = serde_json::Map::new();
        map.insert(ID_COLUMN.to_string(), Value::String(self.id.to_string()));
        for c in entity.visible_columns() {
            map.insert(c.name.clone(), self.fields.get(&c.name).cloned().unwrap_or(Value::Null));
        }
        let ts = |t: Option<DateTime<Utc>>| t.map(|d| Value::String(d.to_rfc3339())).unwrap_or(Value::Null);
        map.insert("created_at".into(), ts(Some(self.created_at)));
        map.insert("updated_at".into(), ts(self.updated_at));
        map.insert("deleted_at".into(), ts(self.deleted_at));
        Value::Object(map)
    }

    fn matches(&self, entity: &ResolvedEntity, needle: &str) -> bool {
        entity.search_columns.iter().any(|c| match self.fields.get(c) {
            Some(Value::String(s)) => s.to_lowercase().contains(needle),
            Some(Value::Null) | None => false,
            Some(other) => other.to_string().to_lowercase().contains(needle),
        })
    }
}

/// Tables keyed by table name; rows kept in insertion order.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<HashMap<String, Vec<StoredRow>>>,
    today: Option<NaiveDate>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the date used for derived ages.
    pub fn with_today(today: NaiveDate) -> Self {
        MemoryRepository {
            tables: RwLock::default(),
            today: Some(today),
        }
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Vec<StoredRow>>>, AppError> {
        self.tables.read().map_err(|_| AppError::Storage("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Vec<StoredRow>>>, AppError> {
        self.tables.write().map_err(|_| AppError::Storage("memory store lock poisoned".into()))
    }

    /// Foreign keys must point at an existing parent row (deleted or not, as in PostgreSQL).
    fn check_references(
        tables: &HashMap<String, Vec<StoredRow>>,
        entity: &ResolvedEntity,
        row: &Record,
    ) -> Result<(), AppError> {
        for c in &entity.columns {
            let Some(parent) = &c.references else { continue };
            let Some(value) = row.get(&c.name) else { continue };
            if value.is_null() {
                continue;
            }
            let parent_id = value.as_str().and_then(|s| Uuid::parse_str(s).ok());
            let exists = parent_id.is_some_and(|pid| {
                tables
                    .get(parent)
                    .is_some_and(|rows| rows.iter().any(|r| r.id == pid))
            });
            if !exists {
                return Err(AppError::Storage(format!(
                    "insert or update on table \"{}\" violates foreign key constraint on \"{}\"",
                    entity.table_name, c.name
                )));
            }
        }
        Ok(())
    }
}

fn live_row_mut<'a>(
    tables: &'a mut HashMap<String, Vec<StoredRow>>,
    entity: &ResolvedEntity,
    id: Uuid,
) -> Result<&'a mut StoredRow, AppError> {
    tables
        .get_mut(&entity.table_name)
        .and_then(|rows| rows.iter_mut().find(|r| r.id == id && r.is_live()))
        .ok_or_else(|| not_found(entity, id))
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create(&self, entity: &ResolvedEntity, fields: &Record) -> Result<Uuid, AppError> {
        let row = prepare_insert(entity, fields, self.today())?;
        let mut tables = self.write()?;
        Self::check_references(&tables, entity, &row)?;
        let id = Uuid::new_v4();
        tables.entry(entity.table_name.clone()).or_default().push(StoredRow {
            id,
            fields: row,
            created_at: Utc::now(),
            updated_at: None,
            deleted_at: None,
        });
        Ok(id)
    }

    async fn get(&self, entity: &ResolvedEntity, id: Uuid) -> Result<Value, AppError> {
        let tables = self.read()?;
        tables
            .get(&entity.table_name)
            .and_then(|rows| rows.iter().find(|r| r.id == id && r.is_live()))
            .map(|r| r.render(entity))
            .ok_or_else(|| not_found(entity, id))
    }

    async fn get_list(&self, entity: &ResolvedEntity, request: &ListRequest) -> Result<Page, AppError> {
        let tables = self.read()?;
        let needle = request.search().map(str::to_lowercase);
        let matching: Vec<&StoredRow> = tables
            .get(&entity.table_name)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.is_live())
                    .filter(|r| match &needle {
                        Some(n) if !entity.search_columns.is_empty() => r.matches(entity, n),
                        _ => true,
                    })
                    .collect()
            })
            .unwrap_or_default();
        let count = matching.len() as u64;
        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(request.limit as usize)
            .map(|r| r.render(entity))
            .collect();
        Ok(Page { items, count })
    }

    async fn update(&self, entity: &ResolvedEntity, id: Uuid, fields: &Record) -> Result<Uuid, AppError> {
        let mut tables = self.write()?;
        let mut changes = Record::new();
        for c in entity.columns.iter().filter(|c| c.on_update) {
            if let Some(v) = fields.get(&c.name) {
                changes.insert(c.name.clone(), v.clone());
            }
        }
        live_row_mut(&mut tables, entity, id)?;
        Self::check_references(&tables, entity, &changes)?;
        let row = live_row_mut(&mut tables, entity, id)?;
        row.fields.extend(changes);
        row.updated_at = Some(Utc::now());
        Ok(id)
    }

    async fn delete(&self, entity: &ResolvedEntity, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.write()?;
        let row = live_row_mut(&mut tables, entity, id)?;
        row.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn get_password(&self, entity: &ResolvedEntity, id: Uuid) -> Result<String, AppError> {
        let column = password_column(entity)?;
        let tables = self.read()?;
        let row = tables
            .get(&entity.table_name)
            .and_then(|rows| rows.iter().find(|r| r.id == id && r.is_live()))
            .ok_or_else(|| not_found(entity, id))?;
        Ok(row.fields.get(column).and_then(Value::as_str).unwrap_or_default().to_string())
    }

    async fn update_password(&self, entity: &ResolvedEntity, id: Uuid, new_password: &str) -> Result<(), AppError> {
        let column = password_column(entity)?.to_string();
        let mut tables = self.write()?;
        let row = live_row_mut(&mut tables, entity, id)?;
        row.fields.insert(column, Value::String(new_password.to_string()));
        row.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.read().map(|_| ())
    }
}
