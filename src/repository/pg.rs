//! PostgreSQL repository. One shared pool; every operation is a single auto-committed statement.

use super::{not_found, password_column, prepare_insert, ListRequest, Page, Record, Repository};
use crate::config::{ColumnType, ResolvedEntity, ID_COLUMN};
use crate::error::AppError;
use crate::sql::{self, PgBindValue, QueryBuf};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        PgRepository { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn build<'q>(q: &'q QueryBuf) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
        tracing::debug!(sql = %q.sql, params = ?q.loggable_params(), "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        query
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<PgRow>, AppError> {
        Ok(Self::build(q).fetch_optional(&self.pool).await?)
    }

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<PgRow>, AppError> {
        Ok(Self::build(q).fetch_all(&self.pool).await?)
    }

    /// Run a `... RETURNING id` statement; no row back means no live row matched.
    async fn returning_id(&self, entity: &ResolvedEntity, id: Uuid, q: &QueryBuf) -> Result<Uuid, AppError> {
        let row = self.fetch_optional(q).await?.ok_or_else(|| not_found(entity, id))?;
        Ok(row.try_get::<Uuid, _>(ID_COLUMN)?)
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn create(&self, entity: &ResolvedEntity, fields: &Record) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        let row = prepare_insert(entity, fields, Utc::now().date_naive())?;
        let q = sql::insert(entity, id, &row);
        let inserted = Self::build(&q).fetch_one(&self.pool).await?;
        Ok(inserted.try_get::<Uuid, _>(ID_COLUMN)?)
    }

    async fn get(&self, entity: &ResolvedEntity, id: Uuid) -> Result<Value, AppError> {
        let q = sql::select_by_id(entity, id);
        let row = self.fetch_optional(&q).await?.ok_or_else(|| not_found(entity, id))?;
        row_to_json(entity, &row)
    }

    async fn get_list(&self, entity: &ResolvedEntity, request: &ListRequest) -> Result<Page, AppError> {
        let count_q = sql::count(entity, request.search());
        let count: i64 = Self::build(&count_q).fetch_one(&self.pool).await?.try_get(0)?;

        let list_q = sql::select_list(entity, request.search(), request.limit, request.offset());
        let items = self
            .fetch_all(&list_q)
            .await?
            .iter()
            .map(|r| row_to_json(entity, r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            items,
            count: count.max(0) as u64,
        })
    }

    async fn update(&self, entity: &ResolvedEntity, id: Uuid, fields: &Record) -> Result<Uuid, AppError> {
        let q = sql::update(entity, id, fields);
        self.returning_id(entity, id, &q).await
    }

    async fn delete(&self, entity: &ResolvedEntity, id: Uuid) -> Result<(), AppError> {
        let q = sql::soft_delete(entity, id);
        self.returning_id(entity, id, &q).await.map(|_| ())
    }

    async fn get_password(&self, entity: &ResolvedEntity, id: Uuid) -> Result<String, AppError> {
        let q = sql::select_password(entity, password_column(entity)?, id);
        let row = self.fetch_optional(&q).await?.ok_or_else(|| not_found(entity, id))?;
        let password: Option<String> = row.try_get(0)?;
        Ok(password.unwrap_or_default())
    }

    async fn update_password(&self, entity: &ResolvedEntity, id: Uuid, new_password: &str) -> Result<(), AppError> {
        let q = sql::update_password(entity, password_column(entity)?, id, new_password);
        self.returning_id(entity, id, &q).await.map(|_| ())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

/// Decode a row selected with `select_column_list` into a JSON object, driven by the descriptor.
fn row_to_json(entity: &ResolvedEntity, row: &PgRow) -> Result<Value, AppError> {
    let mut map = serde_json::Map::new();
    let id: Uuid = row.try_get(ID_COLUMN)?;
    map.insert(ID_COLUMN.to_string(), Value::String(id.to_string()));
    for c in entity.visible_columns() {
        let name = c.name.as_str();
        let v = match c.column_type {
            ColumnType::Text | ColumnType::Numeric => row.try_get::<Option<String>, _>(name)?.map(Value::String),
            ColumnType::Integer => row.try_get::<Option<i32>, _>(name)?.map(Value::from),
            ColumnType::Date => row
                .try_get::<Option<NaiveDate>, _>(name)?
                .map(|d| Value::String(d.format(crate::rules::DATE_FORMAT).to_string())),
            ColumnType::Uuid => row.try_get::<Option<Uuid>, _>(name)?.map(|u| Value::String(u.to_string())),
        };
        map.insert(c.name.clone(), v.unwrap_or(Value::Null));
    }
    for audit in ["created_at", "updated_at", "deleted_at"] {
        let v = row
            .try_get::<Option<DateTime<Utc>>, _>(audit)?
            .map(|d| Value::String(d.to_rfc3339()))
            .unwrap_or(Value::Null);
        map.insert(audit.to_string(), v);
    }
    Ok(Value::Object(map))
}
