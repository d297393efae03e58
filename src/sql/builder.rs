//! Builds parameterized INSERT, SELECT, UPDATE and soft-delete statements from a resolved entity.
//! Identifiers come from the catalog only; every caller value is a bound parameter.

use crate::config::{ColumnType, ResolvedEntity, ID_COLUMN};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Quote identifier for PostgreSQL (safe: only from catalog).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn placeholder(n: u32, pg_type: &str) -> String {
    format!("${}::{}", n, pg_type)
}

const LIVE: &str = "\"deleted_at\" IS NULL";

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
    /// Indexes into `params` that must not be logged.
    sensitive: Vec<usize>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
            sensitive: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        self.params.push(v);
        self.params.len() as u32
    }

    fn push_sensitive(&mut self, v: Value) -> u32 {
        self.sensitive.push(self.params.len());
        self.push_param(v)
    }

    fn push_id(&mut self, id: Uuid) -> u32 {
        self.push_param(Value::String(id.to_string()))
    }

    /// Parameters with sensitive values masked, for tracing.
    pub fn loggable_params(&self) -> Vec<Value> {
        self.params
            .iter()
            .enumerate()
            .map(|(i, v)| {
                if self.sensitive.contains(&i) {
                    Value::String("***".into())
                } else {
                    v.clone()
                }
            })
            .collect()
    }
}

/// SELECT list: id, visible columns (numeric as text to keep exact decimals), audit columns.
pub fn select_column_list(entity: &ResolvedEntity) -> String {
    let mut cols = vec![quoted(ID_COLUMN)];
    for c in entity.visible_columns() {
        let q = quoted(&c.name);
        if c.column_type == ColumnType::Numeric {
            cols.push(format!("{}::text AS {}", q, q));
        } else {
            cols.push(q);
        }
    }
    for audit in ["created_at", "updated_at", "deleted_at"] {
        cols.push(quoted(audit));
    }
    cols.join(", ")
}

/// Substring pattern for ILIKE with `%`, `_` and `\` in the search text matched literally.
/// Returns None for an empty search, which disables filtering. Whitespace is matched as given.
pub fn search_pattern(search: &str) -> Option<String> {
    if search.is_empty() {
        return None;
    }
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for ch in search.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    Some(escaped)
}

/// WHERE clause shared by list and count: live rows, optionally OR-matched against the search columns.
fn list_where(q: &mut QueryBuf, entity: &ResolvedEntity, search: Option<&str>) -> String {
    let pattern = match search.and_then(search_pattern) {
        Some(p) if !entity.search_columns.is_empty() => p,
        _ => return format!(" WHERE {}", LIVE),
    };
    let n = q.push_param(Value::String(pattern));
    let ors: Vec<String> = entity
        .search_columns
        .iter()
        .map(|c| format!("{}::text ILIKE {}", quoted(c), placeholder(n, "text")))
        .collect();
    format!(" WHERE {} AND ({})", LIVE, ors.join(" OR "))
}

/// INSERT with a minted id. Only keys present in `row` are written; the store defaults the rest.
pub fn insert(entity: &ResolvedEntity, id: Uuid, row: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = vec![quoted(ID_COLUMN)];
    let n = q.push_id(id);
    let mut placeholders = vec![placeholder(n, "uuid")];
    for c in &entity.columns {
        let Some(val) = row.get(&c.name) else { continue };
        let n = if c.sensitive {
            q.push_sensitive(val.clone())
        } else {
            q.push_param(val.clone())
        };
        cols.push(quoted(&c.name));
        placeholders.push(placeholder(n, c.pg_type()));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quoted(&entity.table_name),
        cols.join(", "),
        placeholders.join(", "),
        quoted(ID_COLUMN)
    );
    q
}

/// SELECT one live row by id.
pub fn select_by_id(entity: &ResolvedEntity, id: Uuid) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_id(id);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {} AND {}",
        select_column_list(entity),
        quoted(&entity.table_name),
        quoted(ID_COLUMN),
        placeholder(n, "uuid"),
        LIVE
    );
    q
}

/// SELECT one page of live rows, ordered by creation time then id so pages are stable.
pub fn select_list(entity: &ResolvedEntity, search: Option<&str>, limit: u32, offset: u64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = list_where(&mut q, entity, search);
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}, {} LIMIT {} OFFSET {}",
        select_column_list(entity),
        quoted(&entity.table_name),
        where_clause,
        quoted("created_at"),
        quoted(ID_COLUMN),
        limit,
        offset
    );
    q
}

/// COUNT of all live rows matching the same filter as `select_list`.
pub fn count(entity: &ResolvedEntity, search: Option<&str>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = list_where(&mut q, entity, search);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", quoted(&entity.table_name), where_clause);
    q
}

/// UPDATE a live row: SET only update-writable columns present in `fields`, always bump updated_at.
pub fn update(entity: &ResolvedEntity, id: Uuid, fields: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in entity.columns.iter().filter(|c| c.on_update) {
        let Some(v) = fields.get(&c.name) else { continue };
        let n = q.push_param(v.clone());
        sets.push(format!("{} = {}", quoted(&c.name), placeholder(n, c.pg_type())));
    }
    sets.push(format!("{} = NOW()", quoted("updated_at")));
    let n = q.push_id(id);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} AND {} RETURNING {}",
        quoted(&entity.table_name),
        sets.join(", "),
        quoted(ID_COLUMN),
        placeholder(n, "uuid"),
        LIVE,
        quoted(ID_COLUMN)
    );
    q
}

/// Stamp deleted_at on a live row. The row itself is kept.
pub fn soft_delete(entity: &ResolvedEntity, id: Uuid) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_id(id);
    q.sql = format!(
        "UPDATE {} SET {} = NOW() WHERE {} = {} AND {} RETURNING {}",
        quoted(&entity.table_name),
        quoted("deleted_at"),
        quoted(ID_COLUMN),
        placeholder(n, "uuid"),
        LIVE,
        quoted(ID_COLUMN)
    );
    q
}

/// SELECT the stored password of a live account row.
pub fn select_password(entity: &ResolvedEntity, password_column: &str, id: Uuid) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_id(id);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {} AND {}",
        quoted(password_column),
        quoted(&entity.table_name),
        quoted(ID_COLUMN),
        placeholder(n, "uuid"),
        LIVE
    );
    q
}

pub fn update_password(entity: &ResolvedEntity, password_column: &str, id: Uuid, new_password: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let p = q.push_sensitive(Value::String(new_password.to_string()));
    let n = q.push_id(id);
    q.sql = format!(
        "UPDATE {} SET {} = {}, {} = NOW() WHERE {} = {} AND {} RETURNING {}",
        quoted(&entity.table_name),
        quoted(password_column),
        placeholder(p, "text"),
        quoted("updated_at"),
        quoted(ID_COLUMN),
        placeholder(n, "uuid"),
        LIVE,
        quoted(ID_COLUMN)
    );
    q
}
