//! Decode request bodies into create/update commands: descriptor-driven field selection,
//! type checks with normalisation, and per-column rules from the catalog.

use crate::config::{ColumnInfo, ColumnType, ResolvedEntity, ValidationRule};
use crate::error::AppError;
use crate::repository::Record;
use crate::rules::{parse_date, DATE_FORMAT};
use serde_json::Value;

pub struct RequestValidator;

impl RequestValidator {
    /// Create command: create-writable columns only. Required columns must be present and non-null.
    pub fn decode_create(entity: &ResolvedEntity, body: Value) -> Result<Record, AppError> {
        Self::decode(entity, body, |c| c.on_create, true)
    }

    /// Update command: update-writable columns only; absent columns are left untouched.
    /// Identity is never taken from the body.
    pub fn decode_update(entity: &ResolvedEntity, body: Value) -> Result<Record, AppError> {
        Self::decode(entity, body, |c| c.on_update, false)
    }

    fn decode<F>(entity: &ResolvedEntity, body: Value, writable: F, enforce_required: bool) -> Result<Record, AppError>
    where
        F: Fn(&ColumnInfo) -> bool,
    {
        let Value::Object(mut body) = body else {
            return Err(AppError::BadRequest("body must be a JSON object".into()));
        };
        let no_rule = ValidationRule::default();
        let mut out = Record::new();
        for c in entity.columns.iter().filter(|c| writable(c)) {
            let rule = entity.validation.get(&c.name).unwrap_or(&no_rule);
            let required = rule.required == Some(true);
            match body.remove(&c.name) {
                None if enforce_required && required => {
                    return Err(AppError::Validation(format!("{} is required", c.name)));
                }
                None => {}
                Some(Value::Null) => {
                    if required || !c.nullable {
                        return Err(AppError::Validation(format!("{} must not be null", c.name)));
                    }
                    out.insert(c.name.clone(), Value::Null);
                }
                Some(v) => {
                    let v = normalize(c, v)?;
                    validate_field(&c.name, &v, rule)?;
                    out.insert(c.name.clone(), v);
                }
            }
        }
        Ok(out)
    }
}

/// Check the JSON type against the column type and return the canonical form stored and compared.
fn normalize(c: &ColumnInfo, v: Value) -> Result<Value, AppError> {
    let col = c.name.as_str();
    match c.column_type {
        ColumnType::Text => match v {
            Value::String(_) => Ok(v),
            _ => Err(AppError::Validation(format!("{} must be a string", col))),
        },
        ColumnType::Integer => v
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Value::from)
            .ok_or_else(|| AppError::Validation(format!("{} must be an integer", col))),
        ColumnType::Numeric => {
            let text = match &v {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s.trim().to_string(),
                _ => String::new(),
            };
            match text.parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Value::String(text)),
                _ => Err(AppError::Validation(format!("{} must be a number", col))),
            }
        }
        ColumnType::Date => v
            .as_str()
            .and_then(parse_date)
            .map(|d| Value::String(d.format(DATE_FORMAT).to_string()))
            .ok_or_else(|| AppError::Validation(format!("{} must be a date (YYYY-MM-DD)", col))),
        ColumnType::Uuid => v
            .as_str()
            .and_then(|s| uuid::Uuid::parse_str(s.trim()).ok())
            .map(|u| Value::String(u.to_string()))
            .ok_or_else(|| AppError::Validation(format!("{} must be a valid UUID", col))),
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn validate_field(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if let Some(format) = &rule.format {
        validate_format(col, v, format)?;
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    col, max
                )));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at least {} characters",
                    col, min
                )));
            }
        }
    }
    if let Some(ref allowed) = rule.allowed {
        if !allowed.iter().any(|a| a == v) {
            return Err(AppError::Validation(format!(
                "{} must be one of: {:?}",
                col,
                allowed.iter().take(5).collect::<Vec<_>>()
            )));
        }
    }
    if let Some(n) = as_number(v) {
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(AppError::Validation(format!("{} must be at least {}", col, min)));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(AppError::Validation(format!("{} must be at most {}", col, max)));
            }
        }
    }
    Ok(())
}

fn validate_format(col: &str, v: &Value, format: &str) -> Result<(), AppError> {
    let Some(s) = v.as_str() else { return Ok(()) };
    match format.to_lowercase().as_str() {
        "email" => {
            // Empty strings are accepted; an absent email is not malformed.
            if !s.is_empty() && (!s.contains('@') || s.len() < 3) {
                return Err(AppError::Validation(format!("{} must be a valid email", col)));
            }
        }
        "uuid" => {
            if uuid::Uuid::parse_str(s).is_err() {
                return Err(AppError::Validation(format!("{} must be a valid UUID", col)));
            }
        }
        _ => {}
    }
    Ok(())
}
