//! Extract `page`, `limit` and `search` from the query string.

use crate::error::AppError;
use crate::repository::ListRequest;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use std::collections::HashMap;

/// Upper bound on `limit`; larger values are clamped.
pub const MAX_LIMIT: u32 = 1000;

/// `?page=1&limit=10&search=` with those defaults. page and limit must be positive integers.
#[derive(Clone, Debug)]
pub struct ListParams(pub ListRequest);

impl ListParams {
    pub fn from_pairs(params: &HashMap<String, String>) -> Result<Self, AppError> {
        let page = positive(params, "page", 1)?;
        let limit = positive(params, "limit", 10)?.min(MAX_LIMIT);
        let search = params.get("search").cloned().unwrap_or_default();
        Ok(ListParams(ListRequest { page, limit, search }))
    }
}

fn positive(params: &HashMap<String, String>, key: &str, default: u32) -> Result<u32, AppError> {
    let Some(raw) = params.get(key) else { return Ok(default) };
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::BadRequest(format!(
            "{} must be a positive integer, got '{}'",
            key, raw
        ))),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ListParams
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map_err(|e| AppError::BadRequest(format!("invalid query string: {}", e)))?;
        Self::from_pairs(&params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Result<ListRequest, AppError> {
        let map = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ListParams::from_pairs(&map).map(|p| p.0)
    }

    #[test]
    fn defaults() {
        assert_eq!(params(&[]).unwrap(), ListRequest::default());
    }

    #[test]
    fn parses_all_three() {
        let r = params(&[("page", "3"), ("limit", "25"), ("search", "aziz")]).unwrap();
        assert_eq!(r, ListRequest { page: 3, limit: 25, search: "aziz".into() });
    }

    #[test]
    fn rejects_non_integers_and_zero() {
        for (k, v) in [("page", "one"), ("limit", "ten"), ("page", "0"), ("limit", "-5"), ("page", "")] {
            assert!(matches!(params(&[(k, v)]), Err(AppError::BadRequest(_))), "{}={}", k, v);
        }
    }

    #[test]
    fn clamps_limit() {
        assert_eq!(params(&[("limit", "5000")]).unwrap().limit, MAX_LIMIT);
    }
}
