//! Standard response envelope: `{status_code, description, data}` on every endpoint.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status_code: u16,
    pub description: &'static str,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        Envelope {
            status_code: status.as_u16(),
            description: describe(status),
            data,
        }
    }
}

/// Coarse bucket for the status code. The "succes" spelling is part of the wire contract.
pub fn describe(status: StatusCode) -> &'static str {
    match status.as_u16() {
        0..=399 => "succes",
        400..=499 => "bad request",
        _ => "internal server error",
    }
}

/// One page of a list plus the total number of live rows matching the filter.
#[derive(Debug, Serialize)]
pub struct ListPayload {
    pub items: Vec<Value>,
    pub count: u64,
}

pub fn success<T: Serialize>(status: StatusCode, data: T) -> (StatusCode, Json<Envelope<T>>) {
    (status, Json(Envelope::new(status, data)))
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    success(StatusCode::CREATED, data)
}

pub fn ok<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    success(StatusCode::OK, data)
}
