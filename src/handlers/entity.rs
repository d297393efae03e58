//! Entity handlers: create, read, list, update, delete, change password.
//! The entity is resolved from the first path segment; the id only ever comes from the path.

use crate::config::{ResolvedEntity, OP_CHANGE_PASSWORD, OP_CREATE, OP_DELETE, OP_READ, OP_UPDATE};
use crate::error::AppError;
use crate::extractors::ListParams;
use crate::response::{created, ok, ListPayload};
use crate::service::{CrudService, PasswordChange, RequestValidator};
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

fn entity_for<'a>(state: &'a AppState, path_segment: &str, operation: &str) -> Result<&'a ResolvedEntity, AppError> {
    let entity = state
        .model
        .entity_by_path(path_segment)
        .ok_or_else(|| AppError::NotFound(format!("unknown entity '{}'", path_segment)))?;
    if !entity.allows(operation) {
        return Err(AppError::BadRequest(format!("{} not allowed on {}", operation, path_segment)));
    }
    Ok(entity)
}

fn parse_id(id_str: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id_str).map_err(|_| AppError::BadRequest(format!("invalid uuid '{}'", id_str)))
}

fn path_params<T>(path: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    path.map(|Path(p)| p)
        .map_err(|e| AppError::BadRequest(format!("invalid path: {}", e.body_text())))
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    body.map(|Json(v)| v).map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(e.body_text())
        } else {
            AppError::BadRequest(format!("error while reading body: {}", e.body_text()))
        }
    })
}

pub async fn list(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    ListParams(request): ListParams,
) -> Result<impl IntoResponse, AppError> {
    let path_segment = path_params(path)?;
    let entity = entity_for(&state, &path_segment, OP_READ)?;
    let page = CrudService::list(state.repo.as_ref(), entity, &request).await?;
    Ok(ok(ListPayload {
        items: page.items,
        count: page.count,
    }))
}

pub async fn create(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let path_segment = path_params(path)?;
    let entity = entity_for(&state, &path_segment, OP_CREATE)?;
    let fields = RequestValidator::decode_create(entity, json_body(body)?)?;
    let row = CrudService::create(state.repo.as_ref(), entity, &fields).await?;
    Ok(created(row))
}

pub async fn read(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let (path_segment, id_str) = path_params(path)?;
    let entity = entity_for(&state, &path_segment, OP_READ)?;
    let id = parse_id(&id_str)?;
    let row = CrudService::read(state.repo.as_ref(), entity, id).await?;
    Ok(ok(row))
}

pub async fn update(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let (path_segment, id_str) = path_params(path)?;
    let entity = entity_for(&state, &path_segment, OP_UPDATE)?;
    let id = parse_id(&id_str)?;
    let fields = RequestValidator::decode_update(entity, json_body(body)?)?;
    let row = CrudService::update(state.repo.as_ref(), entity, id, &fields).await?;
    Ok(ok(row))
}

pub async fn delete(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let (path_segment, id_str) = path_params(path)?;
    let entity = entity_for(&state, &path_segment, OP_DELETE)?;
    let id = parse_id(&id_str)?;
    CrudService::delete(state.repo.as_ref(), entity, id).await?;
    Ok(ok("data successfully deleted"))
}

pub async fn change_password(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let (path_segment, id_str) = path_params(path)?;
    let entity = entity_for(&state, &path_segment, OP_CHANGE_PASSWORD)?;
    let id = parse_id(&id_str)?;
    let change: PasswordChange = serde_json::from_value(json_body(body)?)
        .map_err(|e| AppError::BadRequest(format!("error while reading body: {}", e)))?;
    CrudService::change_password(state.repo.as_ref(), entity, id, &change).await?;
    Ok(ok("password successfully updated"))
}
