//! CrudService: orchestration between transport and storage.
//! Forwards to the repository, reading back after every create/update and enforcing the password-change policy.

use crate::config::ResolvedEntity;
use crate::error::AppError;
use crate::repository::{ListRequest, Page, Record, Repository};
use crate::rules::validate_password;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

pub struct CrudService;

impl CrudService {
    /// Insert and return the stored entity. A failed read-back fails the whole call.
    pub async fn create(repo: &dyn Repository, entity: &ResolvedEntity, fields: &Record) -> Result<Value, AppError> {
        let id = repo.create(entity, fields).await.inspect_err(|e| {
            tracing::warn!(entity = %entity.path_segment, error = %e, "create failed");
        })?;
        repo.get(entity, id).await.inspect_err(|e| {
            tracing::warn!(entity = %entity.path_segment, %id, error = %e, "read after create failed");
        })
    }

    pub async fn read(repo: &dyn Repository, entity: &ResolvedEntity, id: Uuid) -> Result<Value, AppError> {
        repo.get(entity, id).await
    }

    pub async fn list(repo: &dyn Repository, entity: &ResolvedEntity, request: &ListRequest) -> Result<Page, AppError> {
        repo.get_list(entity, request).await.inspect_err(|e| {
            tracing::warn!(entity = %entity.path_segment, error = %e, "list failed");
        })
    }

    /// Update the supplied fields and return the refreshed entity.
    pub async fn update(
        repo: &dyn Repository,
        entity: &ResolvedEntity,
        id: Uuid,
        fields: &Record,
    ) -> Result<Value, AppError> {
        let id = repo.update(entity, id, fields).await.inspect_err(|e| {
            tracing::warn!(entity = %entity.path_segment, %id, error = %e, "update failed");
        })?;
        repo.get(entity, id).await
    }

    pub async fn delete(repo: &dyn Repository, entity: &ResolvedEntity, id: Uuid) -> Result<(), AppError> {
        repo.delete(entity, id).await
    }

    /// The stored password must equal `old_password` exactly and the new one must pass the
    /// length rule; only then is the store written.
    pub async fn change_password(
        repo: &dyn Repository,
        entity: &ResolvedEntity,
        id: Uuid,
        change: &PasswordChange,
    ) -> Result<(), AppError> {
        let stored = repo.get_password(entity, id).await?;
        if stored != change.old_password {
            tracing::warn!(entity = %entity.path_segment, %id, "old password did not match");
            return Err(AppError::InvalidCredentials);
        }
        validate_password(&change.new_password)?;
        repo.update_password(entity, id, &change.new_password).await
    }
}
