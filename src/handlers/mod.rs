//! HTTP handlers for entity CRUD and password change.

pub mod entity;
pub use entity::*;
