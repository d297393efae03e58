//! CrudService: generic orchestration over the repository, plus request decoding.

mod crud;
mod validation;
pub use crud::{CrudService, PasswordChange};
pub use validation::RequestValidator;
