//! Request extractors that reject with the standard envelope.

mod pagination;
pub use pagination::{ListParams, MAX_LIMIT};
