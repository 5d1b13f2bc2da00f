//! Message endpoints, grouped by concern.

pub mod admin;
pub mod commands;
pub mod files;
pub mod schema;
pub mod types;
pub mod upload;

pub use schema::{build_router, schema, HandlerError};
pub use types::{Event, HandlerDeps};
