//! Durable storage (SQLite) and the Redis cache layer above it.

pub mod backup;
pub mod cache;
pub mod db;
pub mod repository;

pub use db::{create_pool, get_connection, DbConnection, DbPool};
