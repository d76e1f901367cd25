//! Typed storage for farm-management records
//!
//! Entities live in [`db::models`], the query engine in [`db::query`] and the
//! per-entity operations in [`db::repository`]. A [`Database`] owns the
//! connection pool; every repository function borrows one connection.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;

pub use config::StoreConfig;
pub use db::{Database, DbConn, DbPool};
pub use error::{Result, StoreError};
