//! Query execution engine
//!
//! Statements are assembled with sea-query from typed column identifiers and
//! [`Filter`] predicate trees, rendered for SQLite at call time, and their rows
//! mapped back through [`Entity::from_row`].

pub mod codec;
pub mod exec;
pub mod filter;
pub mod functions;
pub mod geo;
pub mod page;

pub use exec::*;
pub use filter::{contains_ignore_case, Filter};
pub use geo::{haversine_km, validate_radius, within_radius, BoundingBox, EARTH_RADIUS_KM};
pub use page::{Page, PageRequest};

use rusqlite::Row;
use sea_query::{Iden, Query, SelectStatement, Value};

/// A record stored in its own table with a text primary key
pub trait Entity: Sized {
    /// Column identifiers, including the `Table` identifier
    type Column: Iden + Copy + 'static;

    /// Human readable name used in log output
    const NAME: &'static str;
    const TABLE: Self::Column;
    const ID: Self::Column;

    /// Columns in the order produced by [`Entity::values`]
    const COLUMNS: &'static [Self::Column];

    fn id(&self) -> &str;

    /// Query values for every column, in [`Entity::COLUMNS`] order
    fn values(&self) -> Vec<Value>;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// `SELECT <all columns> FROM <table>`
pub fn select<T: Entity>() -> SelectStatement {
    Query::select()
        .columns(T::COLUMNS.iter().copied())
        .from(T::TABLE)
        .to_owned()
}
