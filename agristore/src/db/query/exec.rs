//! Statement execution
//!
//! Every statement is rendered with the SQLite builder and its values bound
//! as parameters. Row mapping failures are returned, never skipped.

use rusqlite::types::FromSql;
use rusqlite::{Connection, OptionalExtension, Row};
use sea_query::{Alias, Asterisk, Expr, Func, Order, Query, SelectStatement, SqliteQueryBuilder};
use sea_query_rusqlite::RusqliteBinder;
use tracing::trace;

use super::{Entity, Page, PageRequest};
use crate::error::Result;

/// Run a query and map every row with `map`
pub fn fetch_rows<S, R, F>(conn: &Connection, stmt: &S, map: F) -> Result<Vec<R>>
where
    S: RusqliteBinder,
    F: FnMut(&Row<'_>) -> rusqlite::Result<R>,
{
    let (sql, values) = stmt.build_rusqlite(SqliteQueryBuilder);
    trace!(%sql, "query");

    let mut prepared = conn.prepare(&sql)?;
    let rows = prepared.query_map(&*values.as_params(), map)?;
    let collected = rows.collect::<rusqlite::Result<Vec<R>>>()?;
    Ok(collected)
}

/// Map the first row, if any
pub fn fetch_row_optional<S, R, F>(conn: &Connection, stmt: &S, map: F) -> Result<Option<R>>
where
    S: RusqliteBinder,
    F: FnOnce(&Row<'_>) -> rusqlite::Result<R>,
{
    let (sql, values) = stmt.build_rusqlite(SqliteQueryBuilder);
    trace!(%sql, "query row");

    let row = conn.query_row(&sql, &*values.as_params(), map).optional()?;
    Ok(row)
}

pub fn fetch_all<T: Entity>(conn: &Connection, stmt: &SelectStatement) -> Result<Vec<T>> {
    fetch_rows(conn, stmt, |row| T::from_row(row))
}

pub fn fetch_optional<T: Entity>(conn: &Connection, stmt: &SelectStatement) -> Result<Option<T>> {
    fetch_row_optional(conn, stmt, |row| T::from_row(row))
}

/// First column of the first row
pub fn fetch_scalar<T: FromSql>(conn: &Connection, stmt: &SelectStatement) -> Result<T> {
    let (sql, values) = stmt.build_rusqlite(SqliteQueryBuilder);
    trace!(%sql, "query scalar");

    let value = conn.query_row(&sql, &*values.as_params(), |row| row.get(0))?;
    Ok(value)
}

/// Number of rows `stmt` would return
pub fn fetch_count(conn: &Connection, stmt: &SelectStatement) -> Result<u64> {
    let counted = Query::select()
        .expr(Func::count(Expr::col(Asterisk)))
        .from_subquery(stmt.clone(), Alias::new("counted"))
        .to_owned();

    let count: i64 = fetch_scalar(conn, &counted)?;
    Ok(count.max(0) as u64)
}

/// Whether `stmt` would return at least one row
pub fn fetch_exists(conn: &Connection, stmt: &SelectStatement) -> Result<bool> {
    let exists = Query::select().expr(Expr::exists(stmt.clone())).to_owned();
    fetch_scalar(conn, &exists)
}

/// One page of `stmt`
///
/// The primary key is appended as the last sort key so that page
/// boundaries are stable even when the caller's ordering has ties.
pub fn fetch_page<T: Entity>(
    conn: &Connection,
    stmt: &SelectStatement,
    request: PageRequest,
) -> Result<Page<T>> {
    request.validate()?;
    let total = fetch_count(conn, stmt)?;

    let mut query = stmt.clone();
    query
        .order_by(T::ID, Order::Asc)
        .limit(request.size.min(i64::MAX as u64))
        .offset(request.offset().min(i64::MAX as u64));

    let content = fetch_all(conn, &query)?;
    Ok(Page::new(content, request, total))
}

/// Run an INSERT, UPDATE or DELETE and return the number of affected rows
pub fn execute<S: RusqliteBinder>(conn: &Connection, stmt: &S) -> Result<usize> {
    let (sql, values) = stmt.build_rusqlite(SqliteQueryBuilder);
    trace!(%sql, "execute");

    let affected = conn.execute(&sql, &*values.as_params())?;
    Ok(affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::Cond;

    fn setup_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE plots (id TEXT PRIMARY KEY, name TEXT NOT NULL, size REAL);
             INSERT INTO plots VALUES ('a', 'north', 1.5), ('b', 'south', 4.0), ('c', 'east', NULL);",
        )
        .unwrap();
        conn
    }

    fn plots() -> SelectStatement {
        Query::select()
            .columns([Alias::new("id"), Alias::new("name")])
            .from(Alias::new("plots"))
            .to_owned()
    }

    #[test]
    fn test_fetch_rows_binds_values() {
        let conn = setup_conn();
        let stmt = plots()
            .and_where(Expr::col(Alias::new("size")).gt(2.0))
            .to_owned();
        let names = fetch_rows(&conn, &stmt, |row| row.get::<_, String>("name")).unwrap();
        assert_eq!(names, vec!["south".to_string()]);
    }

    #[test]
    fn test_fetch_rows_propagates_mapping_errors() {
        let conn = setup_conn();
        let result = fetch_rows(&conn, &plots(), |row| row.get::<_, i64>("name"));
        assert!(result.is_err());
    }

    #[test]
    fn test_count_and_exists() {
        let conn = setup_conn();
        assert_eq!(fetch_count(&conn, &plots()).unwrap(), 3);
        assert!(fetch_exists(&conn, &plots()).unwrap());

        let none = plots()
            .cond_where(Cond::all().add(Expr::col(Alias::new("name")).eq("west")))
            .to_owned();
        assert_eq!(fetch_count(&conn, &none).unwrap(), 0);
        assert!(!fetch_exists(&conn, &none).unwrap());
    }

    #[test]
    fn test_fetch_row_optional_missing() {
        let conn = setup_conn();
        let stmt = plots()
            .and_where(Expr::col(Alias::new("id")).eq("zz"))
            .to_owned();
        let row = fetch_row_optional(&conn, &stmt, |row| row.get::<_, String>("id")).unwrap();
        assert!(row.is_none());
    }

    #[test]
    fn test_execute_reports_affected_rows() {
        let conn = setup_conn();
        let stmt = Query::update()
            .table(Alias::new("plots"))
            .value(Alias::new("size"), 0.5)
            .and_where(Expr::col(Alias::new("size")).is_null())
            .to_owned();
        assert_eq!(execute(&conn, &stmt).unwrap(), 1);
        assert_eq!(execute(&conn, &stmt).unwrap(), 0);
    }
}
