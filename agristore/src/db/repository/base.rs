//! Operations shared by every entity
//!
//! The named lookups in the per-entity repositories are thin wrappers that
//! build a [`Filter`] and an ordering and hand them to these functions.

use rusqlite::types::FromSql;
use rusqlite::Connection;
use sea_query::{
    Alias, Asterisk, Expr, Func, OnConflict, Order, Query, SelectStatement, SimpleExpr,
};
use tracing::debug;

use crate::db::query::{self, Entity, Filter, Page, PageRequest};
use crate::error::Result;

/// SQL aggregate applied to a numeric column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Avg,
    Sum,
    Min,
    Max,
}

impl Aggregate {
    fn apply(self, expr: Expr) -> SimpleExpr {
        match self {
            Aggregate::Avg => Func::avg(expr).into(),
            Aggregate::Sum => Func::sum(expr).into(),
            Aggregate::Min => Func::min(expr).into(),
            Aggregate::Max => Func::max(expr).into(),
        }
    }
}

/// `SELECT <columns> FROM <table> WHERE <filter> ORDER BY <order>`
pub fn select_where<T: Entity>(filter: Filter, order: &[(T::Column, Order)]) -> SelectStatement {
    let mut stmt = query::select::<T>();
    stmt.cond_where(filter);
    for (col, dir) in order {
        stmt.order_by(*col, dir.clone());
    }
    stmt
}

/// Insert the record, or overwrite every column of the row with the same id
pub fn save<T: Entity>(conn: &Connection, entity: &T) -> Result<()> {
    let mut stmt = Query::insert();
    stmt.into_table(T::TABLE)
        .columns(T::COLUMNS.iter().copied())
        .values(entity.values().into_iter().map(SimpleExpr::Value))?
        .on_conflict(
            OnConflict::column(T::ID)
                .update_columns(T::COLUMNS.iter().copied())
                .to_owned(),
        );

    query::execute(conn, &stmt)?;
    debug!(entity = T::NAME, id = entity.id(), "saved");
    Ok(())
}

/// Save each record in order; stops at the first failure
pub fn save_all<T: Entity>(conn: &Connection, entities: &[T]) -> Result<usize> {
    for entity in entities {
        save(conn, entity)?;
    }
    Ok(entities.len())
}

pub fn find_by_id<T: Entity>(conn: &Connection, id: &str) -> Result<Option<T>> {
    find_one_where(conn, Filter::all().eq(T::ID, id))
}

pub fn exists_by_id<T: Entity>(conn: &Connection, id: &str) -> Result<bool> {
    exists_where::<T>(conn, Filter::all().eq(T::ID, id))
}

pub fn find_all<T: Entity>(conn: &Connection) -> Result<Vec<T>> {
    find_where_ordered(conn, Filter::all(), &[(T::ID, Order::Asc)])
}

pub fn find_all_paged<T: Entity>(conn: &Connection, page: PageRequest) -> Result<Page<T>> {
    find_page_where(conn, Filter::all(), &[], page)
}

pub fn count_all<T: Entity>(conn: &Connection) -> Result<u64> {
    count_where::<T>(conn, Filter::all())
}

/// Delete by id; `false` when no row had that id
pub fn delete_by_id<T: Entity>(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = delete_where::<T>(conn, Filter::all().eq(T::ID, id))?;
    Ok(deleted > 0)
}

/// First match in id order
pub fn find_one_where<T: Entity>(conn: &Connection, filter: Filter) -> Result<Option<T>> {
    let stmt = select_where::<T>(filter, &[(T::ID, Order::Asc)]);
    query::fetch_optional(conn, &stmt)
}

/// First match in the given order
pub fn find_first_ordered<T: Entity>(
    conn: &Connection,
    filter: Filter,
    order: &[(T::Column, Order)],
) -> Result<Option<T>> {
    let stmt = select_where::<T>(filter, order);
    query::fetch_optional(conn, &stmt)
}

pub fn find_where<T: Entity>(conn: &Connection, filter: Filter) -> Result<Vec<T>> {
    find_where_ordered(conn, filter, &[])
}

pub fn find_where_ordered<T: Entity>(
    conn: &Connection,
    filter: Filter,
    order: &[(T::Column, Order)],
) -> Result<Vec<T>> {
    let stmt = select_where::<T>(filter, order);
    query::fetch_all(conn, &stmt)
}

/// At most `limit` matches in the given order
pub fn find_limited<T: Entity>(
    conn: &Connection,
    filter: Filter,
    order: &[(T::Column, Order)],
    limit: u64,
) -> Result<Vec<T>> {
    let mut stmt = select_where::<T>(filter, order);
    stmt.limit(limit.min(i64::MAX as u64));
    query::fetch_all(conn, &stmt)
}

pub fn find_page_where<T: Entity>(
    conn: &Connection,
    filter: Filter,
    order: &[(T::Column, Order)],
    page: PageRequest,
) -> Result<Page<T>> {
    let stmt = select_where::<T>(filter, order);
    query::fetch_page(conn, &stmt, page)
}

pub fn count_where<T: Entity>(conn: &Connection, filter: Filter) -> Result<u64> {
    let stmt = Query::select()
        .expr(Func::count(Expr::col(Asterisk)))
        .from(T::TABLE)
        .cond_where(filter)
        .to_owned();
    let count: i64 = query::fetch_scalar(conn, &stmt)?;
    Ok(count.max(0) as u64)
}

pub fn exists_where<T: Entity>(conn: &Connection, filter: Filter) -> Result<bool> {
    let stmt = Query::select()
        .expr(Expr::val(1))
        .from(T::TABLE)
        .cond_where(filter)
        .to_owned();
    query::fetch_exists(conn, &stmt)
}

/// Set columns on every matching row in one statement
pub fn update_where<T: Entity>(
    conn: &Connection,
    values: Vec<(T::Column, SimpleExpr)>,
    filter: Filter,
) -> Result<usize> {
    let _span = crate::operation_span!("update_where", table = T::NAME).entered();
    let stmt = Query::update()
        .table(T::TABLE)
        .values(values)
        .cond_where(filter)
        .to_owned();
    query::execute(conn, &stmt)
}

/// Delete every matching row in one statement
pub fn delete_where<T: Entity>(conn: &Connection, filter: Filter) -> Result<usize> {
    let _span = crate::operation_span!("delete_where", table = T::NAME).entered();
    let stmt = Query::delete()
        .from_table(T::TABLE)
        .cond_where(filter)
        .to_owned();
    query::execute(conn, &stmt)
}

/// Row counts per distinct value of `key`, largest group first
pub fn count_grouped<T, K>(conn: &Connection, key: T::Column, filter: Filter) -> Result<Vec<(K, u64)>>
where
    T: Entity,
    K: FromSql,
{
    let total = Alias::new("total");
    let stmt = Query::select()
        .column(key)
        .expr_as(Func::count(Expr::col(Asterisk)), total.clone())
        .from(T::TABLE)
        .cond_where(filter)
        .group_by_col(key)
        .order_by(total, Order::Desc)
        .order_by(key, Order::Asc)
        .to_owned();

    query::fetch_rows(conn, &stmt, |row| {
        let count: i64 = row.get(1)?;
        Ok((row.get(0)?, count.max(0) as u64))
    })
}

/// Aggregate of a numeric column over the matching rows; `None` when no
/// row has a value
pub fn aggregate<T: Entity>(
    conn: &Connection,
    func: Aggregate,
    col: T::Column,
    filter: Filter,
) -> Result<Option<f64>> {
    let stmt = Query::select()
        .expr(func.apply(Expr::col(col)))
        .from(T::TABLE)
        .cond_where(filter)
        .to_owned();
    query::fetch_scalar(conn, &stmt)
}

/// Aggregate of `value` per distinct `key`, in key order
pub fn aggregate_grouped<T, K>(
    conn: &Connection,
    func: Aggregate,
    key: T::Column,
    value: T::Column,
    filter: Filter,
) -> Result<Vec<(K, Option<f64>)>>
where
    T: Entity,
    K: FromSql,
{
    let stmt = Query::select()
        .column(key)
        .expr(func.apply(Expr::col(value)))
        .from(T::TABLE)
        .cond_where(filter)
        .group_by_col(key)
        .order_by(key, Order::Asc)
        .to_owned();

    query::fetch_rows(conn, &stmt, |row| Ok((row.get(0)?, row.get(1)?)))
}

/// Distinct non-null values of `col`
pub fn distinct_values<T, K>(
    conn: &Connection,
    col: T::Column,
    filter: Filter,
    order: Order,
) -> Result<Vec<K>>
where
    T: Entity,
    K: FromSql,
{
    let stmt = Query::select()
        .distinct()
        .column(col)
        .from(T::TABLE)
        .cond_where(filter.is_not_null(col))
        .order_by(col, order)
        .to_owned();

    query::fetch_rows(conn, &stmt, |row| row.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Farm, FarmIden, IrrigationSystem};
    use crate::db::{create_test_database, DbConn};

    fn farm(code: &str, size: f64, soil: Option<&str>) -> Farm {
        let mut farm = Farm::new("farmer-1", format!("Farm {code}"), code, size);
        farm.soil_type = soil.map(str::to_string);
        farm
    }

    fn seeded() -> (crate::db::Database, DbConn) {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        save_all(
            &conn,
            &[
                farm("F-1", 1.5, Some("Clay")),
                farm("F-2", 5.0, Some("Loam")),
                farm("F-3", 12.0, Some("Clay")),
                farm("F-4", 3.0, None),
            ],
        )
        .unwrap();
        (db, conn)
    }

    #[test]
    fn test_save_and_find_by_id() {
        let (_db, conn) = seeded();
        let original = farm("F-9", 2.25, Some("Sand"));
        save(&conn, &original).unwrap();

        let found: Farm = find_by_id(&conn, &original.id).unwrap().unwrap();
        assert_eq!(found.farm_code, "F-9");
        assert_eq!(found.soil_type.as_deref(), Some("Sand"));
        assert_eq!(found.irrigation_system, IrrigationSystem::RainFed);
        assert!(exists_by_id::<Farm>(&conn, &original.id).unwrap());
        assert!(find_by_id::<Farm>(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites_existing_row() {
        let (_db, conn) = seeded();
        let mut record = farm("F-10", 1.0, None);
        save(&conn, &record).unwrap();

        record.farm_size = 8.0;
        save(&conn, &record).unwrap();

        let found: Farm = find_by_id(&conn, &record.id).unwrap().unwrap();
        assert_eq!(found.farm_size, 8.0);
        assert_eq!(count_all::<Farm>(&conn).unwrap(), 5);
    }

    #[test]
    fn test_duplicate_business_code_is_rejected() {
        let (_db, conn) = seeded();
        assert!(save(&conn, &farm("F-1", 1.0, None)).is_err());
    }

    #[test]
    fn test_delete_by_id() {
        let (_db, conn) = seeded();
        let all: Vec<Farm> = find_all(&conn).unwrap();
        assert!(delete_by_id::<Farm>(&conn, &all[0].id).unwrap());
        assert!(!delete_by_id::<Farm>(&conn, &all[0].id).unwrap());
        assert_eq!(count_all::<Farm>(&conn).unwrap(), 3);
    }

    #[test]
    fn test_exists_matches_find() {
        let (_db, conn) = seeded();
        for soil in ["Clay", "Loam", "Peat"] {
            let filter = Filter::all().eq(FarmIden::SoilType, soil);
            let found: Vec<Farm> = find_where(&conn, filter.clone()).unwrap();
            assert_eq!(exists_where::<Farm>(&conn, filter).unwrap(), !found.is_empty());
        }
    }

    #[test]
    fn test_pages_cover_every_row_once() {
        let (_db, conn) = seeded();
        let total = count_all::<Farm>(&conn).unwrap();

        let mut seen = Vec::new();
        let mut request = PageRequest::first(3);
        loop {
            let page: Page<Farm> = find_all_paged(&conn, request).unwrap();
            assert_eq!(page.total_elements, total);
            seen.extend(page.content.iter().map(|f| f.id.clone()));
            if !page.has_next() {
                break;
            }
            request = request.next();
        }

        assert_eq!(seen.len() as u64, total);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len() as u64, total);
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let (_db, conn) = seeded();
        let result = find_all_paged::<Farm>(&conn, PageRequest::new(0, 0));
        assert!(matches!(result, Err(crate::error::StoreError::Validation(_))));
    }

    #[test]
    fn test_grouped_counts_sum_to_total() {
        let (_db, conn) = seeded();
        let groups: Vec<(Option<String>, u64)> =
            count_grouped::<Farm, _>(&conn, FarmIden::SoilType, Filter::all()).unwrap();

        assert_eq!(groups[0], (Some("Clay".to_string()), 2));
        let sum: u64 = groups.iter().map(|(_, n)| n).sum();
        assert_eq!(sum, count_all::<Farm>(&conn).unwrap());
    }

    #[test]
    fn test_aggregates() {
        let (_db, conn) = seeded();
        let total = aggregate::<Farm>(&conn, Aggregate::Sum, FarmIden::FarmSize, Filter::all())
            .unwrap();
        assert_eq!(total, Some(21.5));

        let none = aggregate::<Farm>(
            &conn,
            Aggregate::Avg,
            FarmIden::FarmSize,
            Filter::all().eq(FarmIden::FarmerId, "nobody"),
        )
        .unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn test_update_and_delete_where() {
        let (_db, conn) = seeded();
        let updated = update_where::<Farm>(
            &conn,
            vec![(FarmIden::ElectricityAvailable, true.into())],
            Filter::all().gt(FarmIden::FarmSize, 2.0),
        )
        .unwrap();
        assert_eq!(updated, 3);

        let deleted =
            delete_where::<Farm>(&conn, Filter::all().eq(FarmIden::ElectricityAvailable, false))
                .unwrap();
        assert_eq!(deleted, 1);
    }

    #[test]
    fn test_distinct_values_skip_nulls() {
        let (_db, conn) = seeded();
        let soils: Vec<String> =
            distinct_values::<Farm, _>(&conn, FarmIden::SoilType, Filter::all(), Order::Asc)
                .unwrap();
        assert_eq!(soils, vec!["Clay".to_string(), "Loam".to_string()]);
    }
}
