//! Repository for crop production cycles

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use sea_query::{Alias, Expr, Func, Order, Query};

use crate::db::models::{
    CropProduction, CropProductionIden, CropSeason, ProductionMethod, ProductionStatus,
};
use crate::db::query::{self, codec, Filter, Page, PageRequest};
use crate::db::repository::base::{self, Aggregate};
use crate::error::Result;

/// Statuses of a production that is in the ground
pub const IN_FIELD: [ProductionStatus; 2] = [ProductionStatus::Planted, ProductionStatus::Growing];

/// Statuses of a production that has been harvested
pub const FINISHED: [ProductionStatus; 2] = [ProductionStatus::Harvested, ProductionStatus::Sold];

/// Yield statistics for one crop over productions with a recorded yield
#[derive(Debug, Clone, PartialEq)]
pub struct YieldStatistics {
    pub crop_id: String,
    pub average_yield: f64,
    pub min_yield: f64,
    pub max_yield: f64,
    pub productions: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CropProductionFilter {
    pub farm_id: Option<String>,
    pub crop_id: Option<String>,
    pub status: Option<ProductionStatus>,
    pub season: Option<CropSeason>,
    pub year: Option<i32>,
    pub production_method: Option<ProductionMethod>,
    pub planted_from: Option<NaiveDate>,
    pub planted_to: Option<NaiveDate>,
    pub min_area: Option<f64>,
    pub max_area: Option<f64>,
}

impl CropProductionFilter {
    fn to_filter(&self) -> Filter {
        Filter::all()
            .eq_opt(CropProductionIden::FarmId, self.farm_id.as_deref())
            .eq_opt(CropProductionIden::CropId, self.crop_id.as_deref())
            .eq_opt(CropProductionIden::ProductionStatus, self.status)
            .eq_opt(CropProductionIden::Season, self.season)
            .eq_opt(CropProductionIden::Year, self.year)
            .eq_opt(CropProductionIden::ProductionMethod, self.production_method)
            .gte_opt(CropProductionIden::PlantingDate, codec::opt_date(self.planted_from))
            .lte_opt(CropProductionIden::PlantingDate, codec::opt_date(self.planted_to))
            .gte_opt(CropProductionIden::AreaPlanted, self.min_area)
            .lte_opt(CropProductionIden::AreaPlanted, self.max_area)
    }
}

const NEWEST_FIRST: &[(CropProductionIden, Order)] = &[(CropProductionIden::CreatedAt, Order::Desc)];
const BY_EXPECTED_HARVEST: &[(CropProductionIden, Order)] =
    &[(CropProductionIden::ExpectedHarvestDate, Order::Asc)];

pub fn find_production_by_code(conn: &Connection, code: &str) -> Result<Option<CropProduction>> {
    base::find_one_where(conn, Filter::all().eq(CropProductionIden::ProductionCode, code))
}

pub fn exists_production_by_code(conn: &Connection, code: &str) -> Result<bool> {
    base::exists_where::<CropProduction>(
        conn,
        Filter::all().eq(CropProductionIden::ProductionCode, code),
    )
}

/// Productions on a farm, newest first
pub fn find_productions_by_farm(conn: &Connection, farm_id: &str) -> Result<Vec<CropProduction>> {
    base::find_where_ordered(conn, by_farm(farm_id), NEWEST_FIRST)
}

pub fn find_productions_by_farm_paged(
    conn: &Connection,
    farm_id: &str,
    page: PageRequest,
) -> Result<Page<CropProduction>> {
    base::find_page_where(conn, by_farm(farm_id), NEWEST_FIRST, page)
}

pub fn find_productions_by_crop(conn: &Connection, crop_id: &str) -> Result<Vec<CropProduction>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(CropProductionIden::CropId, crop_id),
        NEWEST_FIRST,
    )
}

pub fn find_productions_by_status(
    conn: &Connection,
    status: ProductionStatus,
) -> Result<Vec<CropProduction>> {
    base::find_where_ordered(conn, by_status(status), NEWEST_FIRST)
}

pub fn find_productions_by_farm_and_status(
    conn: &Connection,
    farm_id: &str,
    status: ProductionStatus,
) -> Result<Vec<CropProduction>> {
    base::find_where_ordered(
        conn,
        by_farm(farm_id).eq(CropProductionIden::ProductionStatus, status),
        NEWEST_FIRST,
    )
}

pub fn find_productions_by_year(conn: &Connection, year: i32) -> Result<Vec<CropProduction>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(CropProductionIden::Year, year),
        NEWEST_FIRST,
    )
}

pub fn count_productions_by_farm(conn: &Connection, farm_id: &str) -> Result<u64> {
    base::count_where::<CropProduction>(conn, by_farm(farm_id))
}

pub fn count_productions_by_crop(conn: &Connection, crop_id: &str) -> Result<u64> {
    base::count_where::<CropProduction>(conn, Filter::all().eq(CropProductionIden::CropId, crop_id))
}

pub fn count_productions_by_status(conn: &Connection) -> Result<Vec<(ProductionStatus, u64)>> {
    base::count_grouped::<CropProduction, _>(
        conn,
        CropProductionIden::ProductionStatus,
        Filter::all(),
    )
}

/// Productions whose expected harvest date is before `as_of` and that have
/// not been harvested or sold, earliest first
pub fn find_overdue_harvests(conn: &Connection, as_of: NaiveDate) -> Result<Vec<CropProduction>> {
    let filter = Filter::all()
        .lt(CropProductionIden::ExpectedHarvestDate, codec::date(as_of))
        .not_in(CropProductionIden::ProductionStatus, FINISHED);
    base::find_where_ordered(conn, filter, BY_EXPECTED_HARVEST)
}

/// In-field productions expected to be harvested between `from` and `to` inclusive
pub fn find_harvests_due_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<CropProduction>> {
    let filter = Filter::all()
        .between(
            CropProductionIden::ExpectedHarvestDate,
            codec::date(from),
            codec::date(to),
        )
        .is_in(CropProductionIden::ProductionStatus, IN_FIELD);
    base::find_where_ordered(conn, filter, BY_EXPECTED_HARVEST)
}

/// Productions currently planted or growing
pub fn find_active_productions(conn: &Connection) -> Result<Vec<CropProduction>> {
    base::find_where_ordered(
        conn,
        Filter::all().is_in(CropProductionIden::ProductionStatus, IN_FIELD),
        NEWEST_FIRST,
    )
}

pub fn find_completed_productions(conn: &Connection) -> Result<Vec<CropProduction>> {
    base::find_where_ordered(
        conn,
        Filter::all().is_in(CropProductionIden::ProductionStatus, FINISHED),
        NEWEST_FIRST,
    )
}

pub fn search_productions(conn: &Connection, term: &str) -> Result<Vec<CropProduction>> {
    let filter = Filter::all().search_any(
        [
            CropProductionIden::ProductionCode,
            CropProductionIden::SeedVariety,
            CropProductionIden::SeedSource,
            CropProductionIden::Certification,
            CropProductionIden::Notes,
        ],
        term,
    );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

/// Average, minimum and maximum actual yield per crop
///
/// Productions without an actual yield are ignored.
pub fn yield_statistics_by_crop(conn: &Connection) -> Result<Vec<YieldStatistics>> {
    let stmt = Query::select()
        .column(CropProductionIden::CropId)
        .expr(Func::avg(Expr::col(CropProductionIden::ActualYield)))
        .expr(Func::min(Expr::col(CropProductionIden::ActualYield)))
        .expr(Func::max(Expr::col(CropProductionIden::ActualYield)))
        .expr_as(Func::count(Expr::col(CropProductionIden::Id)), Alias::new("total"))
        .from(CropProductionIden::Table)
        .and_where(Expr::col(CropProductionIden::ActualYield).is_not_null())
        .group_by_col(CropProductionIden::CropId)
        .order_by(CropProductionIden::CropId, Order::Asc)
        .to_owned();

    query::fetch_rows(conn, &stmt, |row| {
        let productions: i64 = row.get(4)?;
        Ok(YieldStatistics {
            crop_id: row.get(0)?,
            average_yield: row.get(1)?,
            min_yield: row.get(2)?,
            max_yield: row.get(3)?,
            productions: productions.max(0) as u64,
        })
    })
}

/// Hectares planted on a farm across all productions
pub fn total_area_planted_by_farm(conn: &Connection, farm_id: &str) -> Result<f64> {
    let total = base::aggregate::<CropProduction>(
        conn,
        Aggregate::Sum,
        CropProductionIden::AreaPlanted,
        by_farm(farm_id),
    )?;
    Ok(total.unwrap_or(0.0))
}

pub fn find_productions_with_filters(
    conn: &Connection,
    filter: &CropProductionFilter,
    page: PageRequest,
) -> Result<Page<CropProduction>> {
    base::find_page_where(conn, filter.to_filter(), NEWEST_FIRST, page)
}

/// Most recently planted production of a crop on a farm
pub fn find_latest_production(
    conn: &Connection,
    farm_id: &str,
    crop_id: &str,
) -> Result<Option<CropProduction>> {
    base::find_first_ordered(
        conn,
        by_farm(farm_id).eq(CropProductionIden::CropId, crop_id),
        &[
            (CropProductionIden::PlantingDate, Order::Desc),
            (CropProductionIden::CreatedAt, Order::Desc),
        ],
    )
}

/// Years with at least one production, latest first
pub fn distinct_production_years(conn: &Connection) -> Result<Vec<i32>> {
    base::distinct_values::<CropProduction, _>(
        conn,
        CropProductionIden::Year,
        Filter::all(),
        Order::Desc,
    )
}

/// Set the status of a production; any transition is accepted
pub fn update_production_status(
    conn: &Connection,
    id: &str,
    status: ProductionStatus,
) -> Result<bool> {
    let updated = base::update_where::<CropProduction>(
        conn,
        vec![
            (CropProductionIden::ProductionStatus, status.into()),
            (CropProductionIden::UpdatedAt, codec::ts(Utc::now()).into()),
        ],
        Filter::all().eq(CropProductionIden::Id, id),
    )?;
    Ok(updated > 0)
}

fn by_farm(farm_id: &str) -> Filter {
    Filter::all().eq(CropProductionIden::FarmId, farm_id)
}

fn by_status(status: ProductionStatus) -> Filter {
    Filter::all().eq(CropProductionIden::ProductionStatus, status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_database;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn production(code: &str, status: ProductionStatus, expected: Option<NaiveDate>) -> CropProduction {
        let mut p = CropProduction::new("farm-1", "crop-1", code, day(1, 10), 1.5, 2024);
        p.production_status = status;
        p.expected_harvest_date = expected;
        p
    }

    #[test]
    fn test_overdue_harvests() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        base::save_all(
            &conn,
            &[
                production("LATE-2", ProductionStatus::Growing, Some(day(5, 20))),
                production("LATE-1", ProductionStatus::Planted, Some(day(5, 1))),
                production("DONE", ProductionStatus::Harvested, Some(day(4, 1))),
                production("TODAY", ProductionStatus::Growing, Some(day(6, 1))),
                production("NONE", ProductionStatus::Growing, None),
            ],
        )
        .unwrap();

        let overdue = find_overdue_harvests(&conn, day(6, 1)).unwrap();
        let codes: Vec<_> = overdue.iter().map(|p| p.production_code.as_str()).collect();
        assert_eq!(codes, ["LATE-1", "LATE-2"]);

        let due = find_harvests_due_between(&conn, day(5, 20), day(6, 1)).unwrap();
        assert_eq!(due.len(), 2);
    }

    #[test]
    fn test_status_groups_and_update() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let planned = production("P1", ProductionStatus::Planned, None);
        base::save_all(
            &conn,
            &[
                planned.clone(),
                production("P2", ProductionStatus::Growing, None),
                production("P3", ProductionStatus::Sold, None),
            ],
        )
        .unwrap();

        assert_eq!(find_active_productions(&conn).unwrap().len(), 1);
        assert_eq!(find_completed_productions(&conn).unwrap().len(), 1);

        // Going straight from planned to sold is allowed
        assert!(update_production_status(&conn, &planned.id, ProductionStatus::Sold).unwrap());
        assert_eq!(find_completed_productions(&conn).unwrap().len(), 2);
        assert!(!update_production_status(&conn, "missing", ProductionStatus::Sold).unwrap());

        let groups = count_productions_by_status(&conn).unwrap();
        assert_eq!(groups.iter().map(|(_, n)| n).sum::<u64>(), 3);
    }

    #[test]
    fn test_yield_statistics_skip_missing_yields() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut a = production("A", ProductionStatus::Harvested, None);
        a.actual_yield = Some(2000.0);
        let mut b = production("B", ProductionStatus::Harvested, None);
        b.actual_yield = Some(3000.0);
        let c = production("C", ProductionStatus::Growing, None);
        base::save_all(&conn, &[a, b, c]).unwrap();

        let stats = yield_statistics_by_crop(&conn).unwrap();
        assert_eq!(
            stats,
            vec![YieldStatistics {
                crop_id: "crop-1".to_string(),
                average_yield: 2500.0,
                min_yield: 2000.0,
                max_yield: 3000.0,
                productions: 2,
            }]
        );
        assert_eq!(total_area_planted_by_farm(&conn, "farm-1").unwrap(), 4.5);
    }

    #[test]
    fn test_filters_latest_and_years() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut old = production("OLD", ProductionStatus::Sold, None);
        old.year = 2023;
        old.planting_date = NaiveDate::from_ymd_opt(2023, 2, 1).unwrap();
        let new = production("NEW", ProductionStatus::Growing, None);
        base::save_all(&conn, &[old, new]).unwrap();

        let latest = find_latest_production(&conn, "farm-1", "crop-1").unwrap().unwrap();
        assert_eq!(latest.production_code, "NEW");
        assert_eq!(distinct_production_years(&conn).unwrap(), [2024, 2023]);

        let filter = CropProductionFilter {
            planted_from: Some(day(1, 1)),
            ..CropProductionFilter::default()
        };
        let page = find_productions_with_filters(&conn, &filter, PageRequest::first(10)).unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].production_code, "NEW");
        let unfiltered = find_productions_with_filters(
            &conn,
            &CropProductionFilter::default(),
            PageRequest::first(50),
        )
        .unwrap();
        assert_eq!(unfiltered.total_elements, base::count_all::<CropProduction>(&conn).unwrap());
    }
}
