//! Repository for irrigation events

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use sea_query::Order;
use tracing::info;

use crate::db::models::{IrrigationData, IrrigationDataIden, IrrigationMethod};
use crate::db::query::{codec, Filter, Page, PageRequest};
use crate::db::repository::base::{self, Aggregate};
use crate::error::Result;

const NEWEST_FIRST: &[(IrrigationDataIden, Order)] =
    &[(IrrigationDataIden::IrrigationDate, Order::Desc)];

/// Irrigation events of a farm, latest first
pub fn find_irrigation_by_farm(conn: &Connection, farm_id: &str) -> Result<Vec<IrrigationData>> {
    base::find_where_ordered(conn, by_farm(farm_id), NEWEST_FIRST)
}

pub fn find_irrigation_by_farm_paged(
    conn: &Connection,
    farm_id: &str,
    page: PageRequest,
) -> Result<Page<IrrigationData>> {
    base::find_page_where(conn, by_farm(farm_id), NEWEST_FIRST, page)
}

pub fn find_irrigation_by_crop_production(
    conn: &Connection,
    crop_production_id: &str,
) -> Result<Vec<IrrigationData>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(IrrigationDataIden::CropProductionId, crop_production_id),
        NEWEST_FIRST,
    )
}

pub fn find_irrigation_by_method(
    conn: &Connection,
    method: IrrigationMethod,
) -> Result<Vec<IrrigationData>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(IrrigationDataIden::IrrigationMethod, method),
        NEWEST_FIRST,
    )
}

pub fn find_irrigation_between(
    conn: &Connection,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<IrrigationData>> {
    base::find_where_ordered(conn, window(from, to), NEWEST_FIRST)
}

pub fn find_irrigation_by_farm_between(
    conn: &Connection,
    farm_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<IrrigationData>> {
    base::find_where_ordered(conn, by_farm(farm_id).and(window(from, to)), NEWEST_FIRST)
}

/// Water applied on a farm within `[from, to]`; 0 when nothing was applied
pub fn total_water_by_farm(
    conn: &Connection,
    farm_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<f64> {
    let total = base::aggregate::<IrrigationData>(
        conn,
        Aggregate::Sum,
        IrrigationDataIden::WaterAmount,
        by_farm(farm_id).and(window(from, to)),
    )?;
    Ok(total.unwrap_or(0.0))
}

pub fn average_water_by_method(conn: &Connection) -> Result<Vec<(IrrigationMethod, Option<f64>)>> {
    base::aggregate_grouped::<IrrigationData, _>(
        conn,
        Aggregate::Avg,
        IrrigationDataIden::IrrigationMethod,
        IrrigationDataIden::WaterAmount,
        Filter::all(),
    )
}

pub fn total_irrigation_cost_by_farm(conn: &Connection, farm_id: &str) -> Result<f64> {
    let total = base::aggregate::<IrrigationData>(
        conn,
        Aggregate::Sum,
        IrrigationDataIden::TotalCost,
        by_farm(farm_id),
    )?;
    Ok(total.unwrap_or(0.0))
}

pub fn find_latest_irrigation_by_farm(
    conn: &Connection,
    farm_id: &str,
) -> Result<Option<IrrigationData>> {
    base::find_first_ordered(conn, by_farm(farm_id), NEWEST_FIRST)
}

/// Events after which soil moisture did not rise
pub fn find_ineffective_irrigation(conn: &Connection) -> Result<Vec<IrrigationData>> {
    let filter = Filter::all().col_lte(
        IrrigationDataIden::SoilMoistureAfter,
        IrrigationDataIden::SoilMoistureBefore,
    );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

/// Events whose operator, equipment or notes contain `term`
pub fn search_irrigation(conn: &Connection, term: &str) -> Result<Vec<IrrigationData>> {
    let filter = Filter::all().search_any(
        [
            IrrigationDataIden::OperatorName,
            IrrigationDataIden::EquipmentUsed,
            IrrigationDataIden::Notes,
        ],
        term,
    );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

pub fn count_irrigation_by_method(conn: &Connection) -> Result<Vec<(IrrigationMethod, u64)>> {
    base::count_grouped::<IrrigationData, _>(conn, IrrigationDataIden::IrrigationMethod, Filter::all())
}

/// Delete events strictly before `cutoff`
pub fn delete_irrigation_before(conn: &Connection, cutoff: DateTime<Utc>) -> Result<usize> {
    let deleted = base::delete_where::<IrrigationData>(
        conn,
        Filter::all().lt(IrrigationDataIden::IrrigationDate, codec::ts(cutoff)),
    )?;
    info!(deleted, %cutoff, "deleted old irrigation events");
    Ok(deleted)
}

fn by_farm(farm_id: &str) -> Filter {
    Filter::all().eq(IrrigationDataIden::FarmId, farm_id)
}

fn window(from: DateTime<Utc>, to: DateTime<Utc>) -> Filter {
    Filter::all().between(IrrigationDataIden::IrrigationDate, codec::ts(from), codec::ts(to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_database;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, day, 7, 0, 0).unwrap()
    }

    fn event(farm: &str, day: u32, water: f64, method: IrrigationMethod) -> IrrigationData {
        IrrigationData::new(farm, at(day), water, method)
    }

    #[test]
    fn test_water_totals() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut costed = event("farm-1", 1, 100.0, IrrigationMethod::Drip);
        costed.total_cost = Some(2500.0);
        base::save_all(
            &conn,
            &[
                costed,
                event("farm-1", 10, 300.0, IrrigationMethod::Sprinkler),
                event("farm-1", 20, 200.0, IrrigationMethod::Drip),
                event("farm-2", 10, 999.0, IrrigationMethod::Flood),
            ],
        )
        .unwrap();

        assert_eq!(total_water_by_farm(&conn, "farm-1", at(1), at(10)).unwrap(), 400.0);
        assert_eq!(total_water_by_farm(&conn, "farm-3", at(1), at(30)).unwrap(), 0.0);
        assert_eq!(total_irrigation_cost_by_farm(&conn, "farm-1").unwrap(), 2500.0);
        assert_eq!(find_latest_irrigation_by_farm(&conn, "farm-1").unwrap().unwrap().irrigation_date, at(20));
        assert_eq!(find_irrigation_by_farm_between(&conn, "farm-1", at(5), at(25)).unwrap().len(), 2);

        let averages = average_water_by_method(&conn).unwrap();
        assert_eq!(averages[0], (IrrigationMethod::Drip, Some(150.0)));
        assert_eq!(count_irrigation_by_method(&conn).unwrap()[0], (IrrigationMethod::Drip, 2));
    }

    #[test]
    fn test_ineffective_irrigation() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut effective = event("farm-1", 1, 50.0, IrrigationMethod::Drip);
        effective.soil_moisture_before = Some(20.0);
        effective.soil_moisture_after = Some(35.0);
        let mut flat = event("farm-1", 2, 50.0, IrrigationMethod::Drip);
        flat.soil_moisture_before = Some(30.0);
        flat.soil_moisture_after = Some(30.0);
        flat.operator_name = Some("Jean".to_string());
        let unmeasured = event("farm-1", 3, 50.0, IrrigationMethod::Drip);
        base::save_all(&conn, &[effective, flat, unmeasured]).unwrap();

        let ineffective = find_ineffective_irrigation(&conn).unwrap();
        assert_eq!(ineffective.len(), 1);
        assert_eq!(ineffective[0].irrigation_date, at(2));
        assert_eq!(search_irrigation(&conn, "jean").unwrap().len(), 1);

        assert_eq!(delete_irrigation_before(&conn, at(3)).unwrap(), 2);
        assert_eq!(find_irrigation_by_farm(&conn, "farm-1").unwrap().len(), 1);
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut linked = event("farm-1", 5, 10.0, IrrigationMethod::Furrow);
        linked.crop_production_id = Some("prod-1".to_string());
        base::save_all(
            &conn,
            &[
                linked,
                event("farm-1", 10, 20.0, IrrigationMethod::Drip),
                event("farm-1", 15, 30.0, IrrigationMethod::Drip),
                event("farm-2", 10, 40.0, IrrigationMethod::Manual),
            ],
        )
        .unwrap();

        let window = find_irrigation_between(&conn, at(5), at(10)).unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].irrigation_date, at(10));
        assert_eq!(total_water_by_farm(&conn, "farm-1", at(5), at(15)).unwrap(), 60.0);

        assert_eq!(find_irrigation_by_crop_production(&conn, "prod-1").unwrap().len(), 1);
        assert_eq!(find_irrigation_by_method(&conn, IrrigationMethod::Drip).unwrap().len(), 2);
        assert!(find_irrigation_by_method(&conn, IrrigationMethod::Sprinkler).unwrap().is_empty());
        assert!(find_latest_irrigation_by_farm(&conn, "farm-9").unwrap().is_none());
    }

    #[test]
    fn test_paged_by_farm() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let events: Vec<_> = (1..=5)
            .map(|day| event("farm-1", day, 10.0, IrrigationMethod::Drip))
            .collect();
        base::save_all(&conn, &events).unwrap();

        let first = find_irrigation_by_farm_paged(&conn, "farm-1", PageRequest::first(2)).unwrap();
        assert_eq!(first.total_elements, 5);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.content[0].irrigation_date, at(5));
        assert_eq!(total_irrigation_cost_by_farm(&conn, "farm-1").unwrap(), 0.0);
    }
}
