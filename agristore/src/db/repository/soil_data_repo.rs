//! Repository for soil test results

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use sea_query::{Alias, Asterisk, Expr, Func, Order, Query};
use tracing::info;

use crate::db::models::{SoilData, SoilDataIden};
use crate::db::query::{self, codec, Filter, Page, PageRequest};
use crate::db::repository::base;
use crate::error::Result;

/// Electrical conductivity (dS/m) above which a soil is saline
pub const SALINE_CONDUCTIVITY: f64 = 2.0;

/// pH range most crops grow well in
pub const OPTIMAL_PH: (f64, f64) = (6.0, 7.5);

/// Lower bounds a sample must meet to count as healthy
#[derive(Debug, Clone, PartialEq)]
pub struct SoilHealthCriteria {
    pub min_ph: f64,
    pub max_ph: f64,
    pub min_organic_matter: f64,
    pub min_nitrogen: f64,
    pub min_phosphorus: f64,
    pub min_potassium: f64,
}

/// Nutrient levels (ppm) below which a sample is deficient
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NutrientThresholds {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
}

/// Average nutrient readings over a farm's samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NutrientAverages {
    pub ph_level: Option<f64>,
    pub nitrogen: Option<f64>,
    pub phosphorus: Option<f64>,
    pub potassium: Option<f64>,
    pub organic_matter: Option<f64>,
}

const NEWEST_FIRST: &[(SoilDataIden, Order)] = &[(SoilDataIden::MeasurementDate, Order::Desc)];
const OLDEST_FIRST: &[(SoilDataIden, Order)] = &[(SoilDataIden::MeasurementDate, Order::Asc)];
const BY_DUE_DATE: &[(SoilDataIden, Order)] = &[(SoilDataIden::NextTestDue, Order::Asc)];

pub fn find_soil_data_by_sample_code(conn: &Connection, code: &str) -> Result<Option<SoilData>> {
    base::find_one_where(conn, Filter::all().eq(SoilDataIden::SampleCode, code))
}

pub fn exists_soil_data_by_sample_code(conn: &Connection, code: &str) -> Result<bool> {
    base::exists_where::<SoilData>(conn, Filter::all().eq(SoilDataIden::SampleCode, code))
}

/// Samples taken on a farm, latest first
pub fn find_soil_data_by_farm(conn: &Connection, farm_id: &str) -> Result<Vec<SoilData>> {
    base::find_where_ordered(conn, by_farm(farm_id), NEWEST_FIRST)
}

pub fn find_soil_data_by_farm_paged(
    conn: &Connection,
    farm_id: &str,
    page: PageRequest,
) -> Result<Page<SoilData>> {
    base::find_page_where(conn, by_farm(farm_id), NEWEST_FIRST, page)
}

pub fn find_latest_soil_data_by_farm(conn: &Connection, farm_id: &str) -> Result<Option<SoilData>> {
    base::find_first_ordered(conn, by_farm(farm_id), NEWEST_FIRST)
}

pub fn find_soil_data_by_ph_between(conn: &Connection, min: f64, max: f64) -> Result<Vec<SoilData>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(SoilDataIden::PhLevel, min, max),
        &[(SoilDataIden::PhLevel, Order::Asc)],
    )
}

/// Samples with pH strictly below `threshold`
pub fn find_acidic_soils(conn: &Connection, threshold: f64) -> Result<Vec<SoilData>> {
    base::find_where_ordered(
        conn,
        Filter::all().lt(SoilDataIden::PhLevel, threshold),
        &[(SoilDataIden::PhLevel, Order::Asc)],
    )
}

/// Samples with pH strictly above `threshold`
pub fn find_alkaline_soils(conn: &Connection, threshold: f64) -> Result<Vec<SoilData>> {
    base::find_where_ordered(
        conn,
        Filter::all().gt(SoilDataIden::PhLevel, threshold),
        &[(SoilDataIden::PhLevel, Order::Desc)],
    )
}

/// Samples where nitrogen, phosphorus or potassium is below its threshold
pub fn find_low_nutrient_soils(
    conn: &Connection,
    nitrogen: f64,
    phosphorus: f64,
    potassium: f64,
) -> Result<Vec<SoilData>> {
    let thresholds = NutrientThresholds { nitrogen, phosphorus, potassium };
    base::find_where_ordered(conn, any_nutrient_below(thresholds), NEWEST_FIRST)
}

pub fn find_saline_soils(conn: &Connection) -> Result<Vec<SoilData>> {
    base::find_where_ordered(conn, saline(), &[(SoilDataIden::ElectricalConductivity, Order::Desc)])
}

pub fn find_soil_data_by_farm_between(
    conn: &Connection,
    farm_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<SoilData>> {
    base::find_where_ordered(conn, by_farm(farm_id).and(measured_between(from, to)), NEWEST_FIRST)
}

/// A farm's samples measured at or after `since`, latest first
pub fn find_recent_soil_data_by_farm(
    conn: &Connection,
    farm_id: &str,
    since: DateTime<Utc>,
) -> Result<Vec<SoilData>> {
    base::find_where_ordered(
        conn,
        by_farm(farm_id).gte(SoilDataIden::MeasurementDate, codec::ts(since)),
        NEWEST_FIRST,
    )
}

/// Latest sample of a farm taken at `depth_cm`
pub fn find_latest_soil_data_by_farm_and_depth(
    conn: &Connection,
    farm_id: &str,
    depth_cm: i32,
) -> Result<Option<SoilData>> {
    base::find_first_ordered(
        conn,
        by_farm(farm_id).eq(SoilDataIden::DepthCm, depth_cm),
        NEWEST_FIRST,
    )
}

/// A farm's samples at one depth, oldest first
pub fn find_soil_trend_by_depth(
    conn: &Connection,
    farm_id: &str,
    depth_cm: i32,
) -> Result<Vec<SoilData>> {
    base::find_where_ordered(
        conn,
        by_farm(farm_id).eq(SoilDataIden::DepthCm, depth_cm),
        OLDEST_FIRST,
    )
}

/// A farm's samples measured within `[from, to]`, oldest first
pub fn find_soil_trend_between(
    conn: &Connection,
    farm_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<SoilData>> {
    base::find_where_ordered(conn, by_farm(farm_id).and(measured_between(from, to)), OLDEST_FIRST)
}

/// Samples of a farm with pH inside [`OPTIMAL_PH`]
pub fn find_optimal_ph_soils_by_farm(conn: &Connection, farm_id: &str) -> Result<Vec<SoilData>> {
    let (min, max) = OPTIMAL_PH;
    base::find_where_ordered(
        conn,
        by_farm(farm_id).between(SoilDataIden::PhLevel, min, max),
        NEWEST_FIRST,
    )
}

pub fn find_low_nutrient_soils_by_farm(
    conn: &Connection,
    farm_id: &str,
    thresholds: NutrientThresholds,
) -> Result<Vec<SoilData>> {
    base::find_where_ordered(
        conn,
        by_farm(farm_id).and(any_nutrient_below(thresholds)),
        NEWEST_FIRST,
    )
}

/// Samples of a farm with organic matter strictly below `min_organic_matter`
pub fn find_low_organic_matter_soils_by_farm(
    conn: &Connection,
    farm_id: &str,
    min_organic_matter: f64,
) -> Result<Vec<SoilData>> {
    base::find_where_ordered(conn, low_organic(farm_id, min_organic_matter), NEWEST_FIRST)
}

pub fn find_soil_data_by_moisture_between(
    conn: &Connection,
    min: f64,
    max: f64,
) -> Result<Vec<SoilData>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(SoilDataIden::Moisture, min, max),
        &[(SoilDataIden::Moisture, Order::Asc)],
    )
}

/// Samples denser than `max_bulk_density` or less porous than `min_porosity`
pub fn find_poor_drainage_soils(
    conn: &Connection,
    max_bulk_density: f64,
    min_porosity: f64,
) -> Result<Vec<SoilData>> {
    let filter = Filter::all().any_of(
        Filter::any()
            .gt(SoilDataIden::BulkDensity, max_bulk_density)
            .lt(SoilDataIden::Porosity, min_porosity),
    );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

pub fn find_saline_soils_by_farm(conn: &Connection, farm_id: &str) -> Result<Vec<SoilData>> {
    base::find_where_ordered(conn, by_farm(farm_id).and(saline()), NEWEST_FIRST)
}

/// Samples of a farm within the pH band and organic matter floor of
/// `criteria` that meet at least one of its nutrient minimums
pub fn find_healthy_soils_by_farm(
    conn: &Connection,
    farm_id: &str,
    criteria: &SoilHealthCriteria,
) -> Result<Vec<SoilData>> {
    let filter = by_farm(farm_id)
        .between(SoilDataIden::PhLevel, criteria.min_ph, criteria.max_ph)
        .gte(SoilDataIden::OrganicMatter, criteria.min_organic_matter)
        .any_of(
            Filter::any()
                .gte(SoilDataIden::Nitrogen, criteria.min_nitrogen)
                .gte(SoilDataIden::Phosphorus, criteria.min_phosphorus)
                .gte(SoilDataIden::Potassium, criteria.min_potassium),
        );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

/// Samples of a farm with pH outside 6.0..=8.0, organic matter below 2 %,
/// saline conductivity, or every nutrient below `thresholds`
pub fn find_problematic_soils_by_farm(
    conn: &Connection,
    farm_id: &str,
    thresholds: NutrientThresholds,
) -> Result<Vec<SoilData>> {
    let filter = by_farm(farm_id).any_of(
        Filter::any()
            .lt(SoilDataIden::PhLevel, 6.0)
            .gt(SoilDataIden::PhLevel, 8.0)
            .lt(SoilDataIden::OrganicMatter, 2.0)
            .and(saline())
            .and(all_nutrients_below(thresholds)),
    );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

/// Samples of a farm with optimal pH, at least 3 % organic matter and
/// N/P/K of at least 40/25/150 ppm
pub fn find_excellent_quality_soils_by_farm(
    conn: &Connection,
    farm_id: &str,
) -> Result<Vec<SoilData>> {
    let (min_ph, max_ph) = OPTIMAL_PH;
    let filter = by_farm(farm_id)
        .between(SoilDataIden::PhLevel, min_ph, max_ph)
        .gte(SoilDataIden::OrganicMatter, 3.0)
        .gte(SoilDataIden::Nitrogen, 40.0)
        .gte(SoilDataIden::Phosphorus, 25.0)
        .gte(SoilDataIden::Potassium, 150.0);
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

/// Samples of a farm with pH outside 5.5..=8.5, organic matter below 1 %,
/// or N/P/K all below 20/10/80 ppm
pub fn find_poor_quality_soils_by_farm(conn: &Connection, farm_id: &str) -> Result<Vec<SoilData>> {
    let depleted = NutrientThresholds { nitrogen: 20.0, phosphorus: 10.0, potassium: 80.0 };
    let filter = by_farm(farm_id).any_of(
        Filter::any()
            .lt(SoilDataIden::PhLevel, 5.5)
            .gt(SoilDataIden::PhLevel, 8.5)
            .lt(SoilDataIden::OrganicMatter, 1.0)
            .and(all_nutrients_below(depleted)),
    );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

pub fn find_soil_data_measured_between(
    conn: &Connection,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<SoilData>> {
    base::find_where_ordered(conn, measured_between(from, to), NEWEST_FIRST)
}

/// Samples whose next test is due on or before `as_of`
pub fn find_soil_tests_due(conn: &Connection, as_of: NaiveDate) -> Result<Vec<SoilData>> {
    base::find_where_ordered(conn, due_by(as_of), BY_DUE_DATE)
}

pub fn find_soil_tests_due_by_farm(
    conn: &Connection,
    farm_id: &str,
    as_of: NaiveDate,
) -> Result<Vec<SoilData>> {
    base::find_where_ordered(conn, by_farm(farm_id).and(due_by(as_of)), BY_DUE_DATE)
}

/// Samples whose next test date has passed, strictly before `today`
pub fn find_overdue_soil_tests(conn: &Connection, today: NaiveDate) -> Result<Vec<SoilData>> {
    base::find_where_ordered(conn, overdue(today), BY_DUE_DATE)
}

pub fn find_overdue_soil_tests_by_farm(
    conn: &Connection,
    farm_id: &str,
    today: NaiveDate,
) -> Result<Vec<SoilData>> {
    base::find_where_ordered(conn, by_farm(farm_id).and(overdue(today)), BY_DUE_DATE)
}

/// Samples whose next test falls within `[from, to]`
pub fn find_upcoming_soil_tests(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<SoilData>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(SoilDataIden::NextTestDue, codec::date(from), codec::date(to)),
        BY_DUE_DATE,
    )
}

pub fn nutrient_averages_by_farm(conn: &Connection, farm_id: &str) -> Result<NutrientAverages> {
    let stmt = Query::select()
        .expr(Func::avg(Expr::col(SoilDataIden::PhLevel)))
        .expr(Func::avg(Expr::col(SoilDataIden::Nitrogen)))
        .expr(Func::avg(Expr::col(SoilDataIden::Phosphorus)))
        .expr(Func::avg(Expr::col(SoilDataIden::Potassium)))
        .expr(Func::avg(Expr::col(SoilDataIden::OrganicMatter)))
        .from(SoilDataIden::Table)
        .cond_where(by_farm(farm_id))
        .to_owned();

    let averages = query::fetch_row_optional(conn, &stmt, |row| {
        Ok(NutrientAverages {
            ph_level: row.get(0)?,
            nitrogen: row.get(1)?,
            phosphorus: row.get(2)?,
            potassium: row.get(3)?,
            organic_matter: row.get(4)?,
        })
    })?;
    Ok(averages.unwrap_or_default())
}

/// Lowest and highest pH measured on a farm
pub fn ph_range_by_farm(conn: &Connection, farm_id: &str) -> Result<Option<(f64, f64)>> {
    let stmt = Query::select()
        .expr(Func::min(Expr::col(SoilDataIden::PhLevel)))
        .expr(Func::max(Expr::col(SoilDataIden::PhLevel)))
        .from(SoilDataIden::Table)
        .cond_where(by_farm(farm_id))
        .to_owned();

    let range = query::fetch_row_optional(conn, &stmt, |row| {
        Ok(row.get::<_, Option<f64>>(0)?.zip(row.get::<_, Option<f64>>(1)?))
    })?;
    Ok(range.flatten())
}

pub fn count_soil_data_by_farm(conn: &Connection, farm_id: &str) -> Result<u64> {
    base::count_where::<SoilData>(conn, by_farm(farm_id))
}

pub fn count_soil_tests_due_by_farm(
    conn: &Connection,
    farm_id: &str,
    as_of: NaiveDate,
) -> Result<u64> {
    base::count_where::<SoilData>(conn, by_farm(farm_id).and(due_by(as_of)))
}

pub fn count_overdue_soil_tests_by_farm(
    conn: &Connection,
    farm_id: &str,
    today: NaiveDate,
) -> Result<u64> {
    base::count_where::<SoilData>(conn, by_farm(farm_id).and(overdue(today)))
}

pub fn count_low_nutrient_soils_by_farm(
    conn: &Connection,
    farm_id: &str,
    thresholds: NutrientThresholds,
) -> Result<u64> {
    base::count_where::<SoilData>(conn, by_farm(farm_id).and(any_nutrient_below(thresholds)))
}

pub fn count_saline_soils_by_farm(conn: &Connection, farm_id: &str) -> Result<u64> {
    base::count_where::<SoilData>(conn, by_farm(farm_id).and(saline()))
}

pub fn count_low_organic_matter_soils_by_farm(
    conn: &Connection,
    farm_id: &str,
    min_organic_matter: f64,
) -> Result<u64> {
    base::count_where::<SoilData>(conn, low_organic(farm_id, min_organic_matter))
}

/// Sample counts per texture within one farm, most common first
pub fn count_soil_data_by_texture_in_farm(
    conn: &Connection,
    farm_id: &str,
) -> Result<Vec<(Option<String>, u64)>> {
    base::count_grouped::<SoilData, _>(conn, SoilDataIden::SoilTexture, by_farm(farm_id))
}

/// Sample counts per laboratory within one farm, most used first
pub fn count_soil_data_by_laboratory_in_farm(
    conn: &Connection,
    farm_id: &str,
) -> Result<Vec<(Option<String>, u64)>> {
    base::count_grouped::<SoilData, _>(conn, SoilDataIden::LaboratoryName, by_farm(farm_id))
}

/// Sample counts per measurement year within one farm, latest year first
pub fn count_soil_data_by_year_in_farm(
    conn: &Connection,
    farm_id: &str,
) -> Result<Vec<(i32, u64)>> {
    let year = Alias::new("year");
    let stmt = Query::select()
        .expr_as(
            Func::cast_as(
                Func::cust(Alias::new("substr"))
                    .arg(Expr::col(SoilDataIden::MeasurementDate))
                    .arg(1)
                    .arg(4),
                Alias::new("INTEGER"),
            ),
            year.clone(),
        )
        .expr(Func::count(Expr::col(Asterisk)))
        .from(SoilDataIden::Table)
        .cond_where(by_farm(farm_id))
        .group_by_col(year.clone())
        .order_by(year, Order::Desc)
        .to_owned();

    query::fetch_rows(conn, &stmt, |row| {
        let count: i64 = row.get(1)?;
        Ok((row.get(0)?, count.max(0) as u64))
    })
}

pub fn count_soil_data_by_texture(conn: &Connection) -> Result<Vec<(Option<String>, u64)>> {
    base::count_grouped::<SoilData, _>(conn, SoilDataIden::SoilTexture, Filter::all())
}

/// Samples of one farm whose code, texture, method, laboratory or
/// recommendations contain `term`
pub fn search_soil_data_in_farm(
    conn: &Connection,
    farm_id: &str,
    term: &str,
) -> Result<Vec<SoilData>> {
    base::find_where_ordered(conn, searching_in_farm(farm_id, term), NEWEST_FIRST)
}

pub fn search_soil_data_in_farm_paged(
    conn: &Connection,
    farm_id: &str,
    term: &str,
    page: PageRequest,
) -> Result<Page<SoilData>> {
    base::find_page_where(conn, searching_in_farm(farm_id, term), NEWEST_FIRST, page)
}

pub fn exists_soil_data_in_farm(conn: &Connection, farm_id: &str, code: &str) -> Result<bool> {
    base::exists_where::<SoilData>(conn, by_farm(farm_id).eq(SoilDataIden::SampleCode, code))
}

/// Delete samples measured strictly before `cutoff`
pub fn delete_soil_data_measured_before(
    conn: &Connection,
    cutoff: DateTime<Utc>,
) -> Result<usize> {
    let deleted = base::delete_where::<SoilData>(
        conn,
        Filter::all().lt(SoilDataIden::MeasurementDate, codec::ts(cutoff)),
    )?;
    info!(deleted, %cutoff, "deleted old soil samples");
    Ok(deleted)
}

fn by_farm(farm_id: &str) -> Filter {
    Filter::all().eq(SoilDataIden::FarmId, farm_id)
}

fn measured_between(from: DateTime<Utc>, to: DateTime<Utc>) -> Filter {
    Filter::all().between(SoilDataIden::MeasurementDate, codec::ts(from), codec::ts(to))
}

fn due_by(as_of: NaiveDate) -> Filter {
    Filter::all().lte(SoilDataIden::NextTestDue, codec::date(as_of))
}

fn overdue(today: NaiveDate) -> Filter {
    Filter::all().lt(SoilDataIden::NextTestDue, codec::date(today))
}

fn saline() -> Filter {
    Filter::all().gt(SoilDataIden::ElectricalConductivity, SALINE_CONDUCTIVITY)
}

fn low_organic(farm_id: &str, min_organic_matter: f64) -> Filter {
    by_farm(farm_id).lt(SoilDataIden::OrganicMatter, min_organic_matter)
}

fn any_nutrient_below(thresholds: NutrientThresholds) -> Filter {
    Filter::all().any_of(
        Filter::any()
            .lt(SoilDataIden::Nitrogen, thresholds.nitrogen)
            .lt(SoilDataIden::Phosphorus, thresholds.phosphorus)
            .lt(SoilDataIden::Potassium, thresholds.potassium),
    )
}

fn all_nutrients_below(thresholds: NutrientThresholds) -> Filter {
    Filter::all()
        .lt(SoilDataIden::Nitrogen, thresholds.nitrogen)
        .lt(SoilDataIden::Phosphorus, thresholds.phosphorus)
        .lt(SoilDataIden::Potassium, thresholds.potassium)
}

fn searching_in_farm(farm_id: &str, term: &str) -> Filter {
    by_farm(farm_id).search_any(
        [
            SoilDataIden::SampleCode,
            SoilDataIden::SoilTexture,
            SoilDataIden::TestingMethod,
            SoilDataIden::LaboratoryName,
            SoilDataIden::Recommendations,
        ],
        term,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_database;
    use chrono::TimeZone;

    fn measured(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, day, 10, 0, 0).unwrap()
    }

    fn sample(code: &str, day: u32, ph: f64) -> SoilData {
        let mut s = SoilData::new("farm-1", code, measured(day));
        s.ph_level = Some(ph);
        s
    }

    #[test]
    fn test_ph_classification() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        base::save_all(&conn, &[sample("A", 1, 5.0), sample("B", 2, 6.5), sample("C", 3, 8.0)])
            .unwrap();

        assert_eq!(find_acidic_soils(&conn, 6.5).unwrap().len(), 1);
        assert_eq!(find_alkaline_soils(&conn, 6.5).unwrap().len(), 1);
        assert_eq!(find_soil_data_by_ph_between(&conn, 5.0, 6.5).unwrap().len(), 2);
        assert_eq!(ph_range_by_farm(&conn, "farm-1").unwrap(), Some((5.0, 8.0)));
        assert_eq!(ph_range_by_farm(&conn, "farm-2").unwrap(), None);
    }

    #[test]
    fn test_latest_and_averages() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut a = sample("A", 1, 6.0);
        a.nitrogen = Some(10.0);
        let mut b = sample("B", 20, 7.0);
        b.nitrogen = Some(20.0);
        base::save_all(&conn, &[a, b]).unwrap();

        let latest = find_latest_soil_data_by_farm(&conn, "farm-1").unwrap().unwrap();
        assert_eq!(latest.sample_code, "B");

        let averages = nutrient_averages_by_farm(&conn, "farm-1").unwrap();
        assert_eq!(averages.ph_level, Some(6.5));
        assert_eq!(averages.nitrogen, Some(15.0));
        assert_eq!(averages.potassium, None);
        assert_eq!(nutrient_averages_by_farm(&conn, "farm-9").unwrap(), NutrientAverages::default());
    }

    #[test]
    fn test_saline_and_low_nutrients() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut salty = sample("SALTY", 1, 7.0);
        salty.electrical_conductivity = Some(2.5);
        let mut edge = sample("EDGE", 2, 7.0);
        edge.electrical_conductivity = Some(2.0);
        edge.potassium = Some(50.0);
        let mut poor = sample("POOR", 3, 7.0);
        poor.phosphorus = Some(3.0);
        base::save_all(&conn, &[salty, edge, poor]).unwrap();

        let saline = find_saline_soils(&conn).unwrap();
        assert_eq!(saline.len(), 1);
        assert_eq!(saline[0].sample_code, "SALTY");

        let low = find_low_nutrient_soils(&conn, 20.0, 10.0, 40.0).unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].sample_code, "POOR");
    }

    #[test]
    fn test_due_tests_and_cleanup() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut due = sample("DUE", 1, 6.0);
        due.next_test_due = NaiveDate::from_ymd_opt(2024, 8, 1);
        due.laboratory_name = Some("RAB Rubona".to_string());
        base::save_all(&conn, &[due, sample("NEW", 25, 6.0)]).unwrap();

        let as_of = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        assert_eq!(find_soil_tests_due(&conn, as_of).unwrap().len(), 1);
        assert_eq!(search_soil_data_in_farm(&conn, "farm-1", "rubona").unwrap().len(), 1);
        assert_eq!(search_soil_data_in_farm(&conn, "farm-2", "rubona").unwrap().len(), 0);
        assert_eq!(find_soil_data_measured_between(&conn, measured(1), measured(25)).unwrap().len(), 2);

        assert_eq!(delete_soil_data_measured_before(&conn, measured(10)).unwrap(), 1);
        assert_eq!(base::count_all::<SoilData>(&conn).unwrap(), 1);
    }

    fn codes(rows: &[SoilData]) -> Vec<&str> {
        rows.iter().map(|s| s.sample_code.as_str()).collect()
    }

    fn due_on(code: &str, farm: &str, month: u32, day: u32) -> SoilData {
        let mut s = SoilData::new(farm, code, measured(1));
        s.next_test_due = NaiveDate::from_ymd_opt(2024, month, day);
        s
    }

    fn profile(
        code: &str,
        day: u32,
        ph: f64,
        organic: f64,
        npk: Option<(f64, f64, f64)>,
    ) -> SoilData {
        let mut s = sample(code, day, ph);
        s.organic_matter = Some(organic);
        if let Some((n, p, k)) = npk {
            s.nitrogen = Some(n);
            s.phosphorus = Some(p);
            s.potassium = Some(k);
        }
        s
    }

    #[test]
    fn test_overdue_is_strictly_before_today() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        base::save_all(
            &conn,
            &[
                due_on("OVERDUE", "farm-1", 7, 31),
                due_on("TODAY", "farm-1", 8, 1),
                due_on("LATER", "farm-1", 8, 15),
                due_on("OTHER", "farm-2", 7, 1),
            ],
        )
        .unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        let fortnight = NaiveDate::from_ymd_opt(2024, 8, 15).unwrap();

        assert_eq!(codes(&find_overdue_soil_tests(&conn, today).unwrap()), ["OTHER", "OVERDUE"]);
        assert_eq!(
            codes(&find_overdue_soil_tests_by_farm(&conn, "farm-1", today).unwrap()),
            ["OVERDUE"]
        );
        assert_eq!(count_overdue_soil_tests_by_farm(&conn, "farm-1", today).unwrap(), 1);
        assert_eq!(
            codes(&find_soil_tests_due_by_farm(&conn, "farm-1", today).unwrap()),
            ["OVERDUE", "TODAY"]
        );
        assert_eq!(count_soil_tests_due_by_farm(&conn, "farm-1", today).unwrap(), 2);
        assert_eq!(
            codes(&find_upcoming_soil_tests(&conn, today, fortnight).unwrap()),
            ["TODAY", "LATER"]
        );
    }

    #[test]
    fn test_quality_classes_by_farm() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut salty = profile("SALTY", 4, 7.2, 2.5, None);
        salty.electrical_conductivity = Some(3.0);
        let mut elsewhere = profile("ELSEWHERE", 5, 5.0, 0.5, None);
        elsewhere.farm_id = "farm-2".to_string();
        base::save_all(
            &conn,
            &[
                profile("GOOD", 1, 6.5, 3.5, Some((45.0, 30.0, 160.0))),
                profile("FAIR", 2, 7.5, 2.5, Some((30.0, 5.0, 60.0))),
                profile("ACID", 3, 5.2, 0.8, Some((10.0, 5.0, 50.0))),
                salty,
                elsewhere,
            ],
        )
        .unwrap();
        let criteria = SoilHealthCriteria {
            min_ph: 6.0,
            max_ph: 7.5,
            min_organic_matter: 2.0,
            min_nitrogen: 25.0,
            min_phosphorus: 20.0,
            min_potassium: 100.0,
        };
        let deficient = NutrientThresholds { nitrogen: 20.0, phosphorus: 10.0, potassium: 80.0 };

        assert_eq!(
            codes(&find_optimal_ph_soils_by_farm(&conn, "farm-1").unwrap()),
            ["SALTY", "FAIR", "GOOD"]
        );
        assert_eq!(
            codes(&find_healthy_soils_by_farm(&conn, "farm-1", &criteria).unwrap()),
            ["FAIR", "GOOD"]
        );
        assert_eq!(
            codes(&find_problematic_soils_by_farm(&conn, "farm-1", deficient).unwrap()),
            ["SALTY", "ACID"]
        );
        let excellent = find_excellent_quality_soils_by_farm(&conn, "farm-1").unwrap();
        assert_eq!(codes(&excellent), ["GOOD"]);
        assert_eq!(codes(&find_poor_quality_soils_by_farm(&conn, "farm-1").unwrap()), ["ACID"]);
        let poor_elsewhere = find_poor_quality_soils_by_farm(&conn, "farm-2").unwrap();
        assert_eq!(codes(&poor_elsewhere), ["ELSEWHERE"]);

        assert_eq!(
            codes(&find_low_organic_matter_soils_by_farm(&conn, "farm-1", 2.0).unwrap()),
            ["ACID"]
        );
        assert_eq!(count_low_organic_matter_soils_by_farm(&conn, "farm-1", 2.0).unwrap(), 1);
        assert_eq!(
            codes(&find_low_nutrient_soils_by_farm(&conn, "farm-1", deficient).unwrap()),
            ["ACID", "FAIR"]
        );
        assert_eq!(count_low_nutrient_soils_by_farm(&conn, "farm-1", deficient).unwrap(), 2);
        assert_eq!(codes(&find_saline_soils_by_farm(&conn, "farm-1").unwrap()), ["SALTY"]);
        assert_eq!(count_saline_soils_by_farm(&conn, "farm-2").unwrap(), 0);
    }

    #[test]
    fn test_drainage_and_moisture() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let physical = |code: &str, day: u32, density: f64, porosity: f64, moisture: f64| {
            let mut s = sample(code, day, 6.5);
            s.bulk_density = Some(density);
            s.porosity = Some(porosity);
            s.moisture = Some(moisture);
            s
        };
        base::save_all(
            &conn,
            &[
                physical("DENSE", 1, 1.7, 45.0, 15.0),
                physical("LOOSE", 2, 1.2, 50.0, 25.0),
                physical("TIGHT", 3, 1.3, 30.0, 35.0),
                physical("EDGE", 4, 1.6, 40.0, 40.0),
                sample("UNKNOWN", 5, 6.5),
            ],
        )
        .unwrap();

        assert_eq!(codes(&find_poor_drainage_soils(&conn, 1.6, 40.0).unwrap()), ["TIGHT", "DENSE"]);
        assert_eq!(
            codes(&find_soil_data_by_moisture_between(&conn, 15.0, 25.0).unwrap()),
            ["DENSE", "LOOSE"]
        );
    }

    #[test]
    fn test_trends_and_farm_counts() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let layered = |code: &str, day: u32, depth: i32, texture: Option<&str>| {
            let mut s = sample(code, day, 6.5);
            s.depth_cm = depth;
            s.soil_texture = texture.map(str::to_string);
            s
        };
        let last_year = Utc.with_ymd_and_hms(2023, 6, 1, 10, 0, 0).unwrap();
        let mut old = SoilData::new("farm-1", "OLD", last_year);
        old.depth_cm = 15;
        base::save_all(
            &conn,
            &[
                layered("S1", 1, 15, Some("Loam")),
                layered("S2", 10, 30, Some("Clay")),
                layered("S3", 20, 15, Some("Loam")),
                old,
            ],
        )
        .unwrap();

        let topsoil = find_soil_trend_by_depth(&conn, "farm-1", 15).unwrap();
        assert_eq!(codes(&topsoil), ["OLD", "S1", "S3"]);
        let deeper = find_latest_soil_data_by_farm_and_depth(&conn, "farm-1", 30).unwrap();
        assert_eq!(deeper.unwrap().sample_code, "S2");
        assert!(find_latest_soil_data_by_farm_and_depth(&conn, "farm-1", 60).unwrap().is_none());
        assert_eq!(
            codes(&find_soil_trend_between(&conn, "farm-1", measured(1), measured(10)).unwrap()),
            ["S1", "S2"]
        );
        let window = find_soil_data_by_farm_between(&conn, "farm-1", measured(1), measured(10));
        assert_eq!(codes(&window.unwrap()), ["S2", "S1"]);
        assert_eq!(
            codes(&find_recent_soil_data_by_farm(&conn, "farm-1", measured(10)).unwrap()),
            ["S3", "S2"]
        );

        assert_eq!(count_soil_data_by_farm(&conn, "farm-1").unwrap(), 4);
        assert_eq!(count_soil_data_by_farm(&conn, "farm-9").unwrap(), 0);
        let by_year = count_soil_data_by_year_in_farm(&conn, "farm-1").unwrap();
        assert_eq!(by_year, vec![(2024, 3), (2023, 1)]);
        assert_eq!(
            count_soil_data_by_texture_in_farm(&conn, "farm-1").unwrap()[0],
            (Some("Loam".to_string()), 2)
        );
        assert!(count_soil_data_by_laboratory_in_farm(&conn, "farm-9").unwrap().is_empty());

        assert!(exists_soil_data_in_farm(&conn, "farm-1", "S2").unwrap());
        assert!(!exists_soil_data_in_farm(&conn, "farm-2", "S2").unwrap());
        let page =
            search_soil_data_in_farm_paged(&conn, "farm-1", "loam", PageRequest::first(1)).unwrap();
        assert_eq!(page.total_elements, 2);
        assert_eq!(page.content[0].sample_code, "S3");
    }
}
