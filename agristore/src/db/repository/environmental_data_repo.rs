//! Repository for regional environmental monitoring records

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use sea_query::{Alias, Expr, Func, Order, Query};

use crate::db::models::{
    DataQuality, EnvironmentalData, EnvironmentalDataIden, EnvironmentalRiskLevel,
    ValidationStatus,
};
use crate::db::query::{self, codec, BoundingBox, Filter, Page, PageRequest};
use crate::db::repository::base;
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct EnvironmentalFilter {
    pub region: Option<String>,
    pub district: Option<String>,
    pub risk_level: Option<EnvironmentalRiskLevel>,
    pub validation_status: Option<ValidationStatus>,
    pub data_quality: Option<DataQuality>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl EnvironmentalFilter {
    fn to_filter(&self) -> Filter {
        Filter::all()
            .eq_ignore_case_opt(EnvironmentalDataIden::Region, self.region.as_deref())
            .eq_ignore_case_opt(EnvironmentalDataIden::District, self.district.as_deref())
            .eq_opt(EnvironmentalDataIden::EnvironmentalRiskLevel, self.risk_level)
            .eq_opt(EnvironmentalDataIden::ValidationStatus, self.validation_status)
            .eq_opt(EnvironmentalDataIden::DataQuality, self.data_quality)
            .gte_opt(EnvironmentalDataIden::RecordDate, codec::opt_ts(self.from))
            .lte_opt(EnvironmentalDataIden::RecordDate, codec::opt_ts(self.to))
    }
}

const NEWEST_FIRST: &[(EnvironmentalDataIden, Order)] =
    &[(EnvironmentalDataIden::RecordDate, Order::Desc)];

pub fn find_environmental_data_by_code(
    conn: &Connection,
    code: &str,
) -> Result<Option<EnvironmentalData>> {
    base::find_one_where(conn, by_code(code))
}

pub fn exists_environmental_data_by_code(conn: &Connection, code: &str) -> Result<bool> {
    base::exists_where::<EnvironmentalData>(conn, by_code(code))
}

pub fn find_environmental_data_by_region(
    conn: &Connection,
    region: &str,
) -> Result<Vec<EnvironmentalData>> {
    base::find_where_ordered(conn, by_region(region), NEWEST_FIRST)
}

pub fn find_environmental_data_by_district(
    conn: &Connection,
    district: &str,
) -> Result<Vec<EnvironmentalData>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq_ignore_case(EnvironmentalDataIden::District, district),
        NEWEST_FIRST,
    )
}

pub fn find_environmental_data_by_region_between(
    conn: &Connection,
    region: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<EnvironmentalData>> {
    let filter = by_region(region).between(
        EnvironmentalDataIden::RecordDate,
        codec::ts(from),
        codec::ts(to),
    );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

/// Records rated HIGH or CRITICAL, latest first
pub fn find_high_risk_environmental_data(conn: &Connection) -> Result<Vec<EnvironmentalData>> {
    let filter = Filter::all().is_in(
        EnvironmentalDataIden::EnvironmentalRiskLevel,
        [EnvironmentalRiskLevel::High, EnvironmentalRiskLevel::Critical],
    );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

pub fn find_environmental_data_by_validation_status(
    conn: &Connection,
    status: ValidationStatus,
) -> Result<Vec<EnvironmentalData>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(EnvironmentalDataIden::ValidationStatus, status),
        NEWEST_FIRST,
    )
}

/// Records with an air quality index strictly above `threshold`, worst first
pub fn find_poor_air_quality(conn: &Connection, threshold: i32) -> Result<Vec<EnvironmentalData>> {
    base::find_where_ordered(
        conn,
        Filter::all().gt(EnvironmentalDataIden::AirQualityIndex, threshold),
        &[(EnvironmentalDataIden::AirQualityIndex, Order::Desc)],
    )
}

/// Mean air quality index per region, highest first
pub fn average_air_quality_by_region(conn: &Connection) -> Result<Vec<(String, f64)>> {
    let average = Alias::new("average_aqi");
    let stmt = Query::select()
        .column(EnvironmentalDataIden::Region)
        .expr_as(Func::avg(Expr::col(EnvironmentalDataIden::AirQualityIndex)), average.clone())
        .from(EnvironmentalDataIden::Table)
        .cond_where(Filter::all().is_not_null(EnvironmentalDataIden::AirQualityIndex))
        .group_by_col(EnvironmentalDataIden::Region)
        .order_by(average, Order::Desc)
        .order_by(EnvironmentalDataIden::Region, Order::Asc)
        .to_owned();

    query::fetch_rows(conn, &stmt, |row| Ok((row.get(0)?, row.get(1)?)))
}

pub fn count_environmental_data_by_risk_level(
    conn: &Connection,
) -> Result<Vec<(EnvironmentalRiskLevel, u64)>> {
    base::count_grouped::<EnvironmentalData, _>(
        conn,
        EnvironmentalDataIden::EnvironmentalRiskLevel,
        Filter::all(),
    )
}

pub fn distinct_environmental_regions(conn: &Connection) -> Result<Vec<String>> {
    base::distinct_values::<EnvironmentalData, _>(
        conn,
        EnvironmentalDataIden::Region,
        Filter::all(),
        Order::Asc,
    )
}

/// Records located within `radius_km` of a point, nearest first
pub fn find_environmental_data_within_radius(
    conn: &Connection,
    latitude: f64,
    longitude: f64,
    radius_km: f64,
) -> Result<Vec<EnvironmentalData>> {
    let area = BoundingBox::around(latitude, longitude, radius_km)?;
    let candidates = base::find_where(
        conn,
        Filter::all().and(area.condition(
            EnvironmentalDataIden::Latitude,
            EnvironmentalDataIden::Longitude,
        )),
    )?;
    Ok(query::within_radius(candidates, latitude, longitude, radius_km, |record| {
        record.latitude.zip(record.longitude)
    }))
}

/// Records whose code, region, district, sector, source or notes contain `term`
pub fn search_environmental_data(
    conn: &Connection,
    term: &str,
) -> Result<Vec<EnvironmentalData>> {
    let filter = Filter::all().search_any(
        [
            EnvironmentalDataIden::MonitoringCode,
            EnvironmentalDataIden::Region,
            EnvironmentalDataIden::District,
            EnvironmentalDataIden::Sector,
            EnvironmentalDataIden::DataSource,
            EnvironmentalDataIden::Notes,
        ],
        term,
    );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

pub fn find_environmental_data_with_filters(
    conn: &Connection,
    filter: &EnvironmentalFilter,
    page: PageRequest,
) -> Result<Page<EnvironmentalData>> {
    base::find_page_where(conn, filter.to_filter(), NEWEST_FIRST, page)
}

/// Set the validation outcome of one record and stamp who validated it
pub fn update_environmental_validation_status(
    conn: &Connection,
    id: &str,
    status: ValidationStatus,
    validated_by: &str,
) -> Result<bool> {
    let now = codec::ts(Utc::now());
    let updated = base::update_where::<EnvironmentalData>(
        conn,
        vec![
            (EnvironmentalDataIden::ValidationStatus, status.into()),
            (EnvironmentalDataIden::ValidatedBy, validated_by.into()),
            (EnvironmentalDataIden::ValidationDate, now.clone().into()),
            (EnvironmentalDataIden::UpdatedAt, now.into()),
        ],
        Filter::all().eq(EnvironmentalDataIden::Id, id),
    )?;
    Ok(updated > 0)
}

fn by_code(code: &str) -> Filter {
    Filter::all().eq(EnvironmentalDataIden::MonitoringCode, code)
}

fn by_region(region: &str) -> Filter {
    Filter::all().eq_ignore_case(EnvironmentalDataIden::Region, region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_database;
    use chrono::TimeZone;

    fn on(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap()
    }

    fn record(code: &str, region: &str, day: u32, aqi: i32) -> EnvironmentalData {
        let mut r = EnvironmentalData::new(code, region, on(day));
        r.air_quality_index = Some(aqi);
        r
    }

    #[test]
    fn test_air_quality() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        base::save_all(
            &conn,
            &[
                record("E1", "Kigali", 1, 150),
                record("E2", "Kigali", 2, 50),
                record("E3", "Northern", 3, 40),
            ],
        )
        .unwrap();

        let poor = find_poor_air_quality(&conn, 100).unwrap();
        assert_eq!(poor.len(), 1);
        assert_eq!(poor[0].monitoring_code, "E1");

        let averages = average_air_quality_by_region(&conn).unwrap();
        assert_eq!(averages[0], ("Kigali".to_string(), 100.0));
        assert_eq!(averages[1], ("Northern".to_string(), 40.0));

        assert_eq!(
            distinct_environmental_regions(&conn).unwrap(),
            vec!["Kigali".to_string(), "Northern".to_string()]
        );
    }

    #[test]
    fn test_risk_and_region_window() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut critical = record("E1", "Kigali", 1, 10);
        critical.environmental_risk_level = EnvironmentalRiskLevel::Critical;
        let mut high = record("E2", "Kigali", 10, 10);
        high.environmental_risk_level = EnvironmentalRiskLevel::High;
        base::save_all(&conn, &[critical, high, record("E3", "Kigali", 20, 10)]).unwrap();

        let risky = find_high_risk_environmental_data(&conn).unwrap();
        assert_eq!(risky.len(), 2);
        assert_eq!(risky[0].monitoring_code, "E2");

        let window = find_environmental_data_by_region_between(&conn, "kigali", on(5), on(25)).unwrap();
        assert_eq!(window.len(), 2);

        let counts = count_environmental_data_by_risk_level(&conn).unwrap();
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn test_validation_update() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let r = record("E1", "Kigali", 1, 10);
        base::save(&conn, &r).unwrap();

        assert!(update_environmental_validation_status(&conn, &r.id, ValidationStatus::Validated, "analyst").unwrap());
        let stored = find_environmental_data_by_code(&conn, "E1").unwrap().unwrap();
        assert_eq!(stored.validation_status, ValidationStatus::Validated);
        assert_eq!(stored.validated_by.as_deref(), Some("analyst"));
        assert!(stored.validation_date.is_some());

        let filter = EnvironmentalFilter {
            validation_status: Some(ValidationStatus::Pending),
            ..EnvironmentalFilter::default()
        };
        let page = find_environmental_data_with_filters(&conn, &filter, PageRequest::first(10)).unwrap();
        assert!(page.is_empty());
        let unfiltered = find_environmental_data_with_filters(
            &conn,
            &EnvironmentalFilter::default(),
            PageRequest::first(50),
        )
        .unwrap();
        assert_eq!(unfiltered.total_elements, base::count_all::<EnvironmentalData>(&conn).unwrap());
    }

    #[test]
    fn test_within_radius() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut near = record("NEAR", "Kigali", 1, 10);
        near.latitude = Some(-1.95);
        near.longitude = Some(30.06);
        let mut far = record("FAR", "Western", 1, 10);
        far.latitude = Some(-2.48);
        far.longitude = Some(28.90);
        base::save_all(&conn, &[near, far, record("NONE", "Kigali", 1, 10)]).unwrap();

        let hits = find_environmental_data_within_radius(&conn, -1.94, 30.05, 25.0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].monitoring_code, "NEAR");
        assert!(find_environmental_data_within_radius(&conn, 0.0, 0.0, -1.0).is_err());
    }
}
