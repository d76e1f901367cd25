//! Repository for farm-related database operations

use rusqlite::Connection;
use sea_query::Order;
use tracing::info;

use crate::db::models::{Farm, FarmIden, IrrigationSystem, RoadAccessQuality};
use crate::db::query::{self, BoundingBox, Filter, Page, PageRequest};
use crate::db::repository::base::{self, Aggregate};
use crate::error::Result;

/// Farms above this size (hectares) are large
pub const LARGE_FARM_HECTARES: f64 = 10.0;

/// Farms at or below this size (hectares) are small
pub const SMALL_FARM_HECTARES: f64 = 2.0;

/// Optional criteria for [`find_farms_with_filters`]; `None` fields match everything
#[derive(Debug, Clone, Default)]
pub struct FarmFilter {
    pub farmer_id: Option<String>,
    /// Compared ignoring case
    pub soil_type: Option<String>,
    pub irrigation_system: Option<IrrigationSystem>,
    pub electricity_available: Option<bool>,
    pub min_size: Option<f64>,
    pub max_size: Option<f64>,
}

impl FarmFilter {
    fn to_filter(&self) -> Filter {
        Filter::all()
            .eq_opt(FarmIden::FarmerId, self.farmer_id.as_deref())
            .eq_ignore_case_opt(FarmIden::SoilType, self.soil_type.as_deref())
            .eq_opt(FarmIden::IrrigationSystem, self.irrigation_system)
            .eq_opt(FarmIden::ElectricityAvailable, self.electricity_available)
            .gte_opt(FarmIden::FarmSize, self.min_size)
            .lte_opt(FarmIden::FarmSize, self.max_size)
    }
}

const BY_NAME: &[(FarmIden, Order)] = &[(FarmIden::FarmName, Order::Asc)];

pub fn find_farm_by_code(conn: &Connection, farm_code: &str) -> Result<Option<Farm>> {
    base::find_one_where(conn, Filter::all().eq(FarmIden::FarmCode, farm_code))
}

pub fn exists_farm_by_code(conn: &Connection, farm_code: &str) -> Result<bool> {
    base::exists_where::<Farm>(conn, Filter::all().eq(FarmIden::FarmCode, farm_code))
}

/// Get all farms owned by a farmer, by name
pub fn find_farms_by_farmer(conn: &Connection, farmer_id: &str) -> Result<Vec<Farm>> {
    base::find_where_ordered(conn, by_farmer(farmer_id), BY_NAME)
}

pub fn find_farms_by_farmer_paged(
    conn: &Connection,
    farmer_id: &str,
    page: PageRequest,
) -> Result<Page<Farm>> {
    base::find_page_where(conn, by_farmer(farmer_id), BY_NAME, page)
}

pub fn exists_farms_by_farmer(conn: &Connection, farmer_id: &str) -> Result<bool> {
    base::exists_where::<Farm>(conn, by_farmer(farmer_id))
}

pub fn count_farms_by_farmer(conn: &Connection, farmer_id: &str) -> Result<u64> {
    base::count_where::<Farm>(conn, by_farmer(farmer_id))
}

/// Delete every farm owned by a farmer, returning how many were removed
pub fn delete_farms_by_farmer(conn: &Connection, farmer_id: &str) -> Result<usize> {
    let deleted = base::delete_where::<Farm>(conn, by_farmer(farmer_id))?;
    info!(farmer_id, deleted, "deleted farms for farmer");
    Ok(deleted)
}

/// Farms whose name contains `term`, ignoring case
pub fn find_farms_by_name_containing(conn: &Connection, term: &str) -> Result<Vec<Farm>> {
    base::find_where_ordered(conn, Filter::all().contains(FarmIden::FarmName, term), BY_NAME)
}

/// Farms with the given soil type, ignoring case
pub fn find_farms_by_soil_type(conn: &Connection, soil_type: &str) -> Result<Vec<Farm>> {
    base::find_where_ordered(conn, by_soil(soil_type), BY_NAME)
}

pub fn find_farms_by_soil_type_paged(
    conn: &Connection,
    soil_type: &str,
    page: PageRequest,
) -> Result<Page<Farm>> {
    base::find_page_where(conn, by_soil(soil_type), BY_NAME, page)
}

pub fn find_farms_by_irrigation_system(
    conn: &Connection,
    system: IrrigationSystem,
) -> Result<Vec<Farm>> {
    base::find_where_ordered(conn, Filter::all().eq(FarmIden::IrrigationSystem, system), BY_NAME)
}

pub fn find_farms_by_electricity(conn: &Connection, available: bool) -> Result<Vec<Farm>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(FarmIden::ElectricityAvailable, available),
        BY_NAME,
    )
}

pub fn find_farms_by_road_access(
    conn: &Connection,
    quality: RoadAccessQuality,
) -> Result<Vec<Farm>> {
    base::find_where_ordered(conn, Filter::all().eq(FarmIden::RoadAccessQuality, quality), BY_NAME)
}

/// Farms with `min <= farm_size <= max`
pub fn find_farms_by_size_between(conn: &Connection, min: f64, max: f64) -> Result<Vec<Farm>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(FarmIden::FarmSize, min, max),
        &[(FarmIden::FarmSize, Order::Asc)],
    )
}

pub fn find_farms_by_size_at_least(conn: &Connection, min: f64) -> Result<Vec<Farm>> {
    base::find_where_ordered(
        conn,
        Filter::all().gte(FarmIden::FarmSize, min),
        &[(FarmIden::FarmSize, Order::Asc)],
    )
}

pub fn find_farms_by_size_at_most(conn: &Connection, max: f64) -> Result<Vec<Farm>> {
    base::find_where_ordered(
        conn,
        Filter::all().lte(FarmIden::FarmSize, max),
        &[(FarmIden::FarmSize, Order::Asc)],
    )
}

/// Farms larger than [`LARGE_FARM_HECTARES`], largest first
pub fn find_large_farms(conn: &Connection) -> Result<Vec<Farm>> {
    base::find_where_ordered(
        conn,
        Filter::all().gt(FarmIden::FarmSize, LARGE_FARM_HECTARES),
        &[(FarmIden::FarmSize, Order::Desc)],
    )
}

/// Farms of at most [`SMALL_FARM_HECTARES`]
pub fn find_small_farms(conn: &Connection) -> Result<Vec<Farm>> {
    find_farms_by_size_at_most(conn, SMALL_FARM_HECTARES)
}

/// Farms that are neither small nor large
pub fn find_medium_farms(conn: &Connection) -> Result<Vec<Farm>> {
    base::find_where_ordered(
        conn,
        Filter::all()
            .gt(FarmIden::FarmSize, SMALL_FARM_HECTARES)
            .lte(FarmIden::FarmSize, LARGE_FARM_HECTARES),
        &[(FarmIden::FarmSize, Order::Asc)],
    )
}

/// Farms whose coordinates fall inside `area` (bounds inclusive)
pub fn find_farms_in_area(conn: &Connection, area: &BoundingBox) -> Result<Vec<Farm>> {
    base::find_where_ordered(
        conn,
        Filter::all().and(area.condition(FarmIden::Latitude, FarmIden::Longitude)),
        BY_NAME,
    )
}

/// Farms within `radius_km` of a point, nearest first
///
/// # Arguments
/// * `latitude`, `longitude` - centre of the search in decimal degrees
/// * `radius_km` - great-circle radius; negative or non-finite values are rejected
pub fn find_farms_near(
    conn: &Connection,
    latitude: f64,
    longitude: f64,
    radius_km: f64,
) -> Result<Vec<Farm>> {
    let area = BoundingBox::around(latitude, longitude, radius_km)?;
    let candidates = find_farms_in_area(conn, &area)?;
    Ok(query::within_radius(candidates, latitude, longitude, radius_km, |farm| {
        farm.latitude.zip(farm.longitude)
    }))
}

/// Total hectares owned by a farmer; 0 when they have no farms
pub fn total_farm_size_by_farmer(conn: &Connection, farmer_id: &str) -> Result<f64> {
    let total = base::aggregate::<Farm>(conn, Aggregate::Sum, FarmIden::FarmSize, by_farmer(farmer_id))?;
    Ok(total.unwrap_or(0.0))
}

pub fn average_farm_size_by_farmer(conn: &Connection, farmer_id: &str) -> Result<Option<f64>> {
    base::aggregate::<Farm>(conn, Aggregate::Avg, FarmIden::FarmSize, by_farmer(farmer_id))
}

pub fn find_farms_with_filters(
    conn: &Connection,
    filter: &FarmFilter,
    page: PageRequest,
) -> Result<Page<Farm>> {
    base::find_page_where(conn, filter.to_filter(), BY_NAME, page)
}

/// Farm counts per soil type, most common first; farms without a soil type
/// are grouped under `None`
pub fn count_farms_by_soil_type(conn: &Connection) -> Result<Vec<(Option<String>, u64)>> {
    base::count_grouped::<Farm, _>(conn, FarmIden::SoilType, Filter::all())
}

pub fn count_farms_by_irrigation_system(
    conn: &Connection,
) -> Result<Vec<(IrrigationSystem, u64)>> {
    base::count_grouped::<Farm, _>(conn, FarmIden::IrrigationSystem, Filter::all())
}

/// Farms whose name, code, soil type or water source contains `term`
pub fn search_farms(conn: &Connection, term: &str) -> Result<Vec<Farm>> {
    let filter = Filter::all().search_any(
        [
            FarmIden::FarmName,
            FarmIden::FarmCode,
            FarmIden::SoilType,
            FarmIden::WaterSource,
        ],
        term,
    );
    base::find_where_ordered(conn, filter, BY_NAME)
}

fn by_farmer(farmer_id: &str) -> Filter {
    Filter::all().eq(FarmIden::FarmerId, farmer_id)
}

fn by_soil(soil_type: &str) -> Filter {
    Filter::all().eq_ignore_case(FarmIden::SoilType, soil_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_database, Database, DbConn};

    fn farm(farmer: &str, code: &str, size: f64) -> Farm {
        Farm::new(farmer, format!("{code} Farm"), code, size)
    }

    fn setup() -> (Database, DbConn) {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        (db, conn)
    }

    fn codes(farms: &[Farm]) -> Vec<&str> {
        farms.iter().map(|f| f.farm_code.as_str()).collect()
    }

    #[test]
    fn test_soil_type_and_size_range() {
        let (_db, conn) = setup();
        let mut clay = farm("farmer-1", "CLAY-1", 5.0);
        clay.soil_type = Some("Clay".to_string());
        base::save(&conn, &clay).unwrap();

        assert_eq!(codes(&find_farms_by_soil_type(&conn, "clay").unwrap()), ["CLAY-1"]);
        assert_eq!(codes(&find_farms_by_size_between(&conn, 4.0, 6.0).unwrap()), ["CLAY-1"]);
        assert!(find_farms_by_size_between(&conn, 6.0, 10.0).unwrap().is_empty());
        assert_eq!(codes(&find_farms_by_size_between(&conn, 5.0, 5.0).unwrap()), ["CLAY-1"]);
    }

    #[test]
    fn test_size_bands() {
        let (_db, conn) = setup();
        for (code, size) in [("S", 2.0), ("M1", 2.5), ("M2", 10.0), ("L1", 10.5), ("L2", 40.0)] {
            base::save(&conn, &farm("farmer-1", code, size)).unwrap();
        }

        assert_eq!(codes(&find_small_farms(&conn).unwrap()), ["S"]);
        assert_eq!(codes(&find_medium_farms(&conn).unwrap()), ["M1", "M2"]);
        assert_eq!(codes(&find_large_farms(&conn).unwrap()), ["L2", "L1"]);
    }

    #[test]
    fn test_farmer_scoped_operations() {
        let (_db, conn) = setup();
        base::save(&conn, &farm("farmer-1", "A", 1.0)).unwrap();
        base::save(&conn, &farm("farmer-1", "B", 3.0)).unwrap();
        base::save(&conn, &farm("farmer-2", "C", 7.0)).unwrap();

        assert_eq!(count_farms_by_farmer(&conn, "farmer-1").unwrap(), 2);
        assert_eq!(total_farm_size_by_farmer(&conn, "farmer-1").unwrap(), 4.0);
        assert_eq!(average_farm_size_by_farmer(&conn, "farmer-1").unwrap(), Some(2.0));
        assert_eq!(total_farm_size_by_farmer(&conn, "nobody").unwrap(), 0.0);
        assert_eq!(average_farm_size_by_farmer(&conn, "nobody").unwrap(), None);

        assert_eq!(delete_farms_by_farmer(&conn, "farmer-1").unwrap(), 2);
        assert!(!exists_farms_by_farmer(&conn, "farmer-1").unwrap());
        assert!(exists_farms_by_farmer(&conn, "farmer-2").unwrap());
    }

    #[test]
    fn test_unconstrained_filter_matches_find_all() {
        let (_db, conn) = setup();
        for (code, size) in [("A", 1.0), ("B", 3.0), ("C", 7.0)] {
            base::save(&conn, &farm("farmer-1", code, size)).unwrap();
        }

        let page = find_farms_with_filters(&conn, &FarmFilter::default(), PageRequest::first(50))
            .unwrap();
        let mut filtered: Vec<_> = page.content.into_iter().map(|f| f.id).collect();
        let mut all: Vec<_> = base::find_all::<Farm>(&conn)
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        filtered.sort();
        all.sort();
        assert_eq!(filtered, all);
    }

    #[test]
    fn test_filters_combine() {
        let (_db, conn) = setup();
        let mut a = farm("farmer-1", "A", 4.0);
        a.electricity_available = true;
        a.soil_type = Some("LOAM".to_string());
        base::save(&conn, &a).unwrap();
        base::save(&conn, &farm("farmer-1", "B", 4.0)).unwrap();

        let filter = FarmFilter {
            soil_type: Some("loam".to_string()),
            electricity_available: Some(true),
            min_size: Some(4.0),
            ..FarmFilter::default()
        };
        let page = find_farms_with_filters(&conn, &filter, PageRequest::first(10)).unwrap();
        assert_eq!(codes(&page.content), ["A"]);
        assert_eq!(page.total_elements, 1);
    }

    #[test]
    fn test_find_farms_near() {
        let (_db, conn) = setup();
        let mut kigali = farm("farmer-1", "KGL", 1.0);
        kigali.latitude = Some(-1.95);
        kigali.longitude = Some(30.06);
        let mut musanze = farm("farmer-1", "MSZ", 1.0);
        musanze.latitude = Some(-1.50);
        musanze.longitude = Some(29.63);
        let unknown = farm("farmer-1", "UNK", 1.0);
        for f in [&musanze, &kigali, &unknown] {
            base::save(&conn, f).unwrap();
        }

        let near = find_farms_near(&conn, -1.94, 30.05, 100.0).unwrap();
        assert_eq!(codes(&near), ["KGL", "MSZ"]);
        let close = find_farms_near(&conn, -1.94, 30.05, 5.0).unwrap();
        assert_eq!(codes(&close), ["KGL"]);
        assert!(find_farms_near(&conn, -1.94, 30.05, -1.0).is_err());
    }

    #[test]
    fn test_search_and_grouping() {
        let (_db, conn) = setup();
        let mut a = farm("farmer-1", "HILL-1", 1.0);
        a.water_source = Some("Borehole".to_string());
        a.irrigation_system = IrrigationSystem::Drip;
        base::save(&conn, &a).unwrap();
        base::save(&conn, &farm("farmer-1", "VALLEY-1", 1.0)).unwrap();

        assert_eq!(codes(&search_farms(&conn, "BORE").unwrap()), ["HILL-1"]);
        assert_eq!(codes(&search_farms(&conn, "valley").unwrap()), ["VALLEY-1"]);

        let groups = count_farms_by_irrigation_system(&conn).unwrap();
        let total: u64 = groups.iter().map(|(_, n)| n).sum();
        assert_eq!(total, 2);
        assert!(groups.contains(&(IrrigationSystem::Drip, 1)));
    }

    #[test]
    fn test_accented_text_matches_ignoring_case() {
        let (_db, conn) = setup();
        let mut ebene = Farm::new("farmer-1", "Ébène Farm", "EB-1", 3.0);
        ebene.soil_type = Some("Argile Élevée".to_string());
        base::save(&conn, &ebene).unwrap();

        assert_eq!(codes(&find_farms_by_name_containing(&conn, "Ébène").unwrap()), ["EB-1"]);
        assert_eq!(codes(&find_farms_by_name_containing(&conn, "ébène").unwrap()), ["EB-1"]);
        assert_eq!(codes(&find_farms_by_soil_type(&conn, "Argile Élevée").unwrap()), ["EB-1"]);
        assert_eq!(codes(&find_farms_by_soil_type(&conn, "ARGILE ÉLEVÉE").unwrap()), ["EB-1"]);
        assert_eq!(codes(&search_farms(&conn, "ÉBÈNE").unwrap()), ["EB-1"]);
    }

    #[test]
    fn test_non_positive_size_is_rejected() {
        let (_db, conn) = setup();
        for size in [0.0, -4.0] {
            let err = base::save(&conn, &farm("farmer-1", "BAD", size)).unwrap_err();
            assert!(matches!(err, crate::error::StoreError::Database(_)));
        }
        assert_eq!(base::count_all::<Farm>(&conn).unwrap(), 0);
    }
}
