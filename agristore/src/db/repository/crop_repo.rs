//! Repository for the crop catalogue

use rusqlite::Connection;
use sea_query::Order;

use crate::db::models::{Crop, CropIden, CropType, MarketDemandLevel};
use crate::db::query::{Filter, Page, PageRequest};
use crate::db::repository::base::{self, Aggregate};
use crate::error::Result;

/// Crops that mature in at most this many days have a short season
pub const SHORT_SEASON_DAYS: i32 = 90;

/// Crops that keep longer than this many days store well
pub const LONG_STORAGE_DAYS: i32 = 365;

#[derive(Debug, Clone, Default)]
pub struct CropFilter {
    pub crop_type: Option<CropType>,
    pub market_demand_level: Option<MarketDemandLevel>,
    /// Substring of the planting season, ignoring case
    pub planting_season: Option<String>,
    pub max_growing_period_days: Option<i32>,
    pub min_storage_life_days: Option<i32>,
}

impl CropFilter {
    fn to_filter(&self) -> Filter {
        Filter::all()
            .eq_opt(CropIden::CropType, self.crop_type)
            .eq_opt(CropIden::MarketDemandLevel, self.market_demand_level)
            .contains_opt(CropIden::PlantingSeason, self.planting_season.as_deref())
            .lte_opt(CropIden::GrowingPeriodDays, self.max_growing_period_days)
            .gte_opt(CropIden::StorageLifeDays, self.min_storage_life_days)
    }
}

const BY_NAME: &[(CropIden, Order)] = &[(CropIden::CropName, Order::Asc)];

pub fn find_crop_by_name(conn: &Connection, name: &str) -> Result<Option<Crop>> {
    base::find_one_where(conn, Filter::all().eq_ignore_case(CropIden::CropName, name))
}

pub fn exists_crop_by_name(conn: &Connection, name: &str) -> Result<bool> {
    base::exists_where::<Crop>(conn, Filter::all().eq_ignore_case(CropIden::CropName, name))
}

pub fn find_crops_by_type(conn: &Connection, crop_type: CropType) -> Result<Vec<Crop>> {
    base::find_where_ordered(conn, Filter::all().eq(CropIden::CropType, crop_type), BY_NAME)
}

pub fn find_crops_by_demand_level(
    conn: &Connection,
    level: MarketDemandLevel,
) -> Result<Vec<Crop>> {
    base::find_where_ordered(conn, Filter::all().eq(CropIden::MarketDemandLevel, level), BY_NAME)
}

/// Crops in high market demand, by name
pub fn find_high_demand_crops(conn: &Connection) -> Result<Vec<Crop>> {
    find_crops_by_demand_level(conn, MarketDemandLevel::High)
}

pub fn count_high_demand_crops(conn: &Connection) -> Result<u64> {
    base::count_where::<Crop>(
        conn,
        Filter::all().eq(CropIden::MarketDemandLevel, MarketDemandLevel::High),
    )
}

/// Crops whose temperature range includes `temperature`
///
/// A missing bound does not exclude the crop.
pub fn find_crops_suitable_for_temperature(
    conn: &Connection,
    temperature: f64,
) -> Result<Vec<Crop>> {
    let filter = Filter::all()
        .any_of(
            Filter::any()
                .is_null(CropIden::TemperatureMin)
                .lte(CropIden::TemperatureMin, temperature),
        )
        .any_of(
            Filter::any()
                .is_null(CropIden::TemperatureMax)
                .gte(CropIden::TemperatureMax, temperature),
        );
    base::find_where_ordered(conn, filter, BY_NAME)
}

/// Crops whose soil pH range includes `ph`; a missing bound does not exclude
pub fn find_crops_suitable_for_ph(conn: &Connection, ph: f64) -> Result<Vec<Crop>> {
    let filter = Filter::all()
        .any_of(
            Filter::any()
                .is_null(CropIden::SoilPhMin)
                .lte(CropIden::SoilPhMin, ph),
        )
        .any_of(
            Filter::any()
                .is_null(CropIden::SoilPhMax)
                .gte(CropIden::SoilPhMax, ph),
        );
    base::find_where_ordered(conn, filter, BY_NAME)
}

/// Crops whose name, scientific name or variety contains `term`
pub fn search_crops(conn: &Connection, term: &str) -> Result<Vec<Crop>> {
    let filter = Filter::all().search_any(
        [CropIden::CropName, CropIden::ScientificName, CropIden::Variety],
        term,
    );
    base::find_where_ordered(conn, filter, BY_NAME)
}

pub fn find_short_season_crops(conn: &Connection) -> Result<Vec<Crop>> {
    base::find_where_ordered(
        conn,
        Filter::all().lte(CropIden::GrowingPeriodDays, SHORT_SEASON_DAYS),
        &[(CropIden::GrowingPeriodDays, Order::Asc)],
    )
}

pub fn find_long_storage_crops(conn: &Connection) -> Result<Vec<Crop>> {
    base::find_where_ordered(
        conn,
        Filter::all().gt(CropIden::StorageLifeDays, LONG_STORAGE_DAYS),
        &[(CropIden::StorageLifeDays, Order::Desc)],
    )
}

pub fn find_crops_with_filters(
    conn: &Connection,
    filter: &CropFilter,
    page: PageRequest,
) -> Result<Page<Crop>> {
    base::find_page_where(conn, filter.to_filter(), BY_NAME, page)
}

pub fn count_crops_by_type(conn: &Connection) -> Result<Vec<(CropType, u64)>> {
    base::count_grouped::<Crop, _>(conn, CropIden::CropType, Filter::all())
}

pub fn count_crops_by_demand_level(conn: &Connection) -> Result<Vec<(MarketDemandLevel, u64)>> {
    base::count_grouped::<Crop, _>(conn, CropIden::MarketDemandLevel, Filter::all())
}

pub fn average_growing_period_by_type(conn: &Connection) -> Result<Vec<(CropType, Option<f64>)>> {
    base::aggregate_grouped::<Crop, _>(
        conn,
        Aggregate::Avg,
        CropIden::CropType,
        CropIden::GrowingPeriodDays,
        Filter::all(),
    )
}

/// The `limit` most recently added crops
pub fn find_recent_crops(conn: &Connection, limit: u64) -> Result<Vec<Crop>> {
    base::find_limited(
        conn,
        Filter::all(),
        &[(CropIden::CreatedAt, Order::Desc)],
        limit,
    )
}

/// Other crops of the same type
pub fn find_similar_crops(conn: &Connection, crop: &Crop) -> Result<Vec<Crop>> {
    base::find_where_ordered(
        conn,
        Filter::all()
            .eq(CropIden::CropType, crop.crop_type)
            .ne(CropIden::Id, crop.id.as_str()),
        BY_NAME,
    )
}

/// Number of crops per planting season, most common first
pub fn planting_season_distribution(conn: &Connection) -> Result<Vec<(String, u64)>> {
    base::count_grouped::<Crop, _>(
        conn,
        CropIden::PlantingSeason,
        Filter::all().is_not_null(CropIden::PlantingSeason),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_database;

    fn crop(name: &str, crop_type: CropType, demand: MarketDemandLevel) -> Crop {
        let mut crop = Crop::new(name, crop_type);
        crop.market_demand_level = demand;
        crop
    }

    #[test]
    fn test_high_demand() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        base::save(&conn, &crop("Maize", CropType::Cereals, MarketDemandLevel::High)).unwrap();
        base::save(&conn, &crop("Kale", CropType::Vegetables, MarketDemandLevel::Low)).unwrap();

        let high = find_high_demand_crops(&conn).unwrap();
        assert_eq!(high.len(), 1);
        assert_eq!(high[0].crop_name, "Maize");
        assert_eq!(count_high_demand_crops(&conn).unwrap(), 1);
    }

    #[test]
    fn test_name_lookup_ignores_case() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        base::save(&conn, &crop("Irish Potato", CropType::Tubers, MarketDemandLevel::Medium))
            .unwrap();

        assert!(find_crop_by_name(&conn, "irish potato").unwrap().is_some());
        assert!(exists_crop_by_name(&conn, "IRISH POTATO").unwrap());
        assert!(!exists_crop_by_name(&conn, "potato").unwrap());
    }

    #[test]
    fn test_suitability_treats_missing_bounds_as_open() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut beans = crop("Beans", CropType::Legumes, MarketDemandLevel::Medium);
        beans.temperature_min = Some(15.0);
        beans.temperature_max = Some(27.0);
        beans.soil_ph_min = Some(6.0);
        let mut cassava = crop("Cassava", CropType::Tubers, MarketDemandLevel::Medium);
        cassava.temperature_min = Some(20.0);
        let open = crop("Sorghum", CropType::Cereals, MarketDemandLevel::Medium);
        base::save_all(&conn, &[beans, cassava, open]).unwrap();

        let names = |crops: Vec<Crop>| crops.into_iter().map(|c| c.crop_name).collect::<Vec<_>>();
        assert_eq!(names(find_crops_suitable_for_temperature(&conn, 18.0).unwrap()), ["Beans", "Sorghum"]);
        assert_eq!(
            names(find_crops_suitable_for_temperature(&conn, 30.0).unwrap()),
            ["Cassava", "Sorghum"]
        );
        assert_eq!(names(find_crops_suitable_for_ph(&conn, 5.5).unwrap()), ["Cassava", "Sorghum"]);
    }

    #[test]
    fn test_season_and_storage_thresholds() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut quick = crop("Radish", CropType::Vegetables, MarketDemandLevel::Low);
        quick.growing_period_days = Some(90);
        quick.storage_life_days = Some(365);
        let mut slow = crop("Coffee", CropType::CashCrops, MarketDemandLevel::High);
        slow.growing_period_days = Some(1000);
        slow.storage_life_days = Some(730);
        base::save_all(&conn, &[quick, slow]).unwrap();

        assert_eq!(find_short_season_crops(&conn).unwrap()[0].crop_name, "Radish");
        let long = find_long_storage_crops(&conn).unwrap();
        assert_eq!(long.len(), 1);
        assert_eq!(long[0].crop_name, "Coffee");
    }

    #[test]
    fn test_similar_and_grouped() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let maize = crop("Maize", CropType::Cereals, MarketDemandLevel::High);
        let mut rice = crop("Rice", CropType::Cereals, MarketDemandLevel::High);
        rice.planting_season = Some("Season A".to_string());
        base::save_all(
            &conn,
            &[maize.clone(), rice, crop("Kale", CropType::Vegetables, MarketDemandLevel::Low)],
        )
        .unwrap();

        let similar = find_similar_crops(&conn, &maize).unwrap();
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].crop_name, "Rice");

        let by_type = count_crops_by_type(&conn).unwrap();
        assert_eq!(by_type[0], (CropType::Cereals, 2));
        assert_eq!(by_type.iter().map(|(_, n)| n).sum::<u64>(), 3);
        assert_eq!(planting_season_distribution(&conn).unwrap(), vec![("Season A".to_string(), 1)]);
        assert_eq!(find_recent_crops(&conn, 2).unwrap().len(), 2);
        assert_eq!(search_crops(&conn, "ric").unwrap().len(), 1);
    }

    #[test]
    fn test_filters() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut beans = crop("Beans", CropType::Legumes, MarketDemandLevel::High);
        beans.planting_season = Some("Season A, Season B".to_string());
        beans.growing_period_days = Some(90);
        let mut peas = crop("Peas", CropType::Legumes, MarketDemandLevel::High);
        peas.planting_season = Some("Season B".to_string());
        peas.growing_period_days = Some(91);
        base::save_all(&conn, &[beans, peas, crop("Tea", CropType::CashCrops, MarketDemandLevel::Medium)])
            .unwrap();

        // The growing period bound is inclusive
        let filter = CropFilter {
            crop_type: Some(CropType::Legumes),
            planting_season: Some("season a".to_string()),
            max_growing_period_days: Some(90),
            ..CropFilter::default()
        };
        let page = find_crops_with_filters(&conn, &filter, PageRequest::first(10)).unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].crop_name, "Beans");

        let unfiltered =
            find_crops_with_filters(&conn, &CropFilter::default(), PageRequest::first(10)).unwrap();
        assert_eq!(unfiltered.total_elements, base::count_all::<Crop>(&conn).unwrap());
        assert_eq!(unfiltered.content[0].crop_name, "Beans");
    }
}
