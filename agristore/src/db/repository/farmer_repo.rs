//! Repository for farmer profiles

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use sea_query::Order;
use tracing::info;

use crate::db::models::{ExperienceLevel, Farmer, FarmerIden};
use crate::db::query::{codec, Filter, Page, PageRequest};
use crate::db::repository::base;
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct FarmerFilter {
    pub province: Option<String>,
    pub district: Option<String>,
    pub sector: Option<String>,
    pub experience_level: Option<ExperienceLevel>,
    /// Substring of the cooperative name, ignoring case
    pub cooperative: Option<String>,
    pub min_land_size: Option<f64>,
    pub max_land_size: Option<f64>,
}

impl FarmerFilter {
    fn to_filter(&self) -> Filter {
        Filter::all()
            .eq_opt(FarmerIden::Province, self.province.as_deref())
            .eq_opt(FarmerIden::District, self.district.as_deref())
            .eq_opt(FarmerIden::Sector, self.sector.as_deref())
            .eq_opt(FarmerIden::ExperienceLevel, self.experience_level)
            .contains_opt(FarmerIden::CooperativeName, self.cooperative.as_deref())
            .gte_opt(FarmerIden::TotalLandSize, self.min_land_size)
            .lte_opt(FarmerIden::TotalLandSize, self.max_land_size)
    }
}

const BY_CODE: &[(FarmerIden, Order)] = &[(FarmerIden::FarmerCode, Order::Asc)];

pub fn find_farmer_by_user_id(conn: &Connection, user_id: &str) -> Result<Option<Farmer>> {
    base::find_one_where(conn, Filter::all().eq(FarmerIden::UserId, user_id))
}

pub fn find_farmer_by_code(conn: &Connection, farmer_code: &str) -> Result<Option<Farmer>> {
    base::find_one_where(conn, Filter::all().eq(FarmerIden::FarmerCode, farmer_code))
}

pub fn exists_farmer_by_user_id(conn: &Connection, user_id: &str) -> Result<bool> {
    base::exists_where::<Farmer>(conn, Filter::all().eq(FarmerIden::UserId, user_id))
}

pub fn exists_farmer_by_code(conn: &Connection, farmer_code: &str) -> Result<bool> {
    base::exists_where::<Farmer>(conn, Filter::all().eq(FarmerIden::FarmerCode, farmer_code))
}

pub fn find_farmers_by_province(conn: &Connection, province: &str) -> Result<Vec<Farmer>> {
    base::find_where_ordered(conn, Filter::all().eq(FarmerIden::Province, province), BY_CODE)
}

pub fn find_farmers_by_district(conn: &Connection, district: &str) -> Result<Vec<Farmer>> {
    base::find_where_ordered(conn, Filter::all().eq(FarmerIden::District, district), BY_CODE)
}

pub fn find_farmers_by_sector(conn: &Connection, sector: &str) -> Result<Vec<Farmer>> {
    base::find_where_ordered(conn, Filter::all().eq(FarmerIden::Sector, sector), BY_CODE)
}

pub fn find_farmers_by_experience_level(
    conn: &Connection,
    level: ExperienceLevel,
) -> Result<Vec<Farmer>> {
    base::find_where_ordered(conn, Filter::all().eq(FarmerIden::ExperienceLevel, level), BY_CODE)
}

/// Farmers that belong to a cooperative
pub fn find_farmers_with_cooperative(conn: &Connection) -> Result<Vec<Farmer>> {
    base::find_where_ordered(
        conn,
        Filter::all().is_not_null(FarmerIden::CooperativeName),
        BY_CODE,
    )
}

pub fn find_farmers_without_cooperative(conn: &Connection) -> Result<Vec<Farmer>> {
    base::find_where_ordered(conn, Filter::all().is_null(FarmerIden::CooperativeName), BY_CODE)
}

/// Farmers with strictly more than `size` hectares
pub fn find_farmers_with_land_greater_than(conn: &Connection, size: f64) -> Result<Vec<Farmer>> {
    base::find_where_ordered(conn, Filter::all().gt(FarmerIden::TotalLandSize, size), BY_CODE)
}

/// Farmers with strictly less than `size` hectares
pub fn find_farmers_with_land_less_than(conn: &Connection, size: f64) -> Result<Vec<Farmer>> {
    base::find_where_ordered(conn, Filter::all().lt(FarmerIden::TotalLandSize, size), BY_CODE)
}

pub fn find_farmers_with_land_between(
    conn: &Connection,
    min: f64,
    max: f64,
) -> Result<Vec<Farmer>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(FarmerIden::TotalLandSize, min, max),
        BY_CODE,
    )
}

pub fn count_farmers_by_experience_level(
    conn: &Connection,
) -> Result<Vec<(ExperienceLevel, u64)>> {
    base::count_grouped::<Farmer, _>(conn, FarmerIden::ExperienceLevel, Filter::all())
}

pub fn count_farmers_by_province(conn: &Connection) -> Result<Vec<(Option<String>, u64)>> {
    base::count_grouped::<Farmer, _>(conn, FarmerIden::Province, Filter::all())
}

pub fn distinct_provinces(conn: &Connection) -> Result<Vec<String>> {
    base::distinct_values::<Farmer, _>(conn, FarmerIden::Province, Filter::all(), Order::Asc)
}

pub fn distinct_districts(conn: &Connection) -> Result<Vec<String>> {
    base::distinct_values::<Farmer, _>(conn, FarmerIden::District, Filter::all(), Order::Asc)
}

pub fn distinct_sectors(conn: &Connection) -> Result<Vec<String>> {
    base::distinct_values::<Farmer, _>(conn, FarmerIden::Sector, Filter::all(), Order::Asc)
}

pub fn distinct_cooperatives(conn: &Connection) -> Result<Vec<String>> {
    base::distinct_values::<Farmer, _>(
        conn,
        FarmerIden::CooperativeName,
        Filter::all(),
        Order::Asc,
    )
}

pub fn find_farmers_with_filters(
    conn: &Connection,
    filter: &FarmerFilter,
    page: PageRequest,
) -> Result<Page<Farmer>> {
    base::find_page_where(conn, filter.to_filter(), BY_CODE, page)
}

/// Farmers whose code, cooperative, location or administrative area contains `term`
pub fn search_farmers(conn: &Connection, term: &str) -> Result<Vec<Farmer>> {
    let filter = Filter::all().search_any(
        [
            FarmerIden::FarmerCode,
            FarmerIden::CooperativeName,
            FarmerIden::Location,
            FarmerIden::Province,
            FarmerIden::District,
            FarmerIden::Sector,
        ],
        term,
    );
    base::find_where_ordered(conn, filter, BY_CODE)
}

/// Delete farmer profiles created strictly before `cutoff`
pub fn delete_farmers_created_before(conn: &Connection, cutoff: DateTime<Utc>) -> Result<usize> {
    let deleted = base::delete_where::<Farmer>(
        conn,
        Filter::all().lt(FarmerIden::CreatedAt, codec::ts(cutoff)),
    )?;
    info!(deleted, %cutoff, "deleted old farmer profiles");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_database;
    use chrono::Duration;

    fn farmer(code: &str, province: &str, land: Option<f64>, coop: Option<&str>) -> Farmer {
        let mut farmer = Farmer::new(format!("user-{code}"), code);
        farmer.province = Some(province.to_string());
        farmer.total_land_size = land;
        farmer.cooperative_name = coop.map(str::to_string);
        farmer
    }

    fn seed(conn: &Connection) {
        base::save_all(
            conn,
            &[
                farmer("F1", "North", Some(1.0), Some("Kopakama")),
                farmer("F2", "North", Some(3.0), None),
                farmer("F3", "South", None, Some("Abahizi")),
            ],
        )
        .unwrap();
    }

    #[test]
    fn test_lookups_by_identity() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        seed(&conn);

        assert_eq!(find_farmer_by_user_id(&conn, "user-F2").unwrap().unwrap().farmer_code, "F2");
        assert!(exists_farmer_by_code(&conn, "F3").unwrap());
        assert!(!exists_farmer_by_user_id(&conn, "user-F9").unwrap());
    }

    #[test]
    fn test_land_size_bounds() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        seed(&conn);

        assert_eq!(find_farmers_with_land_greater_than(&conn, 1.0).unwrap().len(), 1);
        assert_eq!(find_farmers_with_land_less_than(&conn, 3.0).unwrap().len(), 1);
        assert_eq!(find_farmers_with_land_between(&conn, 1.0, 3.0).unwrap().len(), 2);
    }

    #[test]
    fn test_cooperative_membership_and_distinct_values() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        seed(&conn);

        assert_eq!(find_farmers_with_cooperative(&conn).unwrap().len(), 2);
        assert_eq!(find_farmers_without_cooperative(&conn).unwrap()[0].farmer_code, "F2");
        assert_eq!(distinct_provinces(&conn).unwrap(), ["North", "South"]);
        assert_eq!(distinct_cooperatives(&conn).unwrap(), ["Abahizi", "Kopakama"]);
    }

    #[test]
    fn test_filters_and_grouping() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        seed(&conn);

        let filter = FarmerFilter {
            province: Some("North".to_string()),
            cooperative: Some("kopa".to_string()),
            ..FarmerFilter::default()
        };
        let page = find_farmers_with_filters(&conn, &filter, PageRequest::first(10)).unwrap();
        assert_eq!(page.total_elements, 1);

        let all = find_farmers_with_filters(&conn, &FarmerFilter::default(), PageRequest::first(10))
            .unwrap();
        assert_eq!(all.total_elements, base::count_all::<Farmer>(&conn).unwrap());

        let by_province = count_farmers_by_province(&conn).unwrap();
        assert_eq!(by_province[0], (Some("North".to_string()), 2));
        assert_eq!(
            count_farmers_by_experience_level(&conn).unwrap(),
            vec![(ExperienceLevel::Beginner, 3)]
        );
    }

    #[test]
    fn test_delete_created_before() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut old = farmer("OLD", "North", None, None);
        old.created_at = Utc::now() - Duration::days(400);
        base::save(&conn, &old).unwrap();
        seed(&conn);

        let deleted = delete_farmers_created_before(&conn, Utc::now() - Duration::days(30)).unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(base::count_all::<Farmer>(&conn).unwrap(), 3);
        assert_eq!(search_farmers(&conn, "south").unwrap().len(), 1);
    }

    #[test]
    fn test_land_size_thresholds_are_strict() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        base::save_all(
            &conn,
            &[
                farmer("F1", "East", Some(1.99), None),
                farmer("F2", "East", Some(2.0), None),
                farmer("F3", "East", Some(2.01), None),
                farmer("F4", "East", None, None),
            ],
        )
        .unwrap();

        let codes = |rows: Vec<Farmer>| rows.into_iter().map(|f| f.farmer_code).collect::<Vec<_>>();
        assert_eq!(codes(find_farmers_with_land_greater_than(&conn, 2.0).unwrap()), ["F3"]);
        assert_eq!(codes(find_farmers_with_land_less_than(&conn, 2.0).unwrap()), ["F1"]);
        assert_eq!(codes(find_farmers_with_land_between(&conn, 1.99, 2.0).unwrap()), ["F1", "F2"]);
    }
}
