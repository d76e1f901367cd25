//! Repository for buyers

use rusqlite::Connection;
use sea_query::Order;

use crate::db::models::{Buyer, BuyerIden, BuyerType};
use crate::db::query::Filter;
use crate::db::repository::base;
use crate::error::Result;

const BY_RATING: &[(BuyerIden, Order)] = &[
    (BuyerIden::Rating, Order::Desc),
    (BuyerIden::BuyerCode, Order::Asc),
];

pub fn find_buyer_by_user_id(conn: &Connection, user_id: &str) -> Result<Option<Buyer>> {
    base::find_one_where(conn, Filter::all().eq(BuyerIden::UserId, user_id))
}

pub fn find_buyer_by_code(conn: &Connection, code: &str) -> Result<Option<Buyer>> {
    base::find_one_where(conn, Filter::all().eq(BuyerIden::BuyerCode, code))
}

pub fn exists_buyer_by_user_id(conn: &Connection, user_id: &str) -> Result<bool> {
    base::exists_where::<Buyer>(conn, Filter::all().eq(BuyerIden::UserId, user_id))
}

pub fn exists_buyer_by_code(conn: &Connection, code: &str) -> Result<bool> {
    base::exists_where::<Buyer>(conn, Filter::all().eq(BuyerIden::BuyerCode, code))
}

pub fn find_buyers_by_type(conn: &Connection, buyer_type: BuyerType) -> Result<Vec<Buyer>> {
    base::find_where_ordered(conn, Filter::all().eq(BuyerIden::BuyerType, buyer_type), BY_RATING)
}

pub fn find_buyers_by_verified(conn: &Connection, verified: bool) -> Result<Vec<Buyer>> {
    base::find_where_ordered(conn, Filter::all().eq(BuyerIden::Verified, verified), BY_RATING)
}

pub fn find_buyers_by_location(conn: &Connection, location: &str) -> Result<Vec<Buyer>> {
    base::find_where_ordered(conn, Filter::all().contains(BuyerIden::Location, location), BY_RATING)
}

/// Buyers rated at least `min_rating`
pub fn find_buyers_with_min_rating(conn: &Connection, min_rating: f64) -> Result<Vec<Buyer>> {
    base::find_where_ordered(conn, Filter::all().gte(BuyerIden::Rating, min_rating), BY_RATING)
}

/// Verified buyers rated at least `min_rating`
pub fn find_premium_buyers(conn: &Connection, min_rating: f64) -> Result<Vec<Buyer>> {
    let filter = Filter::all()
        .eq(BuyerIden::Verified, true)
        .gte(BuyerIden::Rating, min_rating);
    base::find_where_ordered(conn, filter, BY_RATING)
}

pub fn count_buyers_by_type(conn: &Connection) -> Result<Vec<(BuyerType, u64)>> {
    base::count_grouped::<Buyer, _>(conn, BuyerIden::BuyerType, Filter::all())
}

pub fn count_verified_buyers(conn: &Connection) -> Result<u64> {
    base::count_where::<Buyer>(conn, Filter::all().eq(BuyerIden::Verified, true))
}

/// Buyers whose code, company, location or contact contain `term`
pub fn search_buyers(conn: &Connection, term: &str) -> Result<Vec<Buyer>> {
    let filter = Filter::all().search_any(
        [
            BuyerIden::BuyerCode,
            BuyerIden::CompanyName,
            BuyerIden::Location,
            BuyerIden::ContactPerson,
        ],
        term,
    );
    base::find_where_ordered(conn, filter, BY_RATING)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_database;

    fn buyer(code: &str, kind: BuyerType, rating: f64, verified: bool) -> Buyer {
        let mut b = Buyer::new(format!("user-{code}"), code, kind);
        b.rating = rating;
        b.verified = verified;
        b
    }

    #[test]
    fn test_premium_buyers() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        base::save_all(
            &conn,
            &[
                buyer("B1", BuyerType::Exporter, 4.8, true),
                buyer("B2", BuyerType::Exporter, 4.9, false),
                buyer("B3", BuyerType::Retailer, 4.0, true),
                buyer("B4", BuyerType::Processor, 4.5, true),
            ],
        )
        .unwrap();

        let premium = find_premium_buyers(&conn, 4.5).unwrap();
        let codes: Vec<_> = premium.iter().map(|b| b.buyer_code.as_str()).collect();
        assert_eq!(codes, vec!["B1", "B4"]);

        assert_eq!(find_buyers_with_min_rating(&conn, 4.5).unwrap().len(), 3);
        assert_eq!(count_verified_buyers(&conn).unwrap(), 3);
        assert_eq!(find_buyers_by_verified(&conn, false).unwrap().len(), 1);
        assert_eq!(count_buyers_by_type(&conn).unwrap()[0], (BuyerType::Exporter, 2));
    }

    #[test]
    fn test_lookups_and_search() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut b = buyer("B1", BuyerType::Wholesaler, 3.0, false);
        b.company_name = Some("Inyange Industries".to_string());
        b.location = Some("Kigali, Gasabo".to_string());
        base::save(&conn, &b).unwrap();

        assert_eq!(find_buyer_by_user_id(&conn, "user-B1").unwrap().unwrap().id, b.id);
        assert!(exists_buyer_by_code(&conn, "B1").unwrap());
        assert!(!exists_buyer_by_user_id(&conn, "user-B9").unwrap());
        assert_eq!(find_buyers_by_location(&conn, "gasabo").unwrap().len(), 1);
        assert_eq!(search_buyers(&conn, "inyange").unwrap().len(), 1);
        assert_eq!(find_buyers_by_type(&conn, BuyerType::Wholesaler).unwrap().len(), 1);
    }

    #[test]
    fn test_rating_threshold_is_inclusive() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        base::save_all(
            &conn,
            &[
                buyer("B2", BuyerType::Retailer, 4.5, false),
                buyer("B1", BuyerType::Retailer, 4.5, true),
                buyer("B3", BuyerType::Retailer, 4.49, true),
                buyer("B0", BuyerType::Exporter, 5.0, false),
            ],
        )
        .unwrap();

        // Highest rating first, ties broken by code
        let rated = find_buyers_with_min_rating(&conn, 4.5).unwrap();
        let codes: Vec<_> = rated.iter().map(|b| b.buyer_code.as_str()).collect();
        assert_eq!(codes, vec!["B0", "B1", "B2"]);

        let premium = find_premium_buyers(&conn, 4.5).unwrap();
        assert_eq!(premium.len(), 1);
        assert_eq!(premium[0].buyer_code, "B1");
    }

    #[test]
    fn test_empty_store() {
        let db = create_test_database();
        let conn = db.connection().unwrap();

        assert!(find_buyer_by_code(&conn, "B1").unwrap().is_none());
        assert!(find_buyer_by_user_id(&conn, "user-B1").unwrap().is_none());
        assert!(!exists_buyer_by_code(&conn, "B1").unwrap());
        assert!(count_buyers_by_type(&conn).unwrap().is_empty());
        assert_eq!(count_verified_buyers(&conn).unwrap(), 0);
        assert!(search_buyers(&conn, "").unwrap().is_empty());
    }
}
