//! Repository for observed market prices

use chrono::NaiveDate;
use rusqlite::Connection;
use sea_query::{Expr, Func, Order, Query};
use tracing::info;

use crate::db::models::{
    DemandLevel, MarketPrice, MarketPriceIden, MarketType, PriceTrend, SupplyLevel,
};
use crate::db::query::{self, codec, Filter, Page, PageRequest};
use crate::db::repository::base::{self, Aggregate};
use crate::error::Result;

/// Lowest, highest and mean price per kg over a set of observations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
    pub average: f64,
}

#[derive(Debug, Clone, Default)]
pub struct MarketPriceFilter {
    pub crop_id: Option<String>,
    pub market_type: Option<MarketType>,
    pub location: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub demand_level: Option<DemandLevel>,
}

impl MarketPriceFilter {
    fn to_filter(&self) -> Filter {
        Filter::all()
            .eq_opt(MarketPriceIden::CropId, self.crop_id.as_deref())
            .eq_opt(MarketPriceIden::MarketType, self.market_type)
            .contains_opt(MarketPriceIden::Location, self.location.as_deref())
            .gte_opt(MarketPriceIden::PriceDate, codec::opt_date(self.from))
            .lte_opt(MarketPriceIden::PriceDate, codec::opt_date(self.to))
            .gte_opt(MarketPriceIden::PricePerKg, self.min_price)
            .lte_opt(MarketPriceIden::PricePerKg, self.max_price)
            .eq_opt(MarketPriceIden::DemandLevel, self.demand_level)
    }
}

const NEWEST_FIRST: &[(MarketPriceIden, Order)] = &[
    (MarketPriceIden::PriceDate, Order::Desc),
    (MarketPriceIden::CreatedAt, Order::Desc),
];

const BY_PRICE: &[(MarketPriceIden, Order)] = &[(MarketPriceIden::PricePerKg, Order::Asc)];

/// Prices for a crop, latest first
pub fn find_prices_by_crop(conn: &Connection, crop_id: &str) -> Result<Vec<MarketPrice>> {
    base::find_where_ordered(conn, by_crop(crop_id), NEWEST_FIRST)
}

pub fn find_prices_by_crop_paged(
    conn: &Connection,
    crop_id: &str,
    page: PageRequest,
) -> Result<Page<MarketPrice>> {
    base::find_page_where(conn, by_crop(crop_id), NEWEST_FIRST, page)
}

pub fn find_prices_by_market_name(conn: &Connection, market_name: &str) -> Result<Vec<MarketPrice>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq_ignore_case(MarketPriceIden::MarketName, market_name),
        NEWEST_FIRST,
    )
}

pub fn find_prices_by_market_type(
    conn: &Connection,
    market_type: MarketType,
) -> Result<Vec<MarketPrice>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(MarketPriceIden::MarketType, market_type),
        NEWEST_FIRST,
    )
}

pub fn find_prices_by_location(conn: &Connection, location: &str) -> Result<Vec<MarketPrice>> {
    base::find_where_ordered(
        conn,
        Filter::all().contains(MarketPriceIden::Location, location),
        NEWEST_FIRST,
    )
}

pub fn find_prices_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<MarketPrice>> {
    base::find_where_ordered(conn, window(from, to), NEWEST_FIRST)
}

pub fn find_prices_by_crop_between(
    conn: &Connection,
    crop_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<MarketPrice>> {
    base::find_where_ordered(conn, window(from, to).and(by_crop(crop_id)), NEWEST_FIRST)
}

pub fn find_prices_in_range(conn: &Connection, min: f64, max: f64) -> Result<Vec<MarketPrice>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(MarketPriceIden::PricePerKg, min, max),
        BY_PRICE,
    )
}

/// Prices strictly above `price` per kg
pub fn find_prices_above(conn: &Connection, price: f64) -> Result<Vec<MarketPrice>> {
    base::find_where_ordered(conn, Filter::all().gt(MarketPriceIden::PricePerKg, price), BY_PRICE)
}

/// Prices strictly below `price` per kg
pub fn find_prices_below(conn: &Connection, price: f64) -> Result<Vec<MarketPrice>> {
    base::find_where_ordered(conn, Filter::all().lt(MarketPriceIden::PricePerKg, price), BY_PRICE)
}

pub fn find_latest_price_by_crop(conn: &Connection, crop_id: &str) -> Result<Option<MarketPrice>> {
    base::find_first_ordered(conn, by_crop(crop_id), NEWEST_FIRST)
}

/// Price spread for a crop between two dates; `None` when nothing was priced
pub fn price_range_by_crop(
    conn: &Connection,
    crop_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Option<PriceRange>> {
    let stmt = Query::select()
        .expr(Func::min(Expr::col(MarketPriceIden::PricePerKg)))
        .expr(Func::max(Expr::col(MarketPriceIden::PricePerKg)))
        .expr(Func::avg(Expr::col(MarketPriceIden::PricePerKg)))
        .from(MarketPriceIden::Table)
        .cond_where(window(from, to).and(by_crop(crop_id)))
        .to_owned();

    let range = query::fetch_row_optional(conn, &stmt, |row| {
        let min: Option<f64> = row.get(0)?;
        let max: Option<f64> = row.get(1)?;
        let average: Option<f64> = row.get(2)?;
        Ok(min.zip(max).zip(average).map(|((min, max), average)| PriceRange { min, max, average }))
    })?;
    Ok(range.flatten())
}

/// Mean price per kg for every market type that has observations
pub fn average_price_by_market_type(conn: &Connection) -> Result<Vec<(MarketType, Option<f64>)>> {
    base::aggregate_grouped::<MarketPrice, _>(
        conn,
        Aggregate::Avg,
        MarketPriceIden::MarketType,
        MarketPriceIden::PricePerKg,
        Filter::all(),
    )
}

/// Markets with HIGH or VERY_HIGH demand, LOW supply and rising prices,
/// best priced first
pub fn find_market_opportunities(conn: &Connection) -> Result<Vec<MarketPrice>> {
    let filter = Filter::all()
        .is_in(MarketPriceIden::DemandLevel, [DemandLevel::High, DemandLevel::VeryHigh])
        .eq(MarketPriceIden::SupplyLevel, SupplyLevel::Low)
        .eq(MarketPriceIden::PriceTrend, PriceTrend::Increasing);
    base::find_where_ordered(conn, filter, &[(MarketPriceIden::PricePerKg, Order::Desc)])
}

/// Observations with a reliability score of at least `min_score`
pub fn find_reliable_prices(conn: &Connection, min_score: i32) -> Result<Vec<MarketPrice>> {
    base::find_where_ordered(
        conn,
        Filter::all().gte(MarketPriceIden::ReliabilityScore, min_score),
        NEWEST_FIRST,
    )
}

/// Prices whose market, location, grade or source contain `term`
pub fn search_market_prices(conn: &Connection, term: &str) -> Result<Vec<MarketPrice>> {
    let filter = Filter::all().search_any(
        [
            MarketPriceIden::MarketName,
            MarketPriceIden::Location,
            MarketPriceIden::QualityGrade,
            MarketPriceIden::DataSource,
        ],
        term,
    );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

pub fn find_prices_with_filters(
    conn: &Connection,
    filter: &MarketPriceFilter,
    page: PageRequest,
) -> Result<Page<MarketPrice>> {
    base::find_page_where(conn, filter.to_filter(), NEWEST_FIRST, page)
}

pub fn count_prices_by_trend(conn: &Connection) -> Result<Vec<(PriceTrend, u64)>> {
    base::count_grouped::<MarketPrice, _>(conn, MarketPriceIden::PriceTrend, Filter::all())
}

/// Delete observations priced strictly before `cutoff`
pub fn delete_prices_before(conn: &Connection, cutoff: NaiveDate) -> Result<usize> {
    let deleted = base::delete_where::<MarketPrice>(
        conn,
        Filter::all().lt(MarketPriceIden::PriceDate, codec::date(cutoff)),
    )?;
    info!(deleted, %cutoff, "deleted old market prices");
    Ok(deleted)
}

fn by_crop(crop_id: &str) -> Filter {
    Filter::all().eq(MarketPriceIden::CropId, crop_id)
}

fn window(from: NaiveDate, to: NaiveDate) -> Filter {
    Filter::all().between(MarketPriceIden::PriceDate, codec::date(from), codec::date(to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_database;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn price(crop: &str, market: MarketType, d: u32, per_kg: f64) -> MarketPrice {
        MarketPrice::new(crop, "Kimironko", market, day(d), per_kg)
    }

    #[test]
    fn test_price_range_and_latest() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        base::save_all(
            &conn,
            &[
                price("maize", MarketType::Retail, 1, 400.0),
                price("maize", MarketType::Retail, 10, 500.0),
                price("maize", MarketType::Wholesale, 20, 300.0),
                price("beans", MarketType::Retail, 15, 900.0),
            ],
        )
        .unwrap();

        let range = price_range_by_crop(&conn, "maize", day(1), day(30)).unwrap().unwrap();
        assert_eq!(range, PriceRange { min: 300.0, max: 500.0, average: 400.0 });
        assert_eq!(price_range_by_crop(&conn, "rice", day(1), day(30)).unwrap(), None);

        let latest = find_latest_price_by_crop(&conn, "maize").unwrap().unwrap();
        assert_eq!(latest.price_date, day(20));

        let by_type = average_price_by_market_type(&conn).unwrap();
        assert_eq!(by_type[0], (MarketType::Retail, Some(600.0)));
        assert_eq!(by_type[1], (MarketType::Wholesale, Some(300.0)));

        assert_eq!(find_prices_by_crop_between(&conn, "maize", day(5), day(15)).unwrap().len(), 1);
        assert_eq!(find_prices_above(&conn, 500.0).unwrap().len(), 1);
        assert_eq!(find_prices_below(&conn, 400.0).unwrap().len(), 1);
        assert_eq!(find_prices_in_range(&conn, 400.0, 500.0).unwrap().len(), 2);
    }

    #[test]
    fn test_market_opportunities() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut hot = price("maize", MarketType::Retail, 1, 450.0);
        hot.demand_level = DemandLevel::VeryHigh;
        hot.supply_level = SupplyLevel::Low;
        hot.price_trend = PriceTrend::Increasing;
        let mut warm = hot.clone();
        warm.id = "other".to_string();
        warm.demand_level = DemandLevel::High;
        warm.price_per_kg = 600.0;
        let mut flat = hot.clone();
        flat.id = "flat".to_string();
        flat.price_trend = PriceTrend::Stable;
        base::save_all(&conn, &[hot, warm, flat]).unwrap();

        let found = find_market_opportunities(&conn).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].price_per_kg, 600.0);

        let trends = count_prices_by_trend(&conn).unwrap();
        assert_eq!(trends[0], (PriceTrend::Increasing, 2));
    }

    #[test]
    fn test_filters_and_cleanup() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut musanze = price("potato", MarketType::FarmGate, 3, 250.0);
        musanze.location = Some("Musanze, Northern".to_string());
        musanze.reliability_score = 9;
        base::save_all(&conn, &[musanze, price("potato", MarketType::Retail, 25, 320.0)]).unwrap();

        let filter = MarketPriceFilter {
            location: Some("northern".to_string()),
            max_price: Some(300.0),
            ..MarketPriceFilter::default()
        };
        let page = find_prices_with_filters(&conn, &filter, PageRequest::first(10)).unwrap();
        assert_eq!(page.total_elements, 1);
        let unfiltered = find_prices_with_filters(
            &conn,
            &MarketPriceFilter::default(),
            PageRequest::first(50),
        )
        .unwrap();
        assert_eq!(unfiltered.total_elements, base::count_all::<MarketPrice>(&conn).unwrap());
        assert_eq!(find_reliable_prices(&conn, 8).unwrap().len(), 1);
        assert_eq!(search_market_prices(&conn, "musanze").unwrap().len(), 1);

        assert_eq!(delete_prices_before(&conn, day(10)).unwrap(), 1);
        assert_eq!(find_prices_by_crop(&conn, "potato").unwrap().len(), 1);
    }

    #[test]
    fn test_price_thresholds_are_strict() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        base::save_all(
            &conn,
            &[
                price("maize", MarketType::Retail, 1, 349.5),
                price("maize", MarketType::Retail, 2, 350.0),
                price("maize", MarketType::Retail, 3, 350.5),
            ],
        )
        .unwrap();

        let prices =
            |rows: Vec<MarketPrice>| rows.into_iter().map(|p| p.price_per_kg).collect::<Vec<_>>();
        assert_eq!(prices(find_prices_above(&conn, 350.0).unwrap()), [350.5]);
        assert_eq!(prices(find_prices_below(&conn, 350.0).unwrap()), [349.5]);
        assert_eq!(prices(find_prices_in_range(&conn, 350.0, 350.5).unwrap()), [350.0, 350.5]);
    }
}
