//! Repository for stored produce

use chrono::NaiveDate;
use rusqlite::Connection;
use sea_query::{Alias, Asterisk, Expr, Func, Order, Query};
use tracing::info;

use crate::db::models::{FacilityType, Inventory, InventoryIden, InventoryStatus, PestStatus};
use crate::db::query::{self, codec, Filter, Page, PageRequest};
use crate::db::repository::base::{self, Aggregate};
use crate::error::Result;

/// Loss percentage at which a lot needs attention
pub const HIGH_LOSS_PERCENTAGE: f64 = 5.0;

/// Stock held for one crop
#[derive(Debug, Clone, PartialEq)]
pub struct CropStockSummary {
    pub crop_id: String,
    pub lots: u64,
    pub current_quantity: f64,
    pub reserved_quantity: f64,
    pub available_quantity: f64,
}

#[derive(Debug, Clone, Default)]
pub struct InventoryFilter {
    pub crop_id: Option<String>,
    pub farmer_user_id: Option<String>,
    pub status: Option<InventoryStatus>,
    pub facility_type: Option<FacilityType>,
    pub min_available_quantity: Option<f64>,
    pub organic_certified: Option<bool>,
}

impl InventoryFilter {
    fn to_filter(&self) -> Filter {
        Filter::all()
            .eq_opt(InventoryIden::CropId, self.crop_id.as_deref())
            .eq_opt(InventoryIden::FarmerUserId, self.farmer_user_id.as_deref())
            .eq_opt(InventoryIden::Status, self.status)
            .eq_opt(InventoryIden::FacilityType, self.facility_type)
            .gte_opt(InventoryIden::AvailableQuantity, self.min_available_quantity)
            .eq_opt(InventoryIden::OrganicCertified, self.organic_certified)
    }
}

const BY_CODE: &[(InventoryIden, Order)] = &[(InventoryIden::InventoryCode, Order::Asc)];
const BY_EXPIRY: &[(InventoryIden, Order)] = &[(InventoryIden::ExpiryDate, Order::Asc)];

pub fn find_inventory_by_code(conn: &Connection, code: &str) -> Result<Option<Inventory>> {
    base::find_one_where(conn, Filter::all().eq(InventoryIden::InventoryCode, code))
}

pub fn exists_inventory_by_code(conn: &Connection, code: &str) -> Result<bool> {
    base::exists_where::<Inventory>(conn, Filter::all().eq(InventoryIden::InventoryCode, code))
}

pub fn find_inventories_by_crop(conn: &Connection, crop_id: &str) -> Result<Vec<Inventory>> {
    base::find_where_ordered(conn, Filter::all().eq(InventoryIden::CropId, crop_id), BY_CODE)
}

pub fn find_inventories_by_farmer(
    conn: &Connection,
    farmer_user_id: &str,
) -> Result<Vec<Inventory>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(InventoryIden::FarmerUserId, farmer_user_id),
        BY_CODE,
    )
}

pub fn find_inventories_by_status(
    conn: &Connection,
    status: InventoryStatus,
) -> Result<Vec<Inventory>> {
    base::find_where_ordered(conn, Filter::all().eq(InventoryIden::Status, status), BY_CODE)
}

pub fn find_inventories_by_facility_type(
    conn: &Connection,
    facility_type: FacilityType,
) -> Result<Vec<Inventory>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(InventoryIden::FacilityType, facility_type),
        BY_CODE,
    )
}

/// Lots marked available that still have stock to sell
pub fn find_available_inventories(conn: &Connection) -> Result<Vec<Inventory>> {
    base::find_where_ordered(conn, available(), BY_CODE)
}

/// Available lots expiring on or before `date`
pub fn find_expiring_inventories(conn: &Connection, date: NaiveDate) -> Result<Vec<Inventory>> {
    base::find_where_ordered(conn, expiring_by(date), BY_EXPIRY)
}

/// Lots past their expiry date (strictly before `date`) not yet marked expired
pub fn find_expired_inventories(conn: &Connection, date: NaiveDate) -> Result<Vec<Inventory>> {
    base::find_where_ordered(
        conn,
        Filter::all()
            .lt(InventoryIden::ExpiryDate, codec::date(date))
            .ne(InventoryIden::Status, InventoryStatus::Expired),
        BY_EXPIRY,
    )
}

/// Lots whose available quantity is at or below their minimum stock level
pub fn find_low_stock_inventories(conn: &Connection) -> Result<Vec<Inventory>> {
    base::find_where_ordered(conn, low_stock(), BY_CODE)
}

pub fn find_pest_affected_inventories(conn: &Connection) -> Result<Vec<Inventory>> {
    base::find_where_ordered(
        conn,
        Filter::all().ne(InventoryIden::PestStatus, PestStatus::PestFree),
        BY_CODE,
    )
}

/// Lots that are expiring by `expiring_by`, low on stock, losing at least
/// [`HIGH_LOSS_PERCENTAGE`], infested, or due for inspection on `today`
pub fn find_inventories_requiring_attention(
    conn: &Connection,
    today: NaiveDate,
    expiring_by_date: NaiveDate,
) -> Result<Vec<Inventory>> {
    let filter = Filter::all().any_of(
        Filter::any()
            .and(expiring_by(expiring_by_date))
            .and(low_stock())
            .gte(InventoryIden::LossPercentage, HIGH_LOSS_PERCENTAGE)
            .ne(InventoryIden::PestStatus, PestStatus::PestFree)
            .lte(InventoryIden::NextInspectionDate, codec::date(today)),
    );
    base::find_where_ordered(conn, filter, BY_CODE)
}

/// Lots whose code, location, facility name or quality grade contains `term`
pub fn search_inventories(conn: &Connection, term: &str) -> Result<Vec<Inventory>> {
    let filter = Filter::all().search_any(
        [
            InventoryIden::InventoryCode,
            InventoryIden::StorageLocation,
            InventoryIden::FacilityName,
            InventoryIden::QualityGrade,
        ],
        term,
    );
    base::find_where_ordered(conn, filter, BY_CODE)
}

pub fn find_inventories_with_filters(
    conn: &Connection,
    filter: &InventoryFilter,
    page: PageRequest,
) -> Result<Page<Inventory>> {
    base::find_page_where(conn, filter.to_filter(), BY_CODE, page)
}

/// Lot count and quantities per crop
pub fn inventory_summary_by_crop(conn: &Connection) -> Result<Vec<CropStockSummary>> {
    let stmt = Query::select()
        .column(InventoryIden::CropId)
        .expr(Func::count(Expr::col(Asterisk)))
        .expr(Func::coalesce([
            Func::sum(Expr::col(InventoryIden::CurrentQuantity)).into(),
            Expr::val(0.0).into(),
        ]))
        .expr(Func::coalesce([
            Func::sum(Expr::col(InventoryIden::ReservedQuantity)).into(),
            Expr::val(0.0).into(),
        ]))
        .expr(Func::coalesce([
            Func::sum(Expr::col(InventoryIden::AvailableQuantity)).into(),
            Expr::val(0.0).into(),
        ]))
        .from(InventoryIden::Table)
        .group_by_col(InventoryIden::CropId)
        .order_by(InventoryIden::CropId, Order::Asc)
        .to_owned();

    query::fetch_rows(conn, &stmt, |row| {
        let lots: i64 = row.get(1)?;
        Ok(CropStockSummary {
            crop_id: row.get(0)?,
            lots: lots.max(0) as u64,
            current_quantity: row.get(2)?,
            reserved_quantity: row.get(3)?,
            available_quantity: row.get(4)?,
        })
    })
}

/// Quantity available for sale for one crop
pub fn total_available_by_crop(conn: &Connection, crop_id: &str) -> Result<f64> {
    let total = base::aggregate::<Inventory>(
        conn,
        Aggregate::Sum,
        InventoryIden::AvailableQuantity,
        available().eq(InventoryIden::CropId, crop_id),
    )?;
    Ok(total.unwrap_or(0.0))
}

/// Delete lots marked expired whose expiry date is strictly before `cutoff`
pub fn delete_expired_inventories(conn: &Connection, cutoff: NaiveDate) -> Result<usize> {
    let deleted = base::delete_where::<Inventory>(
        conn,
        Filter::all()
            .lt(InventoryIden::ExpiryDate, codec::date(cutoff))
            .eq(InventoryIden::Status, InventoryStatus::Expired),
    )?;
    info!(deleted, %cutoff, "deleted expired inventory lots");
    Ok(deleted)
}

fn available() -> Filter {
    Filter::all()
        .eq(InventoryIden::Status, InventoryStatus::Available)
        .gt(InventoryIden::AvailableQuantity, 0.0)
}

fn expiring_by(date: NaiveDate) -> Filter {
    Filter::all()
        .lte(InventoryIden::ExpiryDate, codec::date(date))
        .eq(InventoryIden::Status, InventoryStatus::Available)
}

fn low_stock() -> Filter {
    Filter::all()
        .is_not_null(InventoryIden::MinimumStockLevel)
        .col_lte(InventoryIden::AvailableQuantity, InventoryIden::MinimumStockLevel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_database;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn lot(code: &str, crop: &str, quantity: f64) -> Inventory {
        Inventory::new(code, crop, FacilityType::Warehouse, quantity)
    }

    #[test]
    fn test_available_excludes_empty_and_reserved() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut empty = lot("EMPTY", "maize", 0.0);
        empty.available_quantity = 0.0;
        let mut reserved = lot("RES", "maize", 50.0);
        reserved.status = InventoryStatus::Reserved;
        base::save_all(&conn, &[lot("OK", "maize", 100.0), empty, reserved]).unwrap();

        let available = find_available_inventories(&conn).unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].inventory_code, "OK");
        assert_eq!(total_available_by_crop(&conn, "maize").unwrap(), 100.0);
        assert_eq!(total_available_by_crop(&conn, "beans").unwrap(), 0.0);
    }

    #[test]
    fn test_expiry_boundaries() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut on_day = lot("ON", "maize", 10.0);
        on_day.expiry_date = Some(day(10));
        let mut before = lot("BEFORE", "maize", 10.0);
        before.expiry_date = Some(day(9));
        before.status = InventoryStatus::Expired;
        base::save_all(&conn, &[on_day, before]).unwrap();

        // Expiring includes the day itself but only for available lots
        let expiring = find_expiring_inventories(&conn, day(10)).unwrap();
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].inventory_code, "ON");

        // Already marked expired, so not reported again
        assert!(find_expired_inventories(&conn, day(10)).unwrap().is_empty());
        assert_eq!(delete_expired_inventories(&conn, day(9)).unwrap(), 0);
        assert_eq!(delete_expired_inventories(&conn, day(10)).unwrap(), 1);
    }

    #[test]
    fn test_low_stock_and_attention() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut low = lot("LOW", "maize", 5.0);
        low.minimum_stock_level = Some(5.0);
        let mut lossy = lot("LOSSY", "maize", 100.0);
        lossy.loss_percentage = 5.0;
        let mut pests = lot("PESTS", "maize", 100.0);
        pests.pest_status = PestStatus::MinorInfestation;
        let mut inspect = lot("INSPECT", "maize", 100.0);
        inspect.next_inspection_date = Some(day(1));
        let mut fine = lot("FINE", "maize", 100.0);
        fine.minimum_stock_level = Some(10.0);
        fine.loss_percentage = 4.9;
        fine.next_inspection_date = Some(day(30));
        base::save_all(&conn, &[low, lossy, pests, inspect, fine]).unwrap();

        let low = find_low_stock_inventories(&conn).unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].inventory_code, "LOW");
        assert_eq!(find_pest_affected_inventories(&conn).unwrap().len(), 1);

        let attention = find_inventories_requiring_attention(&conn, day(1), day(15)).unwrap();
        let codes: Vec<_> = attention.iter().map(|i| i.inventory_code.as_str()).collect();
        assert_eq!(codes, ["INSPECT", "LOSSY", "LOW", "PESTS"]);
    }

    #[test]
    fn test_expired_skips_lots_already_marked() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut stale = lot("STALE", "maize", 10.0);
        stale.expiry_date = Some(day(5));
        let mut marked = lot("MARKED", "maize", 10.0);
        marked.expiry_date = Some(day(4));
        marked.status = InventoryStatus::Expired;
        let mut sold = lot("SOLD", "maize", 10.0);
        sold.expiry_date = Some(day(3));
        sold.status = InventoryStatus::Sold;
        base::save_all(&conn, &[stale, marked, sold]).unwrap();

        let expired = find_expired_inventories(&conn, day(10)).unwrap();
        let codes: Vec<_> = expired.iter().map(|i| i.inventory_code.as_str()).collect();
        assert_eq!(codes, ["SOLD", "STALE"]);
    }

    #[test]
    fn test_inspection_due_uses_today_not_look_ahead() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut due = lot("DUE", "maize", 100.0);
        due.next_inspection_date = Some(day(10));
        let mut later = lot("LATER", "maize", 100.0);
        later.next_inspection_date = Some(day(20));
        let mut expiring = lot("EXPIRING", "maize", 100.0);
        expiring.expiry_date = Some(day(25));
        base::save_all(&conn, &[due, later, expiring]).unwrap();

        let attention = find_inventories_requiring_attention(&conn, day(10), day(30)).unwrap();
        let codes: Vec<_> = attention.iter().map(|i| i.inventory_code.as_str()).collect();
        assert_eq!(codes, ["DUE", "EXPIRING"]);
    }

    #[test]
    fn test_summary_by_crop() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut reserved = lot("B", "maize", 40.0);
        reserved.reserved_quantity = 10.0;
        reserved.available_quantity = 30.0;
        base::save_all(&conn, &[lot("A", "maize", 60.0), reserved, lot("C", "beans", 5.0)])
            .unwrap();

        let summary = inventory_summary_by_crop(&conn).unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(
            summary[1],
            CropStockSummary {
                crop_id: "maize".to_string(),
                lots: 2,
                current_quantity: 100.0,
                reserved_quantity: 10.0,
                available_quantity: 90.0,
            }
        );
    }

    #[test]
    fn test_filters() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut organic = lot("ORG", "maize", 60.0);
        organic.organic_certified = true;
        base::save_all(&conn, &[organic, lot("STD", "maize", 60.0)]).unwrap();

        let filter = InventoryFilter {
            organic_certified: Some(true),
            min_available_quantity: Some(60.0),
            ..InventoryFilter::default()
        };
        let page = find_inventories_with_filters(&conn, &filter, PageRequest::first(5)).unwrap();
        assert_eq!(page.content.len(), 1);
        let unfiltered = find_inventories_with_filters(
            &conn,
            &InventoryFilter::default(),
            PageRequest::first(50),
        )
        .unwrap();
        assert_eq!(unfiltered.total_elements, base::count_all::<Inventory>(&conn).unwrap());
        assert_eq!(search_inventories(&conn, "st").unwrap().len(), 1);
    }
}
