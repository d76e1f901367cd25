//! Repository for sales transactions

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use sea_query::{Alias, Asterisk, Expr, Func, Order, Query, SimpleExpr};
use serde::Serialize;
use tracing::info;

use crate::db::models::{PaymentMethod, Transaction, TransactionIden, TransactionStatus};
use crate::db::query::{self, codec, Filter, Page, PageRequest};
use crate::db::repository::base::{self, Aggregate};
use crate::error::Result;

/// Statuses of a transaction that is still in progress
pub const ACTIVE_STATUSES: [TransactionStatus; 2] =
    [TransactionStatus::Pending, TransactionStatus::Confirmed];

/// Statuses of a transaction whose goods reached the buyer
const FULFILLED_STATUSES: [TransactionStatus; 2] =
    [TransactionStatus::Delivered, TransactionStatus::Paid];

/// Statuses after which a delivery is no longer outstanding
const SETTLED_STATUSES: [TransactionStatus; 3] = [
    TransactionStatus::Delivered,
    TransactionStatus::Paid,
    TransactionStatus::Cancelled,
];

/// Paid sales of one crop by one farmer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmerCropPerformance {
    pub farmer_id: String,
    pub crop_id: Option<String>,
    pub transactions: u64,
    pub average_price: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub farmer_id: Option<String>,
    pub buyer_id: Option<String>,
    pub crop_id: Option<String>,
    pub status: Option<TransactionStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
}

impl TransactionFilter {
    fn to_filter(&self) -> Filter {
        Filter::all()
            .eq_opt(TransactionIden::FarmerId, self.farmer_id.as_deref())
            .eq_opt(TransactionIden::BuyerId, self.buyer_id.as_deref())
            .eq_opt(TransactionIden::CropId, self.crop_id.as_deref())
            .eq_opt(TransactionIden::Status, self.status)
            .eq_opt(TransactionIden::PaymentMethod, self.payment_method)
            .gte_opt(TransactionIden::TransactionDate, codec::opt_ts(self.from))
            .lte_opt(TransactionIden::TransactionDate, codec::opt_ts(self.to))
            .gte_opt(TransactionIden::TotalAmount, self.min_amount)
            .lte_opt(TransactionIden::TotalAmount, self.max_amount)
    }
}

const NEWEST_FIRST: &[(TransactionIden, Order)] =
    &[(TransactionIden::TransactionDate, Order::Desc)];
const BY_DELIVERY: &[(TransactionIden, Order)] = &[(TransactionIden::DeliveryDate, Order::Asc)];

pub fn find_transaction_by_code(conn: &Connection, code: &str) -> Result<Option<Transaction>> {
    base::find_one_where(conn, Filter::all().eq(TransactionIden::TransactionCode, code))
}

pub fn exists_transaction_by_code(conn: &Connection, code: &str) -> Result<bool> {
    base::exists_where::<Transaction>(conn, Filter::all().eq(TransactionIden::TransactionCode, code))
}

/// Get a farmer's transactions, latest first
pub fn find_transactions_by_farmer(
    conn: &Connection,
    farmer_id: &str,
) -> Result<Vec<Transaction>> {
    base::find_where_ordered(conn, by_farmer(farmer_id), NEWEST_FIRST)
}

pub fn find_transactions_by_farmer_paged(
    conn: &Connection,
    farmer_id: &str,
    page: PageRequest,
) -> Result<Page<Transaction>> {
    base::find_page_where(conn, by_farmer(farmer_id), NEWEST_FIRST, page)
}

pub fn find_transactions_by_buyer(conn: &Connection, buyer_id: &str) -> Result<Vec<Transaction>> {
    base::find_where_ordered(conn, by_buyer(buyer_id), NEWEST_FIRST)
}

pub fn find_transactions_by_status(
    conn: &Connection,
    status: TransactionStatus,
) -> Result<Vec<Transaction>> {
    base::find_where_ordered(conn, Filter::all().eq(TransactionIden::Status, status), NEWEST_FIRST)
}

pub fn find_transactions_by_farmer_and_status(
    conn: &Connection,
    farmer_id: &str,
    status: TransactionStatus,
) -> Result<Vec<Transaction>> {
    base::find_where_ordered(
        conn,
        by_farmer(farmer_id).eq(TransactionIden::Status, status),
        NEWEST_FIRST,
    )
}

pub fn count_transactions_by_farmer_and_status(
    conn: &Connection,
    farmer_id: &str,
    status: TransactionStatus,
) -> Result<u64> {
    base::count_where::<Transaction>(conn, by_farmer(farmer_id).eq(TransactionIden::Status, status))
}

/// Pending or confirmed transactions
pub fn find_active_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    base::find_where_ordered(
        conn,
        Filter::all().is_in(TransactionIden::Status, ACTIVE_STATUSES),
        NEWEST_FIRST,
    )
}

/// Paid transactions
pub fn find_completed_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    find_transactions_by_status(conn, TransactionStatus::Paid)
}

pub fn find_cancelled_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    find_transactions_by_status(conn, TransactionStatus::Cancelled)
}

pub fn find_disputed_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    find_transactions_by_status(conn, TransactionStatus::Disputed)
}

/// Transactions whose delivery date is before `as_of` and that are not yet
/// delivered, paid or cancelled
pub fn find_overdue_deliveries(conn: &Connection, as_of: NaiveDate) -> Result<Vec<Transaction>> {
    base::find_where_ordered(conn, overdue(as_of), BY_DELIVERY)
}

/// Unsettled transactions due for delivery between `from` and `to` inclusive
pub fn find_upcoming_deliveries(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Transaction>> {
    let filter = Filter::all()
        .between(TransactionIden::DeliveryDate, codec::date(from), codec::date(to))
        .not_in(TransactionIden::Status, SETTLED_STATUSES);
    base::find_where_ordered(conn, filter, BY_DELIVERY)
}

pub fn find_transactions_by_buyer_paged(
    conn: &Connection,
    buyer_id: &str,
    page: PageRequest,
) -> Result<Page<Transaction>> {
    base::find_page_where(conn, by_buyer(buyer_id), NEWEST_FIRST, page)
}

pub fn find_transactions_by_buyer_and_status(
    conn: &Connection,
    buyer_id: &str,
    status: TransactionStatus,
) -> Result<Vec<Transaction>> {
    base::find_where_ordered(
        conn,
        by_buyer(buyer_id).eq(TransactionIden::Status, status),
        NEWEST_FIRST,
    )
}

pub fn count_transactions_by_buyer_and_status(
    conn: &Connection,
    buyer_id: &str,
    status: TransactionStatus,
) -> Result<u64> {
    base::count_where::<Transaction>(conn, by_buyer(buyer_id).eq(TransactionIden::Status, status))
}

pub fn find_transactions_by_crop(conn: &Connection, crop_id: &str) -> Result<Vec<Transaction>> {
    base::find_where_ordered(conn, Filter::all().eq(TransactionIden::CropId, crop_id), NEWEST_FIRST)
}

pub fn find_transactions_by_crop_paged(
    conn: &Connection,
    crop_id: &str,
    page: PageRequest,
) -> Result<Page<Transaction>> {
    base::find_page_where(
        conn,
        Filter::all().eq(TransactionIden::CropId, crop_id),
        NEWEST_FIRST,
        page,
    )
}

pub fn find_transactions_by_crop_production(
    conn: &Connection,
    crop_production_id: &str,
) -> Result<Vec<Transaction>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(TransactionIden::CropProductionId, crop_production_id),
        NEWEST_FIRST,
    )
}

pub fn find_transactions_by_payment_method(
    conn: &Connection,
    method: PaymentMethod,
) -> Result<Vec<Transaction>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(TransactionIden::PaymentMethod, method),
        NEWEST_FIRST,
    )
}

/// Transactions due for delivery between `from` and `to` inclusive, of any status
pub fn find_transactions_by_delivery_date_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Transaction>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(TransactionIden::DeliveryDate, codec::date(from), codec::date(to)),
        BY_DELIVERY,
    )
}

/// Transactions due for delivery on `date`
pub fn find_transactions_for_delivery_date(
    conn: &Connection,
    date: NaiveDate,
) -> Result<Vec<Transaction>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(TransactionIden::DeliveryDate, codec::date(date)),
        NEWEST_FIRST,
    )
}

/// Transactions delivered to a location containing `location`, ignoring case
pub fn find_transactions_by_delivery_location(
    conn: &Connection,
    location: &str,
) -> Result<Vec<Transaction>> {
    base::find_where_ordered(
        conn,
        Filter::all().contains(TransactionIden::DeliveryLocation, location),
        NEWEST_FIRST,
    )
}

pub fn find_transactions_paid_between(
    conn: &Connection,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<Transaction>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(TransactionIden::PaymentDate, codec::ts(from), codec::ts(to)),
        &[(TransactionIden::PaymentDate, Order::Desc)],
    )
}

pub fn count_overdue_deliveries(conn: &Connection, as_of: NaiveDate) -> Result<u64> {
    base::count_where::<Transaction>(conn, overdue(as_of))
}

/// Transactions with no payment date that have not been cancelled
pub fn find_unpaid_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    let filter = Filter::all()
        .is_null(TransactionIden::PaymentDate)
        .ne(TransactionIden::Status, TransactionStatus::Cancelled);
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

pub fn find_transactions_by_amount_between(
    conn: &Connection,
    min: f64,
    max: f64,
) -> Result<Vec<Transaction>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(TransactionIden::TotalAmount, min, max),
        &[(TransactionIden::TotalAmount, Order::Asc)],
    )
}

/// Transactions worth strictly more than `threshold`, largest first
pub fn find_high_value_transactions(
    conn: &Connection,
    threshold: f64,
) -> Result<Vec<Transaction>> {
    base::find_where_ordered(
        conn,
        Filter::all().gt(TransactionIden::TotalAmount, threshold),
        &[(TransactionIden::TotalAmount, Order::Desc)],
    )
}

pub fn find_transactions_by_date_between(
    conn: &Connection,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<Transaction>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(TransactionIden::TransactionDate, codec::ts(from), codec::ts(to)),
        NEWEST_FIRST,
    )
}

/// Transactions whose code, delivery location, quality grade or notes contain `term`
pub fn search_transactions(conn: &Connection, term: &str) -> Result<Vec<Transaction>> {
    base::find_where_ordered(conn, searching(term), NEWEST_FIRST)
}

/// A farmer's transactions matching `term` like [`search_transactions`]
pub fn search_transactions_by_farmer(
    conn: &Connection,
    farmer_id: &str,
    term: &str,
) -> Result<Vec<Transaction>> {
    base::find_where_ordered(conn, by_farmer(farmer_id).and(searching(term)), NEWEST_FIRST)
}

/// A buyer's transactions matching `term` like [`search_transactions`]
pub fn search_transactions_by_buyer(
    conn: &Connection,
    buyer_id: &str,
    term: &str,
) -> Result<Vec<Transaction>> {
    base::find_where_ordered(conn, by_buyer(buyer_id).and(searching(term)), NEWEST_FIRST)
}

pub fn find_transactions_with_filters(
    conn: &Connection,
    filter: &TransactionFilter,
    page: PageRequest,
) -> Result<Page<Transaction>> {
    base::find_page_where(conn, filter.to_filter(), NEWEST_FIRST, page)
}

pub fn count_transactions_by_status(conn: &Connection) -> Result<Vec<(TransactionStatus, u64)>> {
    base::count_grouped::<Transaction, _>(conn, TransactionIden::Status, Filter::all())
}

/// Sum of paid transaction amounts for a farmer; 0 when there are none
pub fn total_paid_amount_by_farmer(conn: &Connection, farmer_id: &str) -> Result<f64> {
    let total = base::aggregate::<Transaction>(
        conn,
        Aggregate::Sum,
        TransactionIden::TotalAmount,
        by_farmer(farmer_id).eq(TransactionIden::Status, TransactionStatus::Paid),
    )?;
    Ok(total.unwrap_or(0.0))
}

/// Sum of paid transaction amounts for a buyer; 0 when there are none
pub fn total_paid_amount_by_buyer(conn: &Connection, buyer_id: &str) -> Result<f64> {
    let total = base::aggregate::<Transaction>(
        conn,
        Aggregate::Sum,
        TransactionIden::TotalAmount,
        by_buyer(buyer_id).eq(TransactionIden::Status, TransactionStatus::Paid),
    )?;
    Ok(total.unwrap_or(0.0))
}

/// Quantity of a crop sold in delivered or paid transactions
pub fn total_sold_quantity_by_crop(conn: &Connection, crop_id: &str) -> Result<f64> {
    let total = base::aggregate::<Transaction>(
        conn,
        Aggregate::Sum,
        TransactionIden::Quantity,
        Filter::all()
            .eq(TransactionIden::CropId, crop_id)
            .is_in(TransactionIden::Status, FULFILLED_STATUSES),
    )?;
    Ok(total.unwrap_or(0.0))
}

pub fn count_transactions_by_payment_method(
    conn: &Connection,
) -> Result<Vec<(Option<PaymentMethod>, u64)>> {
    base::count_grouped::<Transaction, _>(conn, TransactionIden::PaymentMethod, Filter::all())
}

/// Delivery locations of fulfilled transactions, busiest first
pub fn popular_delivery_locations(conn: &Connection) -> Result<Vec<(String, u64)>> {
    base::count_grouped::<Transaction, _>(
        conn,
        TransactionIden::DeliveryLocation,
        Filter::all()
            .is_not_null(TransactionIden::DeliveryLocation)
            .is_in(TransactionIden::Status, FULFILLED_STATUSES),
    )
}

/// Mean unit price of paid sales per crop, dearest first
pub fn average_price_by_crop(conn: &Connection) -> Result<Vec<(String, f64)>> {
    let average = Alias::new("average_price");
    let stmt = Query::select()
        .column(TransactionIden::CropId)
        .expr_as(Func::avg(Expr::col(TransactionIden::PricePerUnit)), average.clone())
        .from(TransactionIden::Table)
        .and_where(Expr::col(TransactionIden::Status).eq(TransactionStatus::Paid))
        .and_where(Expr::col(TransactionIden::CropId).is_not_null())
        .group_by_col(TransactionIden::CropId)
        .order_by(average, Order::Desc)
        .order_by(TransactionIden::CropId, Order::Asc)
        .to_owned();

    query::fetch_rows(conn, &stmt, |row| Ok((row.get(0)?, row.get(1)?)))
}

/// Paid sales per farmer and crop, most frequent first
pub fn farmer_crop_performance(conn: &Connection) -> Result<Vec<FarmerCropPerformance>> {
    let transactions = Alias::new("transactions");
    let stmt = Query::select()
        .column(TransactionIden::FarmerId)
        .column(TransactionIden::CropId)
        .expr_as(Func::count(Expr::col(Asterisk)), transactions.clone())
        .expr(Func::avg(Expr::col(TransactionIden::PricePerUnit)))
        .from(TransactionIden::Table)
        .and_where(Expr::col(TransactionIden::Status).eq(TransactionStatus::Paid))
        .group_by_col(TransactionIden::FarmerId)
        .group_by_col(TransactionIden::CropId)
        .order_by(transactions, Order::Desc)
        .order_by(TransactionIden::FarmerId, Order::Asc)
        .order_by(TransactionIden::CropId, Order::Asc)
        .to_owned();

    query::fetch_rows(conn, &stmt, |row| {
        let transactions: i64 = row.get(2)?;
        Ok(FarmerCropPerformance {
            farmer_id: row.get(0)?,
            crop_id: row.get(1)?,
            transactions: transactions.max(0) as u64,
            average_price: row.get(3)?,
        })
    })
}

/// Mean number of days between sale and payment over paid transactions;
/// `None` when nothing has been paid
pub fn average_payment_delay_days(conn: &Connection) -> Result<Option<f64>> {
    let delay = Expr::expr(julianday(TransactionIden::PaymentDate))
        .sub(julianday(TransactionIden::TransactionDate));
    let stmt = Query::select()
        .expr(Func::avg(delay))
        .from(TransactionIden::Table)
        .and_where(Expr::col(TransactionIden::PaymentDate).is_not_null())
        .to_owned();
    query::fetch_scalar(conn, &stmt)
}

/// Farmers ranked by paid revenue, highest first
pub fn top_farmers_by_revenue(conn: &Connection, limit: u64) -> Result<Vec<(String, f64)>> {
    let revenue = Alias::new("revenue");
    let stmt = Query::select()
        .column(TransactionIden::FarmerId)
        .expr_as(Func::sum(Expr::col(TransactionIden::TotalAmount)), revenue.clone())
        .from(TransactionIden::Table)
        .and_where(Expr::col(TransactionIden::Status).eq(TransactionStatus::Paid))
        .group_by_col(TransactionIden::FarmerId)
        .order_by(revenue, Order::Desc)
        .order_by(TransactionIden::FarmerId, Order::Asc)
        .limit(limit.min(i64::MAX as u64))
        .to_owned();

    query::fetch_rows(conn, &stmt, |row| Ok((row.get(0)?, row.get(1)?)))
}

/// Number of transactions per month (1-12) of `year`; months without
/// transactions are omitted
pub fn monthly_transaction_counts(conn: &Connection, year: i32) -> Result<Vec<(u32, u64)>> {
    let month = Alias::new("month");
    let stmt = Query::select()
        .expr_as(
            Func::cast_as(
                Func::cust(Alias::new("substr"))
                    .arg(Expr::col(TransactionIden::TransactionDate))
                    .arg(6)
                    .arg(2),
                Alias::new("INTEGER"),
            ),
            month.clone(),
        )
        .expr(Func::count(Expr::col(Asterisk)))
        .from(TransactionIden::Table)
        .cond_where(year_window(year))
        .group_by_col(month.clone())
        .order_by(month, Order::Asc)
        .to_owned();

    query::fetch_rows(conn, &stmt, |row| {
        let month: u32 = row.get(0)?;
        let count: i64 = row.get(1)?;
        Ok((month, count.max(0) as u64))
    })
}

/// Transactions dated at or after `since`, latest first
pub fn find_recent_transactions(
    conn: &Connection,
    since: DateTime<Utc>,
) -> Result<Vec<Transaction>> {
    base::find_where_ordered(
        conn,
        Filter::all().gte(TransactionIden::TransactionDate, codec::ts(since)),
        NEWEST_FIRST,
    )
}

/// A farmer's transactions created at or after `since`, latest first
pub fn find_recent_transactions_by_farmer(
    conn: &Connection,
    farmer_id: &str,
    since: DateTime<Utc>,
) -> Result<Vec<Transaction>> {
    base::find_where_ordered(
        conn,
        by_farmer(farmer_id).gte(TransactionIden::CreatedAt, codec::ts(since)),
        &[(TransactionIden::CreatedAt, Order::Desc)],
    )
}

/// A buyer's transactions created at or after `since`, latest first
pub fn find_recent_transactions_by_buyer(
    conn: &Connection,
    buyer_id: &str,
    since: DateTime<Utc>,
) -> Result<Vec<Transaction>> {
    base::find_where_ordered(
        conn,
        by_buyer(buyer_id).gte(TransactionIden::CreatedAt, codec::ts(since)),
        &[(TransactionIden::CreatedAt, Order::Desc)],
    )
}

/// Whether the farmer already has a transaction with this buyer for this
/// crop in `status`
pub fn exists_transaction_for(
    conn: &Connection,
    farmer_id: &str,
    buyer_id: &str,
    crop_id: &str,
    status: TransactionStatus,
) -> Result<bool> {
    let filter = by_farmer(farmer_id)
        .eq(TransactionIden::BuyerId, buyer_id)
        .eq(TransactionIden::CropId, crop_id)
        .eq(TransactionIden::Status, status);
    base::exists_where::<Transaction>(conn, filter)
}

/// Set the status of a transaction; any transition is accepted
pub fn update_transaction_status(
    conn: &Connection,
    id: &str,
    status: TransactionStatus,
) -> Result<bool> {
    let updated = base::update_where::<Transaction>(
        conn,
        vec![
            (TransactionIden::Status, status.into()),
            (TransactionIden::UpdatedAt, codec::ts(Utc::now()).into()),
        ],
        Filter::all().eq(TransactionIden::Id, id),
    )?;
    Ok(updated > 0)
}

/// Delete cancelled transactions created strictly before `cutoff`
pub fn delete_old_cancelled_transactions(
    conn: &Connection,
    cutoff: DateTime<Utc>,
) -> Result<usize> {
    let deleted = base::delete_where::<Transaction>(
        conn,
        Filter::all()
            .eq(TransactionIden::Status, TransactionStatus::Cancelled)
            .lt(TransactionIden::CreatedAt, codec::ts(cutoff)),
    )?;
    info!(deleted, %cutoff, "deleted old cancelled transactions");
    Ok(deleted)
}

/// Cancel every pending transaction created strictly before `cutoff`
pub fn cancel_old_pending_transactions(
    conn: &Connection,
    cutoff: DateTime<Utc>,
) -> Result<usize> {
    let cancelled = base::update_where::<Transaction>(
        conn,
        vec![
            (TransactionIden::Status, TransactionStatus::Cancelled.into()),
            (TransactionIden::UpdatedAt, codec::ts(Utc::now()).into()),
        ],
        Filter::all()
            .eq(TransactionIden::Status, TransactionStatus::Pending)
            .lt(TransactionIden::CreatedAt, codec::ts(cutoff)),
    )?;
    info!(cancelled, %cutoff, "cancelled stale pending transactions");
    Ok(cancelled)
}

fn by_farmer(farmer_id: &str) -> Filter {
    Filter::all().eq(TransactionIden::FarmerId, farmer_id)
}

fn by_buyer(buyer_id: &str) -> Filter {
    Filter::all().eq(TransactionIden::BuyerId, buyer_id)
}

fn overdue(as_of: NaiveDate) -> Filter {
    Filter::all()
        .lt(TransactionIden::DeliveryDate, codec::date(as_of))
        .not_in(TransactionIden::Status, SETTLED_STATUSES)
}

fn searching(term: &str) -> Filter {
    Filter::all().search_any(
        [
            TransactionIden::TransactionCode,
            TransactionIden::DeliveryLocation,
            TransactionIden::QualityGrade,
            TransactionIden::Notes,
        ],
        term,
    )
}

fn julianday(col: TransactionIden) -> SimpleExpr {
    Func::cust(Alias::new("julianday")).arg(Expr::col(col)).into()
}

fn year_window(year: i32) -> Filter {
    Filter::all()
        .gte(TransactionIden::TransactionDate, format!("{year:04}-01-01"))
        .lt(TransactionIden::TransactionDate, format!("{:04}-01-01", year + 1))
}
