//! Repository for fertilizer applications

use chrono::NaiveDate;
use rusqlite::Connection;
use sea_query::{Alias, Asterisk, Expr, Func, Order, Query, SimpleExpr};
use serde::Serialize;
use tracing::info;

use crate::db::models::{
    ApplicationMethod, CropProductionIden, FertilizerType, FertilizerUnit, FertilizerUsage,
    FertilizerUsageIden,
};
use crate::db::query::{self, codec, Filter, Page, PageRequest};
use crate::db::repository::base::{self, Aggregate};
use crate::error::Result;

/// Aggregated results for one fertilizer type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FertilizerPerformance {
    pub fertilizer_type: FertilizerType,
    pub applications: u64,
    pub average_effectiveness: Option<f64>,
    pub total_quantity: f64,
    pub total_cost: f64,
}

/// Applications within one calendar month (`YYYY-MM`)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyUsage {
    pub month: String,
    pub applications: u64,
    pub total_quantity: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Default)]
pub struct FertilizerUsageFilter {
    pub crop_production_id: Option<String>,
    pub fertilizer_type: Option<FertilizerType>,
    pub application_method: Option<ApplicationMethod>,
    pub supplier: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub min_effectiveness: Option<i32>,
    pub min_cost: Option<f64>,
    pub max_cost: Option<f64>,
}

impl FertilizerUsageFilter {
    fn to_filter(&self) -> Filter {
        Filter::all()
            .eq_opt(FertilizerUsageIden::CropProductionId, self.crop_production_id.as_deref())
            .eq_opt(FertilizerUsageIden::FertilizerType, self.fertilizer_type)
            .eq_opt(FertilizerUsageIden::ApplicationMethod, self.application_method)
            .contains_opt(FertilizerUsageIden::Supplier, self.supplier.as_deref())
            .gte_opt(FertilizerUsageIden::ApplicationDate, codec::opt_date(self.from))
            .lte_opt(FertilizerUsageIden::ApplicationDate, codec::opt_date(self.to))
            .gte_opt(FertilizerUsageIden::EffectivenessRating, self.min_effectiveness)
            .gte_opt(FertilizerUsageIden::TotalCost, self.min_cost)
            .lte_opt(FertilizerUsageIden::TotalCost, self.max_cost)
    }
}

const NEWEST_FIRST: &[(FertilizerUsageIden, Order)] =
    &[(FertilizerUsageIden::ApplicationDate, Order::Desc)];

const BY_QUANTITY: &[(FertilizerUsageIden, Order)] = &[(FertilizerUsageIden::Quantity, Order::Asc)];

pub fn find_fertilizer_usage_by_crop_production(
    conn: &Connection,
    crop_production_id: &str,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(conn, by_production(crop_production_id), NEWEST_FIRST)
}

pub fn find_fertilizer_usage_by_crop_production_paged(
    conn: &Connection,
    crop_production_id: &str,
    page: PageRequest,
) -> Result<Page<FertilizerUsage>> {
    base::find_page_where(conn, by_production(crop_production_id), NEWEST_FIRST, page)
}

/// Applications on any production of a farm
pub fn find_fertilizer_usage_by_farm(
    conn: &Connection,
    farm_id: &str,
    page: PageRequest,
) -> Result<Page<FertilizerUsage>> {
    base::find_page_where(conn, on_farm(farm_id), NEWEST_FIRST, page)
}

pub fn count_fertilizer_usage_by_farm(conn: &Connection, farm_id: &str) -> Result<u64> {
    base::count_where::<FertilizerUsage>(conn, on_farm(farm_id))
}

/// Applications on any of `crop_production_ids`
pub fn find_fertilizer_usage_by_productions(
    conn: &Connection,
    crop_production_ids: &[&str],
    page: PageRequest,
) -> Result<Page<FertilizerUsage>> {
    let filter = Filter::all().is_in(
        FertilizerUsageIden::CropProductionId,
        crop_production_ids.iter().copied(),
    );
    base::find_page_where(conn, filter, NEWEST_FIRST, page)
}

/// The application `id`, only when it belongs to `crop_production_id`
pub fn find_fertilizer_usage_in_production(
    conn: &Connection,
    id: &str,
    crop_production_id: &str,
) -> Result<Option<FertilizerUsage>> {
    base::find_one_where(
        conn,
        by_production(crop_production_id).eq(FertilizerUsageIden::Id, id),
    )
}

pub fn count_fertilizer_usage_by_production(
    conn: &Connection,
    crop_production_id: &str,
) -> Result<u64> {
    base::count_where::<FertilizerUsage>(conn, by_production(crop_production_id))
}

pub fn find_fertilizer_usage_by_type(
    conn: &Connection,
    fertilizer_type: FertilizerType,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(FertilizerUsageIden::FertilizerType, fertilizer_type),
        NEWEST_FIRST,
    )
}

pub fn find_fertilizer_usage_by_type_paged(
    conn: &Connection,
    fertilizer_type: FertilizerType,
    page: PageRequest,
) -> Result<Page<FertilizerUsage>> {
    base::find_page_where(conn, of_type(fertilizer_type), NEWEST_FIRST, page)
}

pub fn find_fertilizer_usage_by_production_and_type(
    conn: &Connection,
    crop_production_id: &str,
    fertilizer_type: FertilizerType,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        by_production(crop_production_id).and(of_type(fertilizer_type)),
        NEWEST_FIRST,
    )
}

pub fn find_fertilizer_usage_by_type_applied_between(
    conn: &Connection,
    fertilizer_type: FertilizerType,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        of_type(fertilizer_type).and(applied_between(from, to)),
        NEWEST_FIRST,
    )
}

pub fn count_fertilizer_usage_by_type(
    conn: &Connection,
    fertilizer_type: FertilizerType,
) -> Result<u64> {
    base::count_where::<FertilizerUsage>(conn, of_type(fertilizer_type))
}

pub fn find_fertilizer_usage_by_method_paged(
    conn: &Connection,
    method: ApplicationMethod,
    page: PageRequest,
) -> Result<Page<FertilizerUsage>> {
    base::find_page_where(conn, applied_by(method), NEWEST_FIRST, page)
}

pub fn find_fertilizer_usage_by_production_and_method(
    conn: &Connection,
    crop_production_id: &str,
    method: ApplicationMethod,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        by_production(crop_production_id).and(applied_by(method)),
        NEWEST_FIRST,
    )
}

pub fn count_fertilizer_usage_by_method(
    conn: &Connection,
    method: ApplicationMethod,
) -> Result<u64> {
    base::count_where::<FertilizerUsage>(conn, applied_by(method))
}

/// Case-insensitive match on the product name
pub fn find_fertilizer_by_name(conn: &Connection, name: &str) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().contains(FertilizerUsageIden::FertilizerName, name),
        NEWEST_FIRST,
    )
}

pub fn find_fertilizer_by_brand(conn: &Connection, brand: &str) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().contains(FertilizerUsageIden::Brand, brand),
        NEWEST_FIRST,
    )
}

/// Exact product name and brand, ignoring case
pub fn find_fertilizer_by_name_and_brand(
    conn: &Connection,
    name: &str,
    brand: &str,
) -> Result<Vec<FertilizerUsage>> {
    let filter = Filter::all()
        .eq_ignore_case(FertilizerUsageIden::FertilizerName, name)
        .eq_ignore_case(FertilizerUsageIden::Brand, brand);
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

pub fn find_fertilizer_by_application_stage(
    conn: &Connection,
    stage: &str,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().contains(FertilizerUsageIden::ApplicationStage, stage),
        NEWEST_FIRST,
    )
}

pub fn find_fertilizer_by_operator(
    conn: &Connection,
    operator: &str,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().contains(FertilizerUsageIden::OperatorName, operator),
        NEWEST_FIRST,
    )
}

pub fn find_fertilizer_by_batch_number(
    conn: &Connection,
    batch_number: &str,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().contains(FertilizerUsageIden::BatchNumber, batch_number),
        NEWEST_FIRST,
    )
}

/// The application of one supplier batch
pub fn find_fertilizer_by_batch_and_supplier(
    conn: &Connection,
    batch_number: &str,
    supplier: &str,
) -> Result<Option<FertilizerUsage>> {
    let filter = Filter::all()
        .eq(FertilizerUsageIden::BatchNumber, batch_number)
        .eq_ignore_case(FertilizerUsageIden::Supplier, supplier);
    base::find_first_ordered(conn, filter, NEWEST_FIRST)
}

pub fn find_fertilizer_usage_by_method(
    conn: &Connection,
    method: ApplicationMethod,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(FertilizerUsageIden::ApplicationMethod, method),
        NEWEST_FIRST,
    )
}

pub fn find_fertilizer_applied_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(conn, applied_between(from, to), NEWEST_FIRST)
}

pub fn find_fertilizer_applied_on(
    conn: &Connection,
    date: NaiveDate,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(FertilizerUsageIden::ApplicationDate, codec::date(date)),
        NEWEST_FIRST,
    )
}

/// Applications strictly after `date`
pub fn find_fertilizer_applied_after(
    conn: &Connection,
    date: NaiveDate,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().gt(FertilizerUsageIden::ApplicationDate, codec::date(date)),
        NEWEST_FIRST,
    )
}

/// Applications strictly before `date`
pub fn find_fertilizer_applied_before(
    conn: &Connection,
    date: NaiveDate,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().lt(FertilizerUsageIden::ApplicationDate, codec::date(date)),
        NEWEST_FIRST,
    )
}

/// Applications on or after `since`, latest first
pub fn find_recent_fertilizer_usage(
    conn: &Connection,
    since: NaiveDate,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().gte(FertilizerUsageIden::ApplicationDate, codec::date(since)),
        NEWEST_FIRST,
    )
}

pub fn find_fertilizer_by_quantity_between(
    conn: &Connection,
    min: f64,
    max: f64,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(FertilizerUsageIden::Quantity, min, max),
        BY_QUANTITY,
    )
}

/// Applications of strictly more than `quantity`
pub fn find_fertilizer_above_quantity(
    conn: &Connection,
    quantity: f64,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(conn, Filter::all().gt(FertilizerUsageIden::Quantity, quantity), BY_QUANTITY)
}

/// Applications of strictly less than `quantity`
pub fn find_fertilizer_below_quantity(
    conn: &Connection,
    quantity: f64,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(conn, Filter::all().lt(FertilizerUsageIden::Quantity, quantity), BY_QUANTITY)
}

pub fn find_fertilizer_by_total_cost_between(
    conn: &Connection,
    min: f64,
    max: f64,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(FertilizerUsageIden::TotalCost, min, max),
        &[(FertilizerUsageIden::TotalCost, Order::Asc)],
    )
}

pub fn find_fertilizer_by_effectiveness_between(
    conn: &Connection,
    min: i32,
    max: i32,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(FertilizerUsageIden::EffectivenessRating, min, max),
        &[(FertilizerUsageIden::EffectivenessRating, Order::Desc)],
    )
}

/// Applications that cost strictly more than `threshold` in total
pub fn find_high_cost_fertilizer(
    conn: &Connection,
    threshold: f64,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().gt(FertilizerUsageIden::TotalCost, threshold),
        &[(FertilizerUsageIden::TotalCost, Order::Desc)],
    )
}

/// Applications that cost strictly less than `threshold` in total
pub fn find_low_cost_fertilizer(conn: &Connection, threshold: f64) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().lt(FertilizerUsageIden::TotalCost, threshold),
        &[(FertilizerUsageIden::TotalCost, Order::Asc)],
    )
}

/// Applications priced strictly above `threshold` per unit
pub fn find_fertilizer_above_unit_cost(
    conn: &Connection,
    threshold: f64,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().gt(FertilizerUsageIden::CostPerUnit, threshold),
        &[(FertilizerUsageIden::CostPerUnit, Order::Desc)],
    )
}

/// Rated applications scoring at most `threshold`
pub fn find_low_effectiveness_fertilizer(
    conn: &Connection,
    threshold: i32,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().lte(FertilizerUsageIden::EffectivenessRating, threshold),
        &[(FertilizerUsageIden::EffectivenessRating, Order::Asc)],
    )
}

pub fn count_fertilizer_rated_at_least(conn: &Connection, rating: i32) -> Result<u64> {
    base::count_where::<FertilizerUsage>(
        conn,
        Filter::all().gte(FertilizerUsageIden::EffectivenessRating, rating),
    )
}

/// Rated applications, best rated first with cheaper ones breaking ties
pub fn find_top_performing_fertilizer(
    conn: &Connection,
    page: PageRequest,
) -> Result<Page<FertilizerUsage>> {
    base::find_page_where(
        conn,
        Filter::all().is_not_null(FertilizerUsageIden::EffectivenessRating),
        &[
            (FertilizerUsageIden::EffectivenessRating, Order::Desc),
            (FertilizerUsageIden::TotalCost, Order::Asc),
        ],
        page,
    )
}

/// Costed applications ordered by total cost per unit applied, cheapest first
pub fn find_most_cost_effective_fertilizer(
    conn: &Connection,
    page: PageRequest,
) -> Result<Page<FertilizerUsage>> {
    let filter = Filter::all()
        .is_not_null(FertilizerUsageIden::TotalCost)
        .gt(FertilizerUsageIden::Quantity, 0.0);
    let mut stmt = base::select_where::<FertilizerUsage>(filter, &[]);
    stmt.order_by_expr(
        Expr::col(FertilizerUsageIden::TotalCost).div(Expr::col(FertilizerUsageIden::Quantity)),
        Order::Asc,
    );
    query::fetch_page(conn, &stmt, page)
}

/// Applications nobody has rated yet
pub fn find_unrated_fertilizer_usage(conn: &Connection) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().is_null(FertilizerUsageIden::EffectivenessRating),
        NEWEST_FIRST,
    )
}

pub fn find_fertilizer_usage_by_supplier_paged(
    conn: &Connection,
    supplier: &str,
    page: PageRequest,
) -> Result<Page<FertilizerUsage>> {
    base::find_page_where(conn, supplied_by(supplier), NEWEST_FIRST, page)
}

pub fn find_fertilizer_usage_by_supplier_applied_between(
    conn: &Connection,
    supplier: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        supplied_by(supplier).and(applied_between(from, to)),
        NEWEST_FIRST,
    )
}

pub fn count_fertilizer_usage_by_supplier(conn: &Connection, supplier: &str) -> Result<u64> {
    base::count_where::<FertilizerUsage>(conn, supplied_by(supplier))
}

pub fn find_fertilizer_usage_by_supplier(
    conn: &Connection,
    supplier: &str,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(conn, supplied_by(supplier), NEWEST_FIRST)
}

/// Applications whose product expired strictly before `date`
pub fn find_expired_fertilizer(conn: &Connection, date: NaiveDate) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        expired_before(date),
        &[(FertilizerUsageIden::ExpiryDate, Order::Asc)],
    )
}

/// Number of applications whose product expired before `today`
pub fn count_expired_fertilizer(conn: &Connection, today: NaiveDate) -> Result<u64> {
    base::count_where::<FertilizerUsage>(conn, expired_before(today))
}

pub fn find_fertilizer_without_expiry(conn: &Connection) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().is_null(FertilizerUsageIden::ExpiryDate),
        NEWEST_FIRST,
    )
}

pub fn find_fertilizer_expiring_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<FertilizerUsage>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(FertilizerUsageIden::ExpiryDate, codec::date(from), codec::date(to)),
        &[(FertilizerUsageIden::ExpiryDate, Order::Asc)],
    )
}

/// Applications rated at least `min_effectiveness` that cost at most
/// `max_cost_per_unit`, best rated first
pub fn find_effective_affordable_fertilizer(
    conn: &Connection,
    min_effectiveness: i32,
    max_cost_per_unit: f64,
) -> Result<Vec<FertilizerUsage>> {
    let filter = Filter::all()
        .gte(FertilizerUsageIden::EffectivenessRating, min_effectiveness)
        .lte(FertilizerUsageIden::CostPerUnit, max_cost_per_unit);
    base::find_where_ordered(
        conn,
        filter,
        &[
            (FertilizerUsageIden::EffectivenessRating, Order::Desc),
            (FertilizerUsageIden::CostPerUnit, Order::Asc),
        ],
    )
}

/// Cost summed over a production's applications; 0 when none was costed
pub fn total_fertilizer_cost_by_production(
    conn: &Connection,
    crop_production_id: &str,
) -> Result<f64> {
    let total = base::aggregate::<FertilizerUsage>(
        conn,
        Aggregate::Sum,
        FertilizerUsageIden::TotalCost,
        by_production(crop_production_id),
    )?;
    Ok(total.unwrap_or(0.0))
}

/// Quantity applied to a production, per unit of measure
pub fn total_fertilizer_quantity_by_production(
    conn: &Connection,
    crop_production_id: &str,
) -> Result<Vec<(FertilizerUnit, f64)>> {
    let totals = base::aggregate_grouped::<FertilizerUsage, FertilizerUnit>(
        conn,
        Aggregate::Sum,
        FertilizerUsageIden::Unit,
        FertilizerUsageIden::Quantity,
        by_production(crop_production_id),
    )?;
    Ok(totals
        .into_iter()
        .map(|(unit, total)| (unit, total.unwrap_or(0.0)))
        .collect())
}

/// Quantity of one fertilizer type applied in `unit`; 0 when none
pub fn total_quantity_by_type_and_unit(
    conn: &Connection,
    fertilizer_type: FertilizerType,
    unit: FertilizerUnit,
) -> Result<f64> {
    let total = base::aggregate::<FertilizerUsage>(
        conn,
        Aggregate::Sum,
        FertilizerUsageIden::Quantity,
        of_type(fertilizer_type).eq(FertilizerUsageIden::Unit, unit),
    )?;
    Ok(total.unwrap_or(0.0))
}

pub fn total_cost_by_fertilizer_type(
    conn: &Connection,
    fertilizer_type: FertilizerType,
) -> Result<f64> {
    let total = base::aggregate::<FertilizerUsage>(
        conn,
        Aggregate::Sum,
        FertilizerUsageIden::TotalCost,
        of_type(fertilizer_type),
    )?;
    Ok(total.unwrap_or(0.0))
}

pub fn average_unit_cost_by_fertilizer_type(
    conn: &Connection,
    fertilizer_type: FertilizerType,
) -> Result<Option<f64>> {
    base::aggregate::<FertilizerUsage>(
        conn,
        Aggregate::Avg,
        FertilizerUsageIden::CostPerUnit,
        of_type(fertilizer_type),
    )
}

/// Mean total cost over costed applications
pub fn average_fertilizer_cost(conn: &Connection) -> Result<Option<f64>> {
    base::aggregate::<FertilizerUsage>(
        conn,
        Aggregate::Avg,
        FertilizerUsageIden::TotalCost,
        Filter::all(),
    )
}

pub fn average_effectiveness_by_fertilizer_type(
    conn: &Connection,
) -> Result<Vec<(FertilizerType, Option<f64>)>> {
    base::aggregate_grouped::<FertilizerUsage, _>(
        conn,
        Aggregate::Avg,
        FertilizerUsageIden::FertilizerType,
        FertilizerUsageIden::EffectivenessRating,
        Filter::all(),
    )
}

/// Application counts, mean rating and totals per fertilizer type, best
/// rated first; unrated types sort last
pub fn fertilizer_performance_by_type(conn: &Connection) -> Result<Vec<FertilizerPerformance>> {
    let average = Alias::new("average_effectiveness");
    let stmt = Query::select()
        .column(FertilizerUsageIden::FertilizerType)
        .expr(Func::count(Expr::col(Asterisk)))
        .expr_as(
            Func::avg(Expr::col(FertilizerUsageIden::EffectivenessRating)),
            average.clone(),
        )
        .expr(zero_sum(FertilizerUsageIden::Quantity))
        .expr(zero_sum(FertilizerUsageIden::TotalCost))
        .from(FertilizerUsageIden::Table)
        .group_by_col(FertilizerUsageIden::FertilizerType)
        .order_by(average, Order::Desc)
        .order_by(FertilizerUsageIden::FertilizerType, Order::Asc)
        .to_owned();

    query::fetch_rows(conn, &stmt, |row| {
        let applications: i64 = row.get(1)?;
        Ok(FertilizerPerformance {
            fertilizer_type: row.get(0)?,
            applications: applications.max(0) as u64,
            average_effectiveness: row.get(2)?,
            total_quantity: row.get(3)?,
            total_cost: row.get(4)?,
        })
    })
}

/// Applications per month within `[from, to]`, earliest month first
pub fn monthly_fertilizer_usage(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<MonthlyUsage>> {
    let month = Alias::new("month");
    let stmt = Query::select()
        .expr_as(
            Func::cust(Alias::new("substr"))
                .arg(Expr::col(FertilizerUsageIden::ApplicationDate))
                .arg(1)
                .arg(7),
            month.clone(),
        )
        .expr(Func::count(Expr::col(Asterisk)))
        .expr(zero_sum(FertilizerUsageIden::Quantity))
        .expr(zero_sum(FertilizerUsageIden::TotalCost))
        .from(FertilizerUsageIden::Table)
        .cond_where(applied_between(from, to))
        .group_by_col(month.clone())
        .order_by(month, Order::Asc)
        .to_owned();

    query::fetch_rows(conn, &stmt, |row| {
        let applications: i64 = row.get(1)?;
        Ok(MonthlyUsage {
            month: row.get(0)?,
            applications: applications.max(0) as u64,
            total_quantity: row.get(2)?,
            total_cost: row.get(3)?,
        })
    })
}

pub fn distinct_fertilizer_names(conn: &Connection) -> Result<Vec<String>> {
    distinct(conn, FertilizerUsageIden::FertilizerName)
}

pub fn distinct_fertilizer_brands(conn: &Connection) -> Result<Vec<String>> {
    distinct(conn, FertilizerUsageIden::Brand)
}

pub fn distinct_fertilizer_suppliers(conn: &Connection) -> Result<Vec<String>> {
    distinct(conn, FertilizerUsageIden::Supplier)
}

pub fn distinct_application_stages(conn: &Connection) -> Result<Vec<String>> {
    distinct(conn, FertilizerUsageIden::ApplicationStage)
}

pub fn distinct_fertilizer_operators(conn: &Connection) -> Result<Vec<String>> {
    distinct(conn, FertilizerUsageIden::OperatorName)
}

pub fn find_fertilizer_usage_with_filters(
    conn: &Connection,
    filter: &FertilizerUsageFilter,
    page: PageRequest,
) -> Result<Page<FertilizerUsage>> {
    base::find_page_where(conn, filter.to_filter(), NEWEST_FIRST, page)
}

pub fn delete_fertilizer_usage_by_production(
    conn: &Connection,
    crop_production_id: &str,
) -> Result<usize> {
    let deleted = base::delete_where::<FertilizerUsage>(conn, by_production(crop_production_id))?;
    info!(deleted, crop_production_id, "deleted fertilizer usage of production");
    Ok(deleted)
}

/// Delete applications whose product expired strictly before `today`
pub fn delete_expired_fertilizer(conn: &Connection, today: NaiveDate) -> Result<usize> {
    let deleted = base::delete_where::<FertilizerUsage>(conn, expired_before(today))?;
    info!(deleted, %today, "deleted expired fertilizer usage");
    Ok(deleted)
}

/// Delete applications made strictly before `cutoff`
pub fn delete_fertilizer_applied_before(conn: &Connection, cutoff: NaiveDate) -> Result<usize> {
    let deleted = base::delete_where::<FertilizerUsage>(
        conn,
        Filter::all().lt(FertilizerUsageIden::ApplicationDate, codec::date(cutoff)),
    )?;
    info!(deleted, %cutoff, "deleted old fertilizer usage");
    Ok(deleted)
}

fn distinct(conn: &Connection, col: FertilizerUsageIden) -> Result<Vec<String>> {
    base::distinct_values::<FertilizerUsage, _>(conn, col, Filter::all(), Order::Asc)
}

fn zero_sum(col: FertilizerUsageIden) -> SimpleExpr {
    Func::coalesce([Func::sum(Expr::col(col)).into(), Expr::val(0.0).into()]).into()
}

fn by_production(crop_production_id: &str) -> Filter {
    Filter::all().eq(FertilizerUsageIden::CropProductionId, crop_production_id)
}

fn on_farm(farm_id: &str) -> Filter {
    let productions = Query::select()
        .column(CropProductionIden::Id)
        .from(CropProductionIden::Table)
        .and_where(Expr::col(CropProductionIden::FarmId).eq(farm_id))
        .to_owned();
    Filter::all().and(Expr::col(FertilizerUsageIden::CropProductionId).in_subquery(productions))
}

fn of_type(fertilizer_type: FertilizerType) -> Filter {
    Filter::all().eq(FertilizerUsageIden::FertilizerType, fertilizer_type)
}

fn applied_by(method: ApplicationMethod) -> Filter {
    Filter::all().eq(FertilizerUsageIden::ApplicationMethod, method)
}

fn supplied_by(supplier: &str) -> Filter {
    Filter::all().eq_ignore_case(FertilizerUsageIden::Supplier, supplier)
}

fn expired_before(date: NaiveDate) -> Filter {
    Filter::all().lt(FertilizerUsageIden::ExpiryDate, codec::date(date))
}

fn applied_between(from: NaiveDate, to: NaiveDate) -> Filter {
    Filter::all().between(
        FertilizerUsageIden::ApplicationDate,
        codec::date(from),
        codec::date(to),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::CropProduction;
    use crate::db::create_test_database;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn usage(production: &str, kind: FertilizerType, quantity: f64, applied: NaiveDate) -> FertilizerUsage {
        FertilizerUsage::new(
            production,
            kind,
            format!("{kind} mix"),
            quantity,
            FertilizerUnit::Kg,
            applied,
            ApplicationMethod::Broadcast,
        )
    }

    #[test]
    fn test_by_farm_uses_production_ownership() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mine = CropProduction::new("farm-1", "crop-1", "CP-1", day(2, 1), 1.0, 2024);
        let theirs = CropProduction::new("farm-2", "crop-1", "CP-2", day(2, 1), 1.0, 2024);
        base::save_all(&conn, &[mine.clone(), theirs.clone()]).unwrap();
        base::save_all(
            &conn,
            &[
                usage(&mine.id, FertilizerType::Npk, 50.0, day(3, 1)),
                usage(&mine.id, FertilizerType::Organic, 20.0, day(4, 1)),
                usage(&theirs.id, FertilizerType::Npk, 10.0, day(3, 1)),
            ],
        )
        .unwrap();

        let page = find_fertilizer_usage_by_farm(&conn, "farm-1", PageRequest::first(10)).unwrap();
        assert_eq!(page.total_elements, 2);
        assert!(page.content.iter().all(|u| u.crop_production_id == mine.id));
        assert!(find_fertilizer_usage_by_farm(&conn, "farm-9", PageRequest::first(10)).unwrap().is_empty());

        assert_eq!(delete_fertilizer_usage_by_production(&conn, &theirs.id).unwrap(), 1);
    }

    #[test]
    fn test_performance_and_monthly_usage() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut a = usage("cp-1", FertilizerType::Npk, 50.0, day(3, 5));
        a.effectiveness_rating = Some(4);
        a.total_cost = Some(40_000.0);
        let mut b = usage("cp-1", FertilizerType::Npk, 30.0, day(3, 20));
        b.effectiveness_rating = Some(2);
        let mut c = usage("cp-1", FertilizerType::Organic, 100.0, day(4, 2));
        c.effectiveness_rating = Some(5);
        c.total_cost = Some(10_000.0);
        let unrated = usage("cp-1", FertilizerType::Potash, 5.0, day(4, 3));
        base::save_all(&conn, &[a, b, c, unrated]).unwrap();

        let performance = fertilizer_performance_by_type(&conn).unwrap();
        let order: Vec<_> = performance.iter().map(|p| p.fertilizer_type).collect();
        assert_eq!(order, vec![FertilizerType::Organic, FertilizerType::Npk, FertilizerType::Potash]);
        assert_eq!(performance[1].applications, 2);
        assert_eq!(performance[1].average_effectiveness, Some(3.0));
        assert_eq!(performance[1].total_quantity, 80.0);
        assert_eq!(performance[1].total_cost, 40_000.0);
        assert_eq!(performance[2].average_effectiveness, None);

        let monthly = monthly_fertilizer_usage(&conn, day(1, 1), day(12, 31)).unwrap();
        assert_eq!(monthly.len(), 2);
        assert_eq!(monthly[0].month, "2024-03");
        assert_eq!(monthly[0].applications, 2);
        assert_eq!(monthly[1].total_quantity, 105.0);

        assert_eq!(total_fertilizer_cost_by_production(&conn, "cp-1").unwrap(), 50_000.0);
        assert_eq!(
            total_fertilizer_quantity_by_production(&conn, "cp-1").unwrap(),
            vec![(FertilizerUnit::Kg, 185.0)]
        );
        assert_eq!(find_unrated_fertilizer_usage(&conn).unwrap().len(), 1);
        assert_eq!(find_fertilizer_by_effectiveness_between(&conn, 4, 5).unwrap().len(), 2);
    }

    #[test]
    fn test_quantity_expiry_and_affordability() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut cheap = usage("cp-1", FertilizerType::Npk, 10.0, day(5, 1));
        cheap.cost_per_unit = Some(800.0);
        cheap.effectiveness_rating = Some(4);
        cheap.expiry_date = Some(day(6, 1));
        cheap.supplier = Some("Agro Supplies".to_string());
        cheap.brand = Some("Yara".to_string());
        let mut pricey = usage("cp-1", FertilizerType::Npk, 20.0, day(5, 2));
        pricey.cost_per_unit = Some(1500.0);
        pricey.effectiveness_rating = Some(5);
        pricey.expiry_date = Some(day(12, 1));
        base::save_all(&conn, &[cheap, pricey]).unwrap();

        assert_eq!(find_effective_affordable_fertilizer(&conn, 4, 1000.0).unwrap().len(), 1);
        assert_eq!(find_expired_fertilizer(&conn, day(7, 1)).unwrap().len(), 1);
        assert_eq!(find_fertilizer_expiring_between(&conn, day(11, 1), day(12, 31)).unwrap().len(), 1);
        assert_eq!(find_fertilizer_above_quantity(&conn, 10.0).unwrap().len(), 1);
        assert_eq!(find_fertilizer_below_quantity(&conn, 20.0).unwrap().len(), 1);
        assert_eq!(find_fertilizer_by_quantity_between(&conn, 10.0, 20.0).unwrap().len(), 2);
        assert_eq!(find_fertilizer_usage_by_supplier(&conn, "agro supplies").unwrap().len(), 1);
        assert_eq!(distinct_fertilizer_brands(&conn).unwrap(), vec!["Yara".to_string()]);
        assert_eq!(distinct_fertilizer_names(&conn).unwrap(), vec!["NPK mix".to_string()]);

        let filter = FertilizerUsageFilter {
            min_effectiveness: Some(5),
            ..FertilizerUsageFilter::default()
        };
        let page = find_fertilizer_usage_with_filters(&conn, &filter, PageRequest::first(5)).unwrap();
        assert_eq!(page.total_elements, 1);
        let unfiltered = find_fertilizer_usage_with_filters(
            &conn,
            &FertilizerUsageFilter::default(),
            PageRequest::first(50),
        )
        .unwrap();
        assert_eq!(unfiltered.total_elements, base::count_all::<FertilizerUsage>(&conn).unwrap());

        assert_eq!(delete_fertilizer_applied_before(&conn, day(5, 2)).unwrap(), 1);
    }

    /// Two costed applications on cp-1 and an uncosted one on cp-2;
    /// returns the id of the NPK application on cp-1
    fn seed(conn: &Connection) -> String {
        let mut npk = usage("cp-1", FertilizerType::Npk, 50.0, day(3, 1));
        npk.supplier = Some("Agro Supplies".to_string());
        npk.brand = Some("Yara".to_string());
        npk.batch_number = Some("B-100".to_string());
        npk.operator_name = Some("Jean".to_string());
        npk.application_stage = Some("Planting".to_string());
        npk.total_cost = Some(40_000.0);
        npk.cost_per_unit = Some(800.0);
        npk.effectiveness_rating = Some(4);
        npk.expiry_date = Some(day(2, 1));
        let mut compost = usage("cp-1", FertilizerType::Organic, 100.0, day(3, 15));
        compost.application_method = ApplicationMethod::Band;
        compost.supplier = Some("agro supplies".to_string());
        compost.application_stage = Some("Top dressing".to_string());
        compost.total_cost = Some(10_000.0);
        compost.cost_per_unit = Some(100.0);
        compost.effectiveness_rating = Some(2);
        compost.expiry_date = Some(day(6, 1));
        let mut foliar = usage("cp-2", FertilizerType::Npk, 20.0, day(4, 1));
        foliar.application_method = ApplicationMethod::Foliar;
        foliar.unit = FertilizerUnit::Liters;
        foliar.supplier = Some("Green Farm".to_string());
        let id = npk.id.clone();
        base::save_all(conn, &[npk, compost, foliar]).unwrap();
        id
    }

    #[test]
    fn test_lookups_by_type_method_and_supplier() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let npk_id = seed(&conn);

        let first = PageRequest::first(1);
        let npk = find_fertilizer_usage_by_type_paged(&conn, FertilizerType::Npk, first).unwrap();
        assert_eq!(npk.total_elements, 2);
        assert_eq!(npk.content[0].crop_production_id, "cp-2");
        let on_cp1 = find_fertilizer_usage_by_production_and_type(&conn, "cp-1", FertilizerType::Npk);
        assert_eq!(on_cp1.unwrap().len(), 1);
        let (from, to) = (day(3, 1), day(3, 31));
        let march = find_fertilizer_usage_by_type_applied_between(&conn, FertilizerType::Npk, from, to);
        assert_eq!(march.unwrap().len(), 1);
        assert_eq!(count_fertilizer_usage_by_type(&conn, FertilizerType::Npk).unwrap(), 2);

        let band =
            find_fertilizer_usage_by_method_paged(&conn, ApplicationMethod::Band, PageRequest::first(5));
        assert_eq!(band.unwrap().total_elements, 1);
        let foliar =
            find_fertilizer_usage_by_production_and_method(&conn, "cp-2", ApplicationMethod::Foliar);
        assert_eq!(foliar.unwrap().len(), 1);
        assert_eq!(count_fertilizer_usage_by_method(&conn, ApplicationMethod::Broadcast).unwrap(), 1);

        assert_eq!(find_fertilizer_by_name(&conn, "npk").unwrap().len(), 2);
        assert_eq!(find_fertilizer_by_brand(&conn, "yara").unwrap().len(), 1);
        assert_eq!(find_fertilizer_by_name_and_brand(&conn, "npk mix", "YARA").unwrap().len(), 1);
        assert_eq!(find_fertilizer_by_application_stage(&conn, "dressing").unwrap().len(), 1);
        assert_eq!(find_fertilizer_by_operator(&conn, "jean").unwrap().len(), 1);
        assert_eq!(find_fertilizer_by_batch_number(&conn, "b-1").unwrap().len(), 1);
        let batch = find_fertilizer_by_batch_and_supplier(&conn, "B-100", "AGRO SUPPLIES");
        assert!(batch.unwrap().is_some());
        let elsewhere = find_fertilizer_by_batch_and_supplier(&conn, "B-100", "Green Farm");
        assert!(elsewhere.unwrap().is_none());

        let supplied =
            find_fertilizer_usage_by_supplier_paged(&conn, "Agro Supplies", PageRequest::first(5));
        assert_eq!(supplied.unwrap().total_elements, 2);
        let late_march = find_fertilizer_usage_by_supplier_applied_between(
            &conn,
            "Agro Supplies",
            day(3, 10),
            day(3, 31),
        );
        assert_eq!(late_march.unwrap().len(), 1);
        assert_eq!(count_fertilizer_usage_by_supplier(&conn, "agro supplies").unwrap(), 2);

        assert_eq!(count_fertilizer_usage_by_production(&conn, "cp-1").unwrap(), 2);
        assert!(find_fertilizer_usage_in_production(&conn, &npk_id, "cp-1").unwrap().is_some());
        assert!(find_fertilizer_usage_in_production(&conn, &npk_id, "cp-2").unwrap().is_none());
        let both =
            find_fertilizer_usage_by_productions(&conn, &["cp-1", "cp-2"], PageRequest::first(10));
        assert_eq!(both.unwrap().total_elements, 3);
        let none = find_fertilizer_usage_by_productions(&conn, &["cp-9"], PageRequest::first(10));
        assert!(none.unwrap().is_empty());

        assert_eq!(find_fertilizer_applied_on(&conn, day(3, 15)).unwrap().len(), 1);
        assert_eq!(find_fertilizer_applied_after(&conn, day(3, 1)).unwrap().len(), 2);
        assert_eq!(find_fertilizer_applied_before(&conn, day(3, 15)).unwrap().len(), 1);
        assert_eq!(find_recent_fertilizer_usage(&conn, day(3, 15)).unwrap().len(), 2);
        assert_eq!(
            distinct_application_stages(&conn).unwrap(),
            vec!["Planting".to_string(), "Top dressing".to_string()]
        );
        assert_eq!(distinct_fertilizer_operators(&conn).unwrap(), vec!["Jean".to_string()]);
    }

    #[test]
    fn test_cost_rating_and_expiry_rollups() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        seed(&conn);
        let types = |rows: Vec<FertilizerUsage>| -> Vec<FertilizerType> {
            rows.into_iter().map(|u| u.fertilizer_type).collect()
        };

        let high = find_high_cost_fertilizer(&conn, 20_000.0).unwrap();
        assert_eq!(types(high), [FertilizerType::Npk]);
        let low = find_low_cost_fertilizer(&conn, 20_000.0).unwrap();
        assert_eq!(types(low), [FertilizerType::Organic]);
        assert_eq!(find_fertilizer_above_unit_cost(&conn, 500.0).unwrap().len(), 1);
        let weak = find_low_effectiveness_fertilizer(&conn, 2).unwrap();
        assert_eq!(types(weak), [FertilizerType::Organic]);
        assert_eq!(count_fertilizer_rated_at_least(&conn, 2).unwrap(), 2);
        assert_eq!(count_fertilizer_rated_at_least(&conn, 5).unwrap(), 0);

        let top = find_top_performing_fertilizer(&conn, PageRequest::first(5)).unwrap();
        assert_eq!(top.total_elements, 2);
        assert_eq!(types(top.content), [FertilizerType::Npk, FertilizerType::Organic]);
        let thrifty = find_most_cost_effective_fertilizer(&conn, PageRequest::first(5)).unwrap();
        assert_eq!(thrifty.total_elements, 2);
        assert_eq!(types(thrifty.content), [FertilizerType::Organic, FertilizerType::Npk]);

        let npk_kg = total_quantity_by_type_and_unit(&conn, FertilizerType::Npk, FertilizerUnit::Kg);
        assert_eq!(npk_kg.unwrap(), 50.0);
        let npk_liters =
            total_quantity_by_type_and_unit(&conn, FertilizerType::Npk, FertilizerUnit::Liters);
        assert_eq!(npk_liters.unwrap(), 20.0);
        let potash = total_quantity_by_type_and_unit(&conn, FertilizerType::Potash, FertilizerUnit::Kg);
        assert_eq!(potash.unwrap(), 0.0);
        assert_eq!(total_cost_by_fertilizer_type(&conn, FertilizerType::Npk).unwrap(), 40_000.0);
        let unit_cost = average_unit_cost_by_fertilizer_type(&conn, FertilizerType::Npk).unwrap();
        assert_eq!(unit_cost, Some(800.0));
        assert_eq!(average_fertilizer_cost(&conn).unwrap(), Some(25_000.0));
        assert_eq!(count_fertilizer_usage_by_farm(&conn, "farm-9").unwrap(), 0);

        let filter = FertilizerUsageFilter {
            min_cost: Some(20_000.0),
            ..FertilizerUsageFilter::default()
        };
        let costly = find_fertilizer_usage_with_filters(&conn, &filter, PageRequest::first(5)).unwrap();
        assert_eq!(costly.total_elements, 1);

        assert_eq!(count_expired_fertilizer(&conn, day(3, 1)).unwrap(), 1);
        assert_eq!(find_fertilizer_without_expiry(&conn).unwrap().len(), 1);
        assert_eq!(delete_expired_fertilizer(&conn, day(3, 1)).unwrap(), 1);
        assert_eq!(base::count_all::<FertilizerUsage>(&conn).unwrap(), 2);
    }
}
