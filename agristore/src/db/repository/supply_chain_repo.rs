//! Repository for supply chain stages of a crop production

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use sea_query::{Alias, Expr, Func, Order, SimpleExpr};
use serde::Serialize;
use tracing::info;

use crate::db::models::{QualityStatus, SupplyChain, SupplyChainIden, SupplyChainStage};
use crate::db::query::{codec, Filter, Page, PageRequest};
use crate::db::repository::base::{self, Aggregate};
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct SupplyChainFilter {
    pub crop_production_id: Option<String>,
    pub stage: Option<SupplyChainStage>,
    pub quality_status: Option<QualityStatus>,
    pub responsible_party: Option<String>,
    pub insured: Option<bool>,
}

impl SupplyChainFilter {
    fn to_filter(&self) -> Filter {
        Filter::all()
            .eq_opt(SupplyChainIden::CropProductionId, self.crop_production_id.as_deref())
            .eq_opt(SupplyChainIden::Stage, self.stage)
            .eq_opt(SupplyChainIden::QualityStatus, self.quality_status)
            .contains_opt(SupplyChainIden::ResponsibleParty, self.responsible_party.as_deref())
            .eq_opt(SupplyChainIden::InsuranceCoverage, self.insured)
    }
}

/// Quantities summed over every stage of a production
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionFlow {
    pub quantity_in: f64,
    pub quantity_out: f64,
    pub loss_quantity: f64,
}

const BY_STAGE_ORDER: &[(SupplyChainIden, Order)] = &[(SupplyChainIden::StageOrder, Order::Asc)];

const NEWEST_FIRST: &[(SupplyChainIden, Order)] = &[(SupplyChainIden::CreatedAt, Order::Desc)];

const PROCESSING_STAGES: [SupplyChainStage; 2] =
    [SupplyChainStage::Processing, SupplyChainStage::Packaging];

const LOGISTICS_STAGES: [SupplyChainStage; 2] =
    [SupplyChainStage::Transport, SupplyChainStage::Distribution];

pub fn find_supply_chain_by_tracking_code(
    conn: &Connection,
    tracking_code: &str,
) -> Result<Option<SupplyChain>> {
    base::find_one_where(conn, by_tracking_code(tracking_code))
}

pub fn exists_supply_chain_by_tracking_code(conn: &Connection, tracking_code: &str) -> Result<bool> {
    base::exists_where::<SupplyChain>(conn, by_tracking_code(tracking_code))
}

pub fn find_supply_chain_by_transaction(
    conn: &Connection,
    transaction_id: &str,
) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(SupplyChainIden::TransactionId, transaction_id),
        BY_STAGE_ORDER,
    )
}

/// Stages of one production in stage order
pub fn find_supply_chain_by_crop_production(
    conn: &Connection,
    crop_production_id: &str,
) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(conn, by_production(crop_production_id), BY_STAGE_ORDER)
}

pub fn find_supply_chain_by_crop_production_paged(
    conn: &Connection,
    crop_production_id: &str,
    page: PageRequest,
) -> Result<Page<SupplyChain>> {
    base::find_page_where(conn, by_production(crop_production_id), BY_STAGE_ORDER, page)
}

pub fn find_supply_chain_by_production_and_stage(
    conn: &Connection,
    crop_production_id: &str,
    stage: SupplyChainStage,
) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(
        conn,
        by_production(crop_production_id).eq(SupplyChainIden::Stage, stage),
        BY_STAGE_ORDER,
    )
}

/// The stage of a production at position `stage_order`
pub fn find_stage_by_order(
    conn: &Connection,
    crop_production_id: &str,
    stage_order: i32,
) -> Result<Option<SupplyChain>> {
    base::find_one_where(conn, at_order(crop_production_id, stage_order))
}

pub fn exists_stage_order_for_production(
    conn: &Connection,
    crop_production_id: &str,
    stage_order: i32,
) -> Result<bool> {
    base::exists_where::<SupplyChain>(conn, at_order(crop_production_id, stage_order))
}

pub fn exists_supply_chain_for_transaction(
    conn: &Connection,
    transaction_id: &str,
) -> Result<bool> {
    base::exists_where::<SupplyChain>(
        conn,
        Filter::all().eq(SupplyChainIden::TransactionId, transaction_id),
    )
}

pub fn find_stages_by_order_between(
    conn: &Connection,
    min_order: i32,
    max_order: i32,
) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(SupplyChainIden::StageOrder, min_order, max_order),
        BY_STAGE_ORDER,
    )
}

pub fn find_stages_started_between(
    conn: &Connection,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(SupplyChainIden::StageStartDate, codec::ts(from), codec::ts(to)),
        &[(SupplyChainIden::StageStartDate, Order::Asc)],
    )
}

pub fn find_stages_ended_between(
    conn: &Connection,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(SupplyChainIden::StageEndDate, codec::ts(from), codec::ts(to)),
        &[(SupplyChainIden::StageEndDate, Order::Asc)],
    )
}

/// Stages that had started by `at` and had not ended before it
pub fn find_active_stages_at(conn: &Connection, at: DateTime<Utc>) -> Result<Vec<SupplyChain>> {
    let filter = Filter::all()
        .lte(SupplyChainIden::StageStartDate, codec::ts(at))
        .any_of(
            Filter::any()
                .is_null(SupplyChainIden::StageEndDate)
                .gte(SupplyChainIden::StageEndDate, codec::ts(at)),
        );
    base::find_where_ordered(conn, filter, BY_STAGE_ORDER)
}

pub fn find_supply_chain_by_stage(
    conn: &Connection,
    stage: SupplyChainStage,
    page: PageRequest,
) -> Result<Page<SupplyChain>> {
    base::find_page_where(conn, Filter::all().eq(SupplyChainIden::Stage, stage), NEWEST_FIRST, page)
}

/// Stages that have not ended yet
pub fn find_incomplete_stages(conn: &Connection) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(conn, incomplete(), BY_STAGE_ORDER)
}

pub fn find_incomplete_stages_by_production(
    conn: &Connection,
    crop_production_id: &str,
) -> Result<Vec<SupplyChain>> {
    let filter = by_production(crop_production_id).and(incomplete());
    base::find_where_ordered(conn, filter, BY_STAGE_ORDER)
}

pub fn count_incomplete_stages(conn: &Connection) -> Result<u64> {
    base::count_where::<SupplyChain>(conn, incomplete())
}

pub fn count_incomplete_stages_by_production(
    conn: &Connection,
    crop_production_id: &str,
) -> Result<u64> {
    base::count_where::<SupplyChain>(conn, by_production(crop_production_id).and(incomplete()))
}

/// Completed stages that took strictly longer than `hours`
pub fn find_long_duration_stages(conn: &Connection, hours: f64) -> Result<Vec<SupplyChain>> {
    let filter = completed().and(Expr::expr(duration_hours()).gt(hours));
    base::find_where_ordered(conn, filter, BY_STAGE_ORDER)
}

/// Completed stages that took at most `hours`
pub fn find_short_duration_stages(conn: &Connection, hours: f64) -> Result<Vec<SupplyChain>> {
    let filter = completed().and(Expr::expr(duration_hours()).lte(hours));
    base::find_where_ordered(conn, filter, BY_STAGE_ORDER)
}

pub fn find_completed_stages(conn: &Connection) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(conn, completed(), &[(SupplyChainIden::StageEndDate, Order::Desc)])
}

/// Stages whose quality was rated POOR or REJECTED
pub fn find_quality_issues(conn: &Connection) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(conn, quality_issue(), NEWEST_FIRST)
}

pub fn find_quality_issues_by_production(
    conn: &Connection,
    crop_production_id: &str,
) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(
        conn,
        by_production(crop_production_id).and(quality_issue()),
        BY_STAGE_ORDER,
    )
}

pub fn count_quality_issues(conn: &Connection) -> Result<u64> {
    base::count_where::<SupplyChain>(conn, quality_issue())
}

pub fn count_quality_issues_by_production(
    conn: &Connection,
    crop_production_id: &str,
) -> Result<u64> {
    base::count_where::<SupplyChain>(conn, by_production(crop_production_id).and(quality_issue()))
}

/// Stages rated EXCELLENT or GOOD
pub fn find_good_quality_stages(conn: &Connection) -> Result<Vec<SupplyChain>> {
    let filter = Filter::all().is_in(
        SupplyChainIden::QualityStatus,
        [QualityStatus::Excellent, QualityStatus::Good],
    );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

pub fn find_supply_chain_by_quality_status(
    conn: &Connection,
    status: QualityStatus,
    page: PageRequest,
) -> Result<Page<SupplyChain>> {
    base::find_page_where(
        conn,
        Filter::all().eq(SupplyChainIden::QualityStatus, status),
        NEWEST_FIRST,
        page,
    )
}

pub fn find_supply_chain_by_production_and_quality(
    conn: &Connection,
    crop_production_id: &str,
    status: QualityStatus,
) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(
        conn,
        by_production(crop_production_id).eq(SupplyChainIden::QualityStatus, status),
        BY_STAGE_ORDER,
    )
}

/// Stages with a positive loss quantity
pub fn find_stages_with_losses(conn: &Connection) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(conn, with_losses(), NEWEST_FIRST)
}

pub fn find_stages_with_losses_by_production(
    conn: &Connection,
    crop_production_id: &str,
) -> Result<Vec<SupplyChain>> {
    let filter = by_production(crop_production_id).and(with_losses());
    base::find_where_ordered(conn, filter, BY_STAGE_ORDER)
}

pub fn count_stages_with_losses(conn: &Connection) -> Result<u64> {
    base::count_where::<SupplyChain>(conn, with_losses())
}

pub fn count_stages_with_losses_by_production(
    conn: &Connection,
    crop_production_id: &str,
) -> Result<u64> {
    base::count_where::<SupplyChain>(conn, by_production(crop_production_id).and(with_losses()))
}

pub fn find_high_loss_stages_by_production(
    conn: &Connection,
    crop_production_id: &str,
    threshold: f64,
) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(
        conn,
        by_production(crop_production_id).gt(SupplyChainIden::LossPercentage, threshold),
        BY_STAGE_ORDER,
    )
}

/// Stages whose output over input ratio is strictly below `threshold`
pub fn find_low_efficiency_stages(conn: &Connection, threshold: f64) -> Result<Vec<SupplyChain>> {
    let filter = with_input().and(Expr::expr(efficiency()).lt(threshold));
    base::find_where_ordered(conn, filter, BY_STAGE_ORDER)
}

/// Stages whose output over input ratio is at least `threshold`
pub fn find_high_efficiency_stages(conn: &Connection, threshold: f64) -> Result<Vec<SupplyChain>> {
    let filter = with_input().and(Expr::expr(efficiency()).gte(threshold));
    base::find_where_ordered(conn, filter, BY_STAGE_ORDER)
}

/// Stages that lost strictly more than `threshold` percent
pub fn find_high_loss_stages(conn: &Connection, threshold: f64) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(
        conn,
        Filter::all().gt(SupplyChainIden::LossPercentage, threshold),
        &[(SupplyChainIden::LossPercentage, Order::Desc)],
    )
}

pub fn find_stages_by_cost_between(
    conn: &Connection,
    min: f64,
    max: f64,
) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(SupplyChainIden::CostIncurred, min, max),
        &[(SupplyChainIden::CostIncurred, Order::Asc)],
    )
}

/// Stages that cost strictly more than `threshold`
pub fn find_high_cost_stages(conn: &Connection, threshold: f64) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(
        conn,
        Filter::all().gt(SupplyChainIden::CostIncurred, threshold),
        &[(SupplyChainIden::CostIncurred, Order::Desc)],
    )
}

/// Stages with no recorded cost or a zero cost
pub fn find_stages_without_cost(conn: &Connection) -> Result<Vec<SupplyChain>> {
    let filter = Filter::all().any_of(
        Filter::any()
            .is_null(SupplyChainIden::CostIncurred)
            .eq(SupplyChainIden::CostIncurred, 0.0),
    );
    base::find_where_ordered(conn, filter, BY_STAGE_ORDER)
}

pub fn find_stages_by_quantity_in_between(
    conn: &Connection,
    min: f64,
    max: f64,
) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(SupplyChainIden::QuantityIn, min, max),
        &[(SupplyChainIden::QuantityIn, Order::Asc)],
    )
}

pub fn find_stages_by_quantity_out_between(
    conn: &Connection,
    min: f64,
    max: f64,
) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(SupplyChainIden::QuantityOut, min, max),
        &[(SupplyChainIden::QuantityOut, Order::Asc)],
    )
}

pub fn find_insured_stages(conn: &Connection) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(conn, insured(true), NEWEST_FIRST)
}

pub fn find_uninsured_stages(conn: &Connection) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(conn, insured(false), NEWEST_FIRST)
}

/// Case-insensitive location match
pub fn find_supply_chain_by_location(
    conn: &Connection,
    location: &str,
) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(
        conn,
        Filter::all().contains(SupplyChainIden::Location, location),
        NEWEST_FIRST,
    )
}

pub fn find_supply_chain_by_facility(
    conn: &Connection,
    facility: &str,
) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(
        conn,
        Filter::all().contains(SupplyChainIden::FacilityName, facility),
        NEWEST_FIRST,
    )
}

pub fn find_supply_chain_by_responsible_party(
    conn: &Connection,
    party: &str,
) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(
        conn,
        Filter::all().contains(SupplyChainIden::ResponsibleParty, party),
        NEWEST_FIRST,
    )
}

/// Processing and packaging stages of a production
pub fn find_processing_stages(
    conn: &Connection,
    crop_production_id: &str,
) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(
        conn,
        by_production(crop_production_id).is_in(SupplyChainIden::Stage, PROCESSING_STAGES),
        BY_STAGE_ORDER,
    )
}

/// Transport and distribution stages of a production
pub fn find_logistics_stages(
    conn: &Connection,
    crop_production_id: &str,
) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(
        conn,
        by_production(crop_production_id).is_in(SupplyChainIden::Stage, LOGISTICS_STAGES),
        BY_STAGE_ORDER,
    )
}

/// Entries created at or after `since`, latest first
pub fn find_recent_supply_chain(
    conn: &Connection,
    since: DateTime<Utc>,
) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(conn, created_since(since), NEWEST_FIRST)
}

pub fn find_recent_supply_chain_by_production(
    conn: &Connection,
    crop_production_id: &str,
    since: DateTime<Utc>,
) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(
        conn,
        by_production(crop_production_id).and(created_since(since)),
        NEWEST_FIRST,
    )
}

pub fn find_first_stage(conn: &Connection, crop_production_id: &str) -> Result<Option<SupplyChain>> {
    base::find_first_ordered(conn, by_production(crop_production_id), BY_STAGE_ORDER)
}

pub fn find_last_stage(conn: &Connection, crop_production_id: &str) -> Result<Option<SupplyChain>> {
    base::find_first_ordered(
        conn,
        by_production(crop_production_id),
        &[(SupplyChainIden::StageOrder, Order::Desc)],
    )
}

pub fn exists_stage_for_production(
    conn: &Connection,
    crop_production_id: &str,
    stage: SupplyChainStage,
) -> Result<bool> {
    base::exists_where::<SupplyChain>(
        conn,
        by_production(crop_production_id).eq(SupplyChainIden::Stage, stage),
    )
}

pub fn count_supply_chain_by_stage(conn: &Connection) -> Result<Vec<(SupplyChainStage, u64)>> {
    base::count_grouped::<SupplyChain, _>(conn, SupplyChainIden::Stage, Filter::all())
}

pub fn count_supply_chain_by_stage_in_production(
    conn: &Connection,
    crop_production_id: &str,
) -> Result<Vec<(SupplyChainStage, u64)>> {
    base::count_grouped::<SupplyChain, _>(
        conn,
        SupplyChainIden::Stage,
        by_production(crop_production_id),
    )
}

pub fn count_supply_chain_by_quality_status(
    conn: &Connection,
) -> Result<Vec<(QualityStatus, u64)>> {
    base::count_grouped::<SupplyChain, _>(conn, SupplyChainIden::QualityStatus, Filter::all())
}

pub fn count_supply_chain_by_location(conn: &Connection) -> Result<Vec<(Option<String>, u64)>> {
    base::count_grouped::<SupplyChain, _>(conn, SupplyChainIden::Location, Filter::all())
}

pub fn count_supply_chain_by_responsible_party(
    conn: &Connection,
) -> Result<Vec<(Option<String>, u64)>> {
    base::count_grouped::<SupplyChain, _>(conn, SupplyChainIden::ResponsibleParty, Filter::all())
}

pub fn average_loss_percentage_by_production(
    conn: &Connection,
    crop_production_id: &str,
) -> Result<Option<f64>> {
    base::aggregate::<SupplyChain>(
        conn,
        Aggregate::Avg,
        SupplyChainIden::LossPercentage,
        by_production(crop_production_id),
    )
}

/// Mean recorded cost; stages without a cost are ignored
pub fn average_cost(conn: &Connection) -> Result<Option<f64>> {
    base::aggregate::<SupplyChain>(
        conn,
        Aggregate::Avg,
        SupplyChainIden::CostIncurred,
        Filter::all(),
    )
}

pub fn average_cost_by_stage(conn: &Connection, stage: SupplyChainStage) -> Result<Option<f64>> {
    base::aggregate::<SupplyChain>(
        conn,
        Aggregate::Avg,
        SupplyChainIden::CostIncurred,
        Filter::all().eq(SupplyChainIden::Stage, stage),
    )
}

/// Quantity in, out and lost over a production's stages; 0 when unrecorded
pub fn production_flow(conn: &Connection, crop_production_id: &str) -> Result<ProductionFlow> {
    let total = |col: SupplyChainIden| -> Result<f64> {
        let sum = base::aggregate::<SupplyChain>(
            conn,
            Aggregate::Sum,
            col,
            by_production(crop_production_id),
        )?;
        Ok(sum.unwrap_or(0.0))
    };
    Ok(ProductionFlow {
        quantity_in: total(SupplyChainIden::QuantityIn)?,
        quantity_out: total(SupplyChainIden::QuantityOut)?,
        loss_quantity: total(SupplyChainIden::LossQuantity)?,
    })
}

pub fn average_loss_percentage(conn: &Connection) -> Result<Option<f64>> {
    base::aggregate::<SupplyChain>(
        conn,
        Aggregate::Avg,
        SupplyChainIden::LossPercentage,
        Filter::all(),
    )
}

/// Cost summed over every stage of a production; 0 when none was recorded
pub fn total_cost_by_production(conn: &Connection, crop_production_id: &str) -> Result<f64> {
    let total = base::aggregate::<SupplyChain>(
        conn,
        Aggregate::Sum,
        SupplyChainIden::CostIncurred,
        by_production(crop_production_id),
    )?;
    Ok(total.unwrap_or(0.0))
}

/// Stages whose tracking code, location, facility or responsible party
/// contain `term`
pub fn search_supply_chain(conn: &Connection, term: &str) -> Result<Vec<SupplyChain>> {
    base::find_where_ordered(conn, searching(term), NEWEST_FIRST)
}

pub fn search_supply_chain_in_production(
    conn: &Connection,
    crop_production_id: &str,
    term: &str,
    page: PageRequest,
) -> Result<Page<SupplyChain>> {
    base::find_page_where(
        conn,
        by_production(crop_production_id).and(searching(term)),
        BY_STAGE_ORDER,
        page,
    )
}

pub fn find_supply_chain_with_filters(
    conn: &Connection,
    filter: &SupplyChainFilter,
    page: PageRequest,
) -> Result<Page<SupplyChain>> {
    base::find_page_where(conn, filter.to_filter(), BY_STAGE_ORDER, page)
}

/// Delete completed stages that ended strictly before `cutoff`
pub fn delete_old_completed_stages(conn: &Connection, cutoff: DateTime<Utc>) -> Result<usize> {
    let deleted = base::delete_where::<SupplyChain>(
        conn,
        completed().lt(SupplyChainIden::StageEndDate, codec::ts(cutoff)),
    )?;
    info!(deleted, %cutoff, "deleted old supply chain stages");
    Ok(deleted)
}

fn by_tracking_code(tracking_code: &str) -> Filter {
    Filter::all().eq(SupplyChainIden::TrackingCode, tracking_code)
}

fn by_production(crop_production_id: &str) -> Filter {
    Filter::all().eq(SupplyChainIden::CropProductionId, crop_production_id)
}

fn at_order(crop_production_id: &str, stage_order: i32) -> Filter {
    by_production(crop_production_id).eq(SupplyChainIden::StageOrder, stage_order)
}

fn completed() -> Filter {
    Filter::all().is_not_null(SupplyChainIden::StageEndDate)
}

fn incomplete() -> Filter {
    Filter::all().is_null(SupplyChainIden::StageEndDate)
}

fn quality_issue() -> Filter {
    Filter::all().is_in(
        SupplyChainIden::QualityStatus,
        [QualityStatus::Poor, QualityStatus::Rejected],
    )
}

fn with_losses() -> Filter {
    Filter::all().gt(SupplyChainIden::LossQuantity, 0.0)
}

fn with_input() -> Filter {
    Filter::all().gt(SupplyChainIden::QuantityIn, 0.0)
}

fn insured(covered: bool) -> Filter {
    Filter::all().eq(SupplyChainIden::InsuranceCoverage, covered)
}

fn created_since(since: DateTime<Utc>) -> Filter {
    Filter::all().gte(SupplyChainIden::CreatedAt, codec::ts(since))
}

fn searching(term: &str) -> Filter {
    Filter::all().search_any(
        [
            SupplyChainIden::TrackingCode,
            SupplyChainIden::Location,
            SupplyChainIden::FacilityName,
            SupplyChainIden::ResponsibleParty,
        ],
        term,
    )
}

fn efficiency() -> SimpleExpr {
    Expr::col(SupplyChainIden::QuantityOut).div(Expr::col(SupplyChainIden::QuantityIn))
}

fn duration_hours() -> SimpleExpr {
    let days = Expr::expr(julianday(SupplyChainIden::StageEndDate))
        .sub(julianday(SupplyChainIden::StageStartDate));
    Expr::expr(days).mul(24)
}

fn julianday(col: SupplyChainIden) -> SimpleExpr {
    Func::cust(Alias::new("julianday")).arg(Expr::col(col)).into()
}
