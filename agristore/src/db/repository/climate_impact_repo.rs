//! Repository for recorded climate events and their impact

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use sea_query::{Alias, Asterisk, Expr, Func, Order, Query};
use tracing::info;

use crate::db::models::{
    ClimateEvent, ClimateImpact, ClimateImpactIden, EventIntensity, ReportingSeason,
};
use crate::db::query::{self, codec, Filter, Page, PageRequest};
use crate::db::repository::base::{self, Aggregate};
use crate::error::Result;

/// Impact totals for one region in one year
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalImpact {
    pub region: String,
    pub events: u64,
    pub total_economic_loss: f64,
    pub total_affected_area: f64,
    pub total_affected_population: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ClimateImpactFilter {
    pub region: Option<String>,
    pub district: Option<String>,
    pub year: Option<i32>,
    pub season: Option<ReportingSeason>,
    pub climate_event: Option<ClimateEvent>,
    pub event_intensity: Option<EventIntensity>,
    pub verified: Option<bool>,
}

impl ClimateImpactFilter {
    fn to_filter(&self) -> Filter {
        Filter::all()
            .eq_ignore_case_opt(ClimateImpactIden::Region, self.region.as_deref())
            .eq_ignore_case_opt(ClimateImpactIden::District, self.district.as_deref())
            .eq_opt(ClimateImpactIden::Year, self.year)
            .eq_opt(ClimateImpactIden::Season, self.season)
            .eq_opt(ClimateImpactIden::ClimateEvent, self.climate_event)
            .eq_opt(ClimateImpactIden::EventIntensity, self.event_intensity)
            .eq_opt(ClimateImpactIden::Verified, self.verified)
    }
}

const NEWEST_FIRST: &[(ClimateImpactIden, Order)] = &[
    (ClimateImpactIden::Year, Order::Desc),
    (ClimateImpactIden::CreatedAt, Order::Desc),
];

const BY_LOSS: &[(ClimateImpactIden, Order)] = &[(ClimateImpactIden::EconomicLoss, Order::Desc)];

pub fn find_climate_impact_by_code(conn: &Connection, code: &str) -> Result<Option<ClimateImpact>> {
    base::find_one_where(conn, by_code(code))
}

pub fn exists_climate_impact_by_code(conn: &Connection, code: &str) -> Result<bool> {
    base::exists_where::<ClimateImpact>(conn, by_code(code))
}

pub fn find_climate_impacts_by_region(conn: &Connection, region: &str) -> Result<Vec<ClimateImpact>> {
    base::find_where_ordered(conn, by_region(region), NEWEST_FIRST)
}

pub fn find_climate_impacts_by_year(conn: &Connection, year: i32) -> Result<Vec<ClimateImpact>> {
    base::find_where_ordered(conn, by_year(year), BY_LOSS)
}

pub fn find_climate_impacts_by_region_and_year(
    conn: &Connection,
    region: &str,
    year: i32,
) -> Result<Vec<ClimateImpact>> {
    base::find_where_ordered(conn, by_region(region).eq(ClimateImpactIden::Year, year), BY_LOSS)
}

pub fn find_climate_impacts_by_event(
    conn: &Connection,
    event: ClimateEvent,
) -> Result<Vec<ClimateImpact>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(ClimateImpactIden::ClimateEvent, event),
        NEWEST_FIRST,
    )
}

/// Verified SEVERE or EXTREME events whose economic loss is strictly above
/// `min_loss`, costliest first
pub fn find_high_risk_climate_impacts(
    conn: &Connection,
    min_loss: f64,
) -> Result<Vec<ClimateImpact>> {
    let filter = Filter::all()
        .is_in(
            ClimateImpactIden::EventIntensity,
            [EventIntensity::Severe, EventIntensity::Extreme],
        )
        .gt(ClimateImpactIden::EconomicLoss, min_loss)
        .eq(ClimateImpactIden::Verified, true);
    base::find_where_ordered(conn, filter, BY_LOSS)
}

pub fn find_unverified_climate_impacts(conn: &Connection) -> Result<Vec<ClimateImpact>> {
    base::find_where_ordered(conn, unverified(), NEWEST_FIRST)
}

pub fn find_climate_impacts_starting_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<ClimateImpact>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(
            ClimateImpactIden::EventStartDate,
            codec::date(from),
            codec::date(to),
        ),
        &[(ClimateImpactIden::EventStartDate, Order::Asc)],
    )
}

pub fn find_climate_impacts_with_filters(
    conn: &Connection,
    filter: &ClimateImpactFilter,
    page: PageRequest,
) -> Result<Page<ClimateImpact>> {
    base::find_page_where(conn, filter.to_filter(), NEWEST_FIRST, page)
}

/// Impacts whose code, region, district or reporter contain `term`
pub fn search_climate_impacts(conn: &Connection, term: &str) -> Result<Vec<ClimateImpact>> {
    let filter = Filter::all().search_any(
        [
            ClimateImpactIden::ImpactCode,
            ClimateImpactIden::Region,
            ClimateImpactIden::District,
            ClimateImpactIden::ReportedBy,
        ],
        term,
    );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

/// Per-region event counts and loss totals for `year`, costliest region first
pub fn regional_impact_statistics(conn: &Connection, year: i32) -> Result<Vec<RegionalImpact>> {
    let loss = Alias::new("total_loss");
    let zero_sum = |col: ClimateImpactIden| {
        Func::coalesce([Func::sum(Expr::col(col)).into(), Expr::val(0).into()])
    };
    let stmt = Query::select()
        .column(ClimateImpactIden::Region)
        .expr(Func::count(Expr::col(Asterisk)))
        .expr_as(zero_sum(ClimateImpactIden::EconomicLoss), loss.clone())
        .expr(zero_sum(ClimateImpactIden::AffectedArea))
        .expr(zero_sum(ClimateImpactIden::AffectedPopulation))
        .from(ClimateImpactIden::Table)
        .cond_where(by_year(year))
        .group_by_col(ClimateImpactIden::Region)
        .order_by(loss, Order::Desc)
        .order_by(ClimateImpactIden::Region, Order::Asc)
        .to_owned();

    query::fetch_rows(conn, &stmt, |row| {
        let events: i64 = row.get(1)?;
        Ok(RegionalImpact {
            region: row.get(0)?,
            events: events.max(0) as u64,
            total_economic_loss: row.get(2)?,
            total_affected_area: row.get(3)?,
            total_affected_population: row.get(4)?,
        })
    })
}

/// Economic loss summed over every event of `year`; 0 when none was recorded
pub fn total_economic_loss_for_year(conn: &Connection, year: i32) -> Result<f64> {
    let total = base::aggregate::<ClimateImpact>(
        conn,
        Aggregate::Sum,
        ClimateImpactIden::EconomicLoss,
        by_year(year),
    )?;
    Ok(total.unwrap_or(0.0))
}

pub fn count_climate_impacts_by_event(conn: &Connection) -> Result<Vec<(ClimateEvent, u64)>> {
    base::count_grouped::<ClimateImpact, _>(conn, ClimateImpactIden::ClimateEvent, Filter::all())
}

pub fn mark_climate_impact_verified(conn: &Connection, id: &str) -> Result<bool> {
    let now = codec::ts(Utc::now());
    let updated = base::update_where::<ClimateImpact>(
        conn,
        vec![
            (ClimateImpactIden::Verified, true.into()),
            (ClimateImpactIden::VerificationDate, now.clone().into()),
            (ClimateImpactIden::UpdatedAt, now.into()),
        ],
        Filter::all().eq(ClimateImpactIden::Id, id),
    )?;
    Ok(updated > 0)
}

/// Delete unverified reports created strictly before `cutoff`
pub fn delete_unverified_climate_impacts_before(
    conn: &Connection,
    cutoff: DateTime<Utc>,
) -> Result<usize> {
    let deleted = base::delete_where::<ClimateImpact>(
        conn,
        unverified().lt(ClimateImpactIden::CreatedAt, codec::ts(cutoff)),
    )?;
    info!(deleted, %cutoff, "deleted stale unverified climate impacts");
    Ok(deleted)
}

fn by_code(code: &str) -> Filter {
    Filter::all().eq(ClimateImpactIden::ImpactCode, code)
}

fn by_region(region: &str) -> Filter {
    Filter::all().eq_ignore_case(ClimateImpactIden::Region, region)
}

fn by_year(year: i32) -> Filter {
    Filter::all().eq(ClimateImpactIden::Year, year)
}

fn unverified() -> Filter {
    Filter::all().eq(ClimateImpactIden::Verified, false)
}
