//! Repository for agricultural policies

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use sea_query::{Expr, Func, Order, Query};
use serde::Serialize;
use tracing::info;

use crate::db::models::{
    GeographicScope, PolicyCategory, PolicyData, PolicyDataIden, PolicyStatus, PolicyType,
};
use crate::db::query::{self, codec, Filter, Page, PageRequest};
use crate::db::repository::base::{self, Aggregate};
use crate::error::Result;

/// Portfolio-wide policy counts and budget figures
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyStatistics {
    pub total: u64,
    pub active: u64,
    pub draft: u64,
    pub expired: u64,
    pub total_budget: f64,
    pub average_utilization: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PolicyFilter {
    pub policy_type: Option<PolicyType>,
    pub category: Option<PolicyCategory>,
    pub status: Option<PolicyStatus>,
    pub scope: Option<GeographicScope>,
    pub region: Option<String>,
    pub climate_smart: Option<bool>,
    pub youth_focus: Option<bool>,
}

impl PolicyFilter {
    fn to_filter(&self) -> Filter {
        Filter::all()
            .eq_opt(PolicyDataIden::PolicyType, self.policy_type)
            .eq_opt(PolicyDataIden::PolicyCategory, self.category)
            .eq_opt(PolicyDataIden::Status, self.status)
            .eq_opt(PolicyDataIden::GeographicScope, self.scope)
            .contains_opt(PolicyDataIden::AffectedRegions, self.region.as_deref())
            .eq_opt(PolicyDataIden::ClimateSmart, self.climate_smart)
            .eq_opt(PolicyDataIden::YouthFocus, self.youth_focus)
    }
}

const NEWEST_FIRST: &[(PolicyDataIden, Order)] = &[(PolicyDataIden::EffectiveDate, Order::Desc)];

pub fn find_policy_by_code(conn: &Connection, code: &str) -> Result<Option<PolicyData>> {
    base::find_one_where(conn, by_code(code))
}

pub fn exists_policy_by_code(conn: &Connection, code: &str) -> Result<bool> {
    base::exists_where::<PolicyData>(conn, by_code(code))
}

pub fn find_policies_by_type(conn: &Connection, policy_type: PolicyType) -> Result<Vec<PolicyData>> {
    base::find_where_ordered(conn, Filter::all().eq(PolicyDataIden::PolicyType, policy_type), NEWEST_FIRST)
}

pub fn find_policies_by_category(
    conn: &Connection,
    category: PolicyCategory,
) -> Result<Vec<PolicyData>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(PolicyDataIden::PolicyCategory, category),
        NEWEST_FIRST,
    )
}

pub fn find_policies_by_status(conn: &Connection, status: PolicyStatus) -> Result<Vec<PolicyData>> {
    base::find_where_ordered(conn, by_status(status), NEWEST_FIRST)
}

pub fn find_policies_by_scope(
    conn: &Connection,
    scope: GeographicScope,
) -> Result<Vec<PolicyData>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(PolicyDataIden::GeographicScope, scope),
        NEWEST_FIRST,
    )
}

/// ACTIVE policies in force on `date`: effective on or before it and not
/// expiring until after it
pub fn find_policies_active_at(conn: &Connection, date: NaiveDate) -> Result<Vec<PolicyData>> {
    let day = codec::date(date);
    let filter = by_status(PolicyStatus::Active)
        .lte(PolicyDataIden::EffectiveDate, day.clone())
        .any_of(
            Filter::any()
                .is_null(PolicyDataIden::ExpiryDate)
                .gt(PolicyDataIden::ExpiryDate, day),
        );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

pub fn find_policies_expiring_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<PolicyData>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(PolicyDataIden::ExpiryDate, codec::date(from), codec::date(to)),
        &[(PolicyDataIden::ExpiryDate, Order::Asc)],
    )
}

/// Set the status of one policy; transitions are not checked
pub fn update_policy_status(conn: &Connection, id: &str, status: PolicyStatus) -> Result<bool> {
    let updated = base::update_where::<PolicyData>(
        conn,
        vec![
            (PolicyDataIden::Status, status.into()),
            (PolicyDataIden::UpdatedAt, codec::ts(Utc::now()).into()),
        ],
        Filter::all().eq(PolicyDataIden::Id, id),
    )?;
    Ok(updated > 0)
}

/// Move ACTIVE policies whose expiry is before `as_of` to EXPIRED in one
/// statement
pub fn update_expired_policies(conn: &Connection, as_of: NaiveDate) -> Result<usize> {
    let filter = by_status(PolicyStatus::Active).lt(PolicyDataIden::ExpiryDate, codec::date(as_of));
    let updated = base::update_where::<PolicyData>(
        conn,
        vec![
            (PolicyDataIden::Status, PolicyStatus::Expired.into()),
            (PolicyDataIden::UpdatedAt, codec::ts(Utc::now()).into()),
        ],
        filter,
    )?;
    info!(updated, %as_of, "expired policies");
    Ok(updated)
}

/// Policies whose code, name, description, regions or agency contain `term`
pub fn search_policies(conn: &Connection, term: &str) -> Result<Vec<PolicyData>> {
    let filter = Filter::all().search_any(
        [
            PolicyDataIden::PolicyCode,
            PolicyDataIden::PolicyName,
            PolicyDataIden::Description,
            PolicyDataIden::AffectedRegions,
            PolicyDataIden::ImplementingAgency,
        ],
        term,
    );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

pub fn find_policies_by_multiple_criteria(
    conn: &Connection,
    filter: &PolicyFilter,
    page: PageRequest,
) -> Result<Page<PolicyData>> {
    base::find_page_where(conn, filter.to_filter(), NEWEST_FIRST, page)
}

pub fn count_policies_by_status(conn: &Connection) -> Result<Vec<(PolicyStatus, u64)>> {
    base::count_grouped::<PolicyData, _>(conn, PolicyDataIden::Status, Filter::all())
}

pub fn policy_statistics(conn: &Connection) -> Result<PolicyStatistics> {
    let stmt = Query::select()
        .expr(Func::coalesce([
            Func::sum(Expr::col(PolicyDataIden::TotalBudget)).into(),
            Expr::val(0.0).into(),
        ]))
        .expr(Func::coalesce([
            Func::avg(Expr::col(PolicyDataIden::UtilizationRate)).into(),
            Expr::val(0.0).into(),
        ]))
        .from(PolicyDataIden::Table)
        .to_owned();
    let (total_budget, average_utilization) =
        query::fetch_row_optional(conn, &stmt, |row| Ok((row.get(0)?, row.get(1)?)))?
            .unwrap_or((0.0, 0.0));

    Ok(PolicyStatistics {
        total: base::count_all::<PolicyData>(conn)?,
        active: base::count_where::<PolicyData>(conn, by_status(PolicyStatus::Active))?,
        draft: base::count_where::<PolicyData>(conn, by_status(PolicyStatus::Draft))?,
        expired: base::count_where::<PolicyData>(conn, by_status(PolicyStatus::Expired))?,
        total_budget,
        average_utilization,
    })
}

pub fn total_budget_by_type(conn: &Connection) -> Result<Vec<(PolicyType, Option<f64>)>> {
    base::aggregate_grouped::<PolicyData, _>(
        conn,
        Aggregate::Sum,
        PolicyDataIden::PolicyType,
        PolicyDataIden::TotalBudget,
        Filter::all(),
    )
}

fn by_code(code: &str) -> Filter {
    Filter::all().eq(PolicyDataIden::PolicyCode, code)
}

fn by_status(status: PolicyStatus) -> Filter {
    Filter::all().eq(PolicyDataIden::Status, status)
}
