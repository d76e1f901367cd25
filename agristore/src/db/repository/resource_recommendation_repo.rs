//! Repository for resource recommendations issued to farms

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use sea_query::Order;
use tracing::info;

use crate::db::models::{
    PriorityLevel, RecommendationCategory, RecommendationStatus, ResourceRecommendation,
    ResourceRecommendationIden, ResourceType,
};
use crate::db::query::{codec, Filter, Page, PageRequest};
use crate::db::repository::base::{self, Aggregate};
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct ResourceRecommendationFilter {
    pub farm_id: Option<String>,
    pub resource_type: Option<ResourceType>,
    pub category: Option<RecommendationCategory>,
    pub priority: Option<PriorityLevel>,
    pub status: Option<RecommendationStatus>,
}

impl ResourceRecommendationFilter {
    fn to_filter(&self) -> Filter {
        Filter::all()
            .eq_opt(ResourceRecommendationIden::FarmId, self.farm_id.as_deref())
            .eq_opt(ResourceRecommendationIden::ResourceType, self.resource_type)
            .eq_opt(ResourceRecommendationIden::RecommendationCategory, self.category)
            .eq_opt(ResourceRecommendationIden::PriorityLevel, self.priority)
            .eq_opt(ResourceRecommendationIden::Status, self.status)
    }
}

const NEWEST_FIRST: &[(ResourceRecommendationIden, Order)] =
    &[(ResourceRecommendationIden::GeneratedDate, Order::Desc)];

const BY_VALIDITY: &[(ResourceRecommendationIden, Order)] =
    &[(ResourceRecommendationIden::ValidUntil, Order::Asc)];

pub fn find_resource_recommendation_by_code(
    conn: &Connection,
    code: &str,
) -> Result<Option<ResourceRecommendation>> {
    base::find_one_where(conn, by_code(code))
}

pub fn exists_resource_recommendation_by_code(conn: &Connection, code: &str) -> Result<bool> {
    base::exists_where::<ResourceRecommendation>(conn, by_code(code))
}

/// Recommendations for a farm, most recently generated first
pub fn find_resource_recommendations_by_farm(
    conn: &Connection,
    farm_id: &str,
) -> Result<Vec<ResourceRecommendation>> {
    base::find_where_ordered(conn, by_farm(farm_id), NEWEST_FIRST)
}

pub fn find_resource_recommendations_by_farm_paged(
    conn: &Connection,
    farm_id: &str,
    page: PageRequest,
) -> Result<Page<ResourceRecommendation>> {
    base::find_page_where(conn, by_farm(farm_id), NEWEST_FIRST, page)
}

pub fn find_resource_recommendations_by_status(
    conn: &Connection,
    status: RecommendationStatus,
) -> Result<Vec<ResourceRecommendation>> {
    base::find_where_ordered(conn, by_status(status), NEWEST_FIRST)
}

pub fn find_resource_recommendations_by_farm_and_status(
    conn: &Connection,
    farm_id: &str,
    status: RecommendationStatus,
) -> Result<Vec<ResourceRecommendation>> {
    base::find_where_ordered(conn, by_farm(farm_id).and(by_status(status)), NEWEST_FIRST)
}

pub fn count_resource_recommendations_by_farm_and_status(
    conn: &Connection,
    farm_id: &str,
    status: RecommendationStatus,
) -> Result<u64> {
    base::count_where::<ResourceRecommendation>(conn, by_farm(farm_id).and(by_status(status)))
}

/// Active recommendations with HIGH or URGENT priority
pub fn find_high_priority_active_recommendations(
    conn: &Connection,
) -> Result<Vec<ResourceRecommendation>> {
    let filter = active().is_in(
        ResourceRecommendationIden::PriorityLevel,
        [PriorityLevel::High, PriorityLevel::Urgent],
    );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

/// Active recommendations whose validity ended before `as_of`
pub fn find_expired_active_recommendations(
    conn: &Connection,
    as_of: NaiveDate,
) -> Result<Vec<ResourceRecommendation>> {
    base::find_where_ordered(conn, expired_active(as_of), BY_VALIDITY)
}

/// Move every active recommendation whose validity ended before `as_of` to
/// EXPIRED in one statement
pub fn mark_expired_recommendations(conn: &Connection, as_of: NaiveDate) -> Result<usize> {
    let updated = base::update_where::<ResourceRecommendation>(
        conn,
        vec![
            (ResourceRecommendationIden::Status, RecommendationStatus::Expired.into()),
            (ResourceRecommendationIden::UpdatedAt, codec::ts(Utc::now()).into()),
        ],
        expired_active(as_of),
    )?;
    info!(updated, %as_of, "expired resource recommendations");
    Ok(updated)
}

/// Active recommendations whose validity ends within `[from, to]`
pub fn find_recommendations_expiring_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<ResourceRecommendation>> {
    let filter = active().between(
        ResourceRecommendationIden::ValidUntil,
        codec::date(from),
        codec::date(to),
    );
    base::find_where_ordered(conn, filter, BY_VALIDITY)
}

pub fn find_resource_recommendations_with_filters(
    conn: &Connection,
    filter: &ResourceRecommendationFilter,
    page: PageRequest,
) -> Result<Page<ResourceRecommendation>> {
    base::find_page_where(conn, filter.to_filter(), NEWEST_FIRST, page)
}

/// Recommendations of one farm whose code, title, description or author
/// contain `term`
pub fn search_resource_recommendations_in_farm(
    conn: &Connection,
    farm_id: &str,
    term: &str,
) -> Result<Vec<ResourceRecommendation>> {
    let filter = by_farm(farm_id).search_any(
        [
            ResourceRecommendationIden::RecommendationCode,
            ResourceRecommendationIden::Title,
            ResourceRecommendationIden::Description,
            ResourceRecommendationIden::CreatedBy,
        ],
        term,
    );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

pub fn count_resource_recommendations_by_type(
    conn: &Connection,
) -> Result<Vec<(ResourceType, u64)>> {
    base::count_grouped::<ResourceRecommendation, _>(
        conn,
        ResourceRecommendationIden::ResourceType,
        Filter::all(),
    )
}

pub fn average_effectiveness_by_resource_type(
    conn: &Connection,
) -> Result<Vec<(ResourceType, Option<f64>)>> {
    base::aggregate_grouped::<ResourceRecommendation, _>(
        conn,
        Aggregate::Avg,
        ResourceRecommendationIden::ResourceType,
        ResourceRecommendationIden::EffectivenessRating,
        Filter::all().is_not_null(ResourceRecommendationIden::EffectivenessRating),
    )
}

/// Set the status of one recommendation; IMPLEMENTED also stamps the
/// implementation date
pub fn update_resource_recommendation_status(
    conn: &Connection,
    id: &str,
    status: RecommendationStatus,
) -> Result<bool> {
    let now = Utc::now();
    let mut values = vec![
        (ResourceRecommendationIden::Status, status.into()),
        (ResourceRecommendationIden::UpdatedAt, codec::ts(now).into()),
    ];
    if status == RecommendationStatus::Implemented {
        values.push((
            ResourceRecommendationIden::ImplementationDate,
            codec::date(now.date_naive()).into(),
        ));
    }
    let updated = base::update_where::<ResourceRecommendation>(
        conn,
        values,
        Filter::all().eq(ResourceRecommendationIden::Id, id),
    )?;
    Ok(updated > 0)
}

/// Delete EXPIRED recommendations whose validity ended before `cutoff`
pub fn delete_expired_recommendations_before(
    conn: &Connection,
    cutoff: NaiveDate,
) -> Result<usize> {
    let filter = by_status(RecommendationStatus::Expired)
        .lt(ResourceRecommendationIden::ValidUntil, codec::date(cutoff));
    let deleted = base::delete_where::<ResourceRecommendation>(conn, filter)?;
    info!(deleted, %cutoff, "deleted expired resource recommendations");
    Ok(deleted)
}

/// Delete REJECTED recommendations last updated before `cutoff`
pub fn delete_old_rejected_recommendations(
    conn: &Connection,
    cutoff: DateTime<Utc>,
) -> Result<usize> {
    let filter = by_status(RecommendationStatus::Rejected)
        .lt(ResourceRecommendationIden::UpdatedAt, codec::ts(cutoff));
    let deleted = base::delete_where::<ResourceRecommendation>(conn, filter)?;
    info!(deleted, %cutoff, "deleted rejected resource recommendations");
    Ok(deleted)
}

fn by_code(code: &str) -> Filter {
    Filter::all().eq(ResourceRecommendationIden::RecommendationCode, code)
}

fn by_farm(farm_id: &str) -> Filter {
    Filter::all().eq(ResourceRecommendationIden::FarmId, farm_id)
}

fn by_status(status: RecommendationStatus) -> Filter {
    Filter::all().eq(ResourceRecommendationIden::Status, status)
}

fn active() -> Filter {
    by_status(RecommendationStatus::Active)
}

fn expired_active(as_of: NaiveDate) -> Filter {
    active().lt(ResourceRecommendationIden::ValidUntil, codec::date(as_of))
}
