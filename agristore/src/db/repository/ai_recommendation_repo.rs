//! Repository for model-generated recommendations shown to farmers

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use sea_query::{Expr, Order};
use tracing::info;

use crate::db::models::{AiPriority, AiRecommendation, AiRecommendationIden, AiRecommendationType};
use crate::db::query::{self, codec, Filter, Page, PageRequest};
use crate::db::repository::base::{self, Aggregate};
use crate::error::Result;

const NEWEST_FIRST: &[(AiRecommendationIden, Order)] =
    &[(AiRecommendationIden::CreatedAt, Order::Desc)];

pub fn find_ai_recommendations_by_farmer(
    conn: &Connection,
    farmer_id: &str,
) -> Result<Vec<AiRecommendation>> {
    base::find_where_ordered(conn, by_farmer(farmer_id), NEWEST_FIRST)
}

pub fn find_ai_recommendations_by_farmer_paged(
    conn: &Connection,
    farmer_id: &str,
    page: PageRequest,
) -> Result<Page<AiRecommendation>> {
    base::find_page_where(conn, by_farmer(farmer_id), NEWEST_FIRST, page)
}

pub fn find_unread_ai_recommendations(
    conn: &Connection,
    farmer_id: &str,
) -> Result<Vec<AiRecommendation>> {
    base::find_where_ordered(conn, unread(farmer_id), NEWEST_FIRST)
}

pub fn count_unread_ai_recommendations(conn: &Connection, farmer_id: &str) -> Result<u64> {
    base::count_where::<AiRecommendation>(conn, unread(farmer_id))
}

/// Unread active URGENT and HIGH recommendations for a farmer. URGENT
/// entries come first; within a priority the newest is first.
pub fn find_urgent_ai_recommendations(
    conn: &Connection,
    farmer_id: &str,
) -> Result<Vec<AiRecommendation>> {
    let mut stmt = base::select_where::<AiRecommendation>(urgent(farmer_id), &[]);
    stmt.order_by_expr(
        Expr::case(
            Expr::col(AiRecommendationIden::Priority).eq(AiPriority::Urgent),
            0,
        )
        .finally(1)
        .into(),
        Order::Asc,
    )
    .order_by(AiRecommendationIden::CreatedAt, Order::Desc);
    query::fetch_all(conn, &stmt)
}

pub fn count_urgent_ai_recommendations(conn: &Connection, farmer_id: &str) -> Result<u64> {
    base::count_where::<AiRecommendation>(conn, urgent(farmer_id))
}

pub fn find_ai_recommendations_by_type(
    conn: &Connection,
    farmer_id: &str,
    recommendation_type: AiRecommendationType,
) -> Result<Vec<AiRecommendation>> {
    let filter = by_farmer(farmer_id).eq(AiRecommendationIden::RecommendationType, recommendation_type);
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

pub fn find_active_ai_recommendations(
    conn: &Connection,
    farmer_id: &str,
) -> Result<Vec<AiRecommendation>> {
    let filter = by_farmer(farmer_id).eq(AiRecommendationIden::IsActive, true);
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

pub fn mark_ai_recommendation_read(conn: &Connection, id: &str) -> Result<bool> {
    let updated = mark_read_where(conn, Filter::all().eq(AiRecommendationIden::Id, id))?;
    Ok(updated > 0)
}

/// Mark every unread recommendation of a farmer as read in one statement
pub fn mark_all_ai_recommendations_read(conn: &Connection, farmer_id: &str) -> Result<usize> {
    mark_read_where(conn, unread(farmer_id))
}

pub fn mark_ai_recommendation_implemented(
    conn: &Connection,
    id: &str,
    effectiveness_rating: Option<i32>,
) -> Result<bool> {
    let now = codec::ts(Utc::now());
    let updated = base::update_where::<AiRecommendation>(
        conn,
        vec![
            (AiRecommendationIden::IsImplemented, true.into()),
            (AiRecommendationIden::ImplementationDate, now.clone().into()),
            (AiRecommendationIden::EffectivenessRating, effectiveness_rating.into()),
            (AiRecommendationIden::UpdatedAt, now.into()),
        ],
        Filter::all().eq(AiRecommendationIden::Id, id),
    )?;
    Ok(updated > 0)
}

/// Share of a farmer's recommendations that were implemented, in percent;
/// `None` when the farmer has none
pub fn implementation_rate(conn: &Connection, farmer_id: &str) -> Result<Option<f64>> {
    let total = base::count_where::<AiRecommendation>(conn, by_farmer(farmer_id))?;
    if total == 0 {
        return Ok(None);
    }
    let implemented = base::count_where::<AiRecommendation>(
        conn,
        by_farmer(farmer_id).eq(AiRecommendationIden::IsImplemented, true),
    )?;
    Ok(Some(implemented as f64 * 100.0 / total as f64))
}

pub fn average_ai_effectiveness(conn: &Connection, farmer_id: &str) -> Result<Option<f64>> {
    base::aggregate::<AiRecommendation>(
        conn,
        Aggregate::Avg,
        AiRecommendationIden::EffectivenessRating,
        by_farmer(farmer_id),
    )
}

/// Deactivate every active recommendation whose validity ended before `now`
pub fn deactivate_expired_ai_recommendations(
    conn: &Connection,
    now: DateTime<Utc>,
) -> Result<usize> {
    let filter = Filter::all()
        .eq(AiRecommendationIden::IsActive, true)
        .lt(AiRecommendationIden::ValidUntil, codec::ts(now));
    let updated = base::update_where::<AiRecommendation>(
        conn,
        vec![
            (AiRecommendationIden::IsActive, false.into()),
            (AiRecommendationIden::UpdatedAt, codec::ts(Utc::now()).into()),
        ],
        filter,
    )?;
    info!(updated, %now, "deactivated expired ai recommendations");
    Ok(updated)
}

/// Delete inactive recommendations last updated strictly before `cutoff`
pub fn delete_old_inactive_recommendations(
    conn: &Connection,
    cutoff: DateTime<Utc>,
) -> Result<usize> {
    let filter = Filter::all()
        .eq(AiRecommendationIden::IsActive, false)
        .lt(AiRecommendationIden::UpdatedAt, codec::ts(cutoff));
    let deleted = base::delete_where::<AiRecommendation>(conn, filter)?;
    info!(deleted, %cutoff, "deleted inactive ai recommendations");
    Ok(deleted)
}

pub fn count_ai_recommendations_by_type(
    conn: &Connection,
    farmer_id: &str,
) -> Result<Vec<(AiRecommendationType, u64)>> {
    base::count_grouped::<AiRecommendation, _>(
        conn,
        AiRecommendationIden::RecommendationType,
        by_farmer(farmer_id),
    )
}

fn mark_read_where(conn: &Connection, filter: Filter) -> Result<usize> {
    let now = codec::ts(Utc::now());
    base::update_where::<AiRecommendation>(
        conn,
        vec![
            (AiRecommendationIden::IsRead, true.into()),
            (AiRecommendationIden::ReadAt, now.clone().into()),
            (AiRecommendationIden::UpdatedAt, now.into()),
        ],
        filter,
    )
}

fn by_farmer(farmer_id: &str) -> Filter {
    Filter::all().eq(AiRecommendationIden::FarmerId, farmer_id)
}

fn unread(farmer_id: &str) -> Filter {
    by_farmer(farmer_id).eq(AiRecommendationIden::IsRead, false)
}

fn urgent(farmer_id: &str) -> Filter {
    unread(farmer_id)
        .eq(AiRecommendationIden::IsActive, true)
        .is_in(AiRecommendationIden::Priority, [AiPriority::Urgent, AiPriority::High])
}
