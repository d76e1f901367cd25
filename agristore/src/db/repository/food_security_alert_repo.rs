//! Repository for food security alerts

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use sea_query::Order;
use tracing::info;

use crate::db::models::{
    AlertCategory, AlertLevel, FoodSecurityAlert, FoodSecurityAlertIden, ResolutionStatus,
};
use crate::db::query::{codec, Filter, Page, PageRequest};
use crate::db::repository::base;
use crate::error::Result;

const NEWEST_FIRST: &[(FoodSecurityAlertIden, Order)] =
    &[(FoodSecurityAlertIden::AlertDate, Order::Desc)];

pub fn find_alert_by_code(conn: &Connection, code: &str) -> Result<Option<FoodSecurityAlert>> {
    base::find_one_where(conn, by_code(code))
}

pub fn exists_alert_by_code(conn: &Connection, code: &str) -> Result<bool> {
    base::exists_where::<FoodSecurityAlert>(conn, by_code(code))
}

/// Active alerts that have no expiry or expire after `now`, latest first
pub fn find_active_alerts(
    conn: &Connection,
    now: DateTime<Utc>,
    page: PageRequest,
) -> Result<Page<FoodSecurityAlert>> {
    base::find_page_where(conn, current(now), NEWEST_FIRST, page)
}

pub fn count_active_alerts(conn: &Connection, now: DateTime<Utc>) -> Result<u64> {
    base::count_where::<FoodSecurityAlert>(conn, current(now))
}

pub fn find_alerts_by_level(
    conn: &Connection,
    level: AlertLevel,
    page: PageRequest,
) -> Result<Page<FoodSecurityAlert>> {
    base::find_page_where(
        conn,
        Filter::all().eq(FoodSecurityAlertIden::AlertLevel, level),
        NEWEST_FIRST,
        page,
    )
}

pub fn find_alerts_by_category(
    conn: &Connection,
    category: AlertCategory,
    page: PageRequest,
) -> Result<Page<FoodSecurityAlert>> {
    base::find_page_where(
        conn,
        Filter::all().eq(FoodSecurityAlertIden::AlertCategory, category),
        NEWEST_FIRST,
        page,
    )
}

pub fn find_alerts_by_region(conn: &Connection, region: &str) -> Result<Vec<FoodSecurityAlert>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq_ignore_case(FoodSecurityAlertIden::AffectedRegion, region),
        NEWEST_FIRST,
    )
}

/// Current HIGH and CRITICAL alerts
pub fn find_critical_active_alerts(
    conn: &Connection,
    now: DateTime<Utc>,
) -> Result<Vec<FoodSecurityAlert>> {
    let filter = current(now).is_in(
        FoodSecurityAlertIden::AlertLevel,
        [AlertLevel::High, AlertLevel::Critical],
    );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

/// Current alerts whose code, title, description or region contain `term`
pub fn search_active_alerts(
    conn: &Connection,
    term: &str,
    now: DateTime<Utc>,
) -> Result<Vec<FoodSecurityAlert>> {
    let filter = current(now).search_any(
        [
            FoodSecurityAlertIden::AlertCode,
            FoodSecurityAlertIden::AlertTitle,
            FoodSecurityAlertIden::Description,
            FoodSecurityAlertIden::AffectedRegion,
        ],
        term,
    );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

pub fn distinct_alert_regions(conn: &Connection) -> Result<Vec<String>> {
    base::distinct_values::<FoodSecurityAlert, _>(
        conn,
        FoodSecurityAlertIden::AffectedRegion,
        Filter::all(),
        Order::Asc,
    )
}

/// Alerts still IN_PROGRESS that were raised before `threshold`
pub fn find_stalled_alerts(
    conn: &Connection,
    threshold: DateTime<Utc>,
) -> Result<Vec<FoodSecurityAlert>> {
    let filter = Filter::all()
        .eq(FoodSecurityAlertIden::ResolutionStatus, ResolutionStatus::InProgress)
        .lt(FoodSecurityAlertIden::CreatedAt, codec::ts(threshold));
    base::find_where_ordered(conn, filter, &[(FoodSecurityAlertIden::CreatedAt, Order::Asc)])
}

pub fn count_alerts_by_level(conn: &Connection) -> Result<Vec<(AlertLevel, u64)>> {
    base::count_grouped::<FoodSecurityAlert, _>(conn, FoodSecurityAlertIden::AlertLevel, Filter::all())
}

pub fn count_alerts_by_category(conn: &Connection) -> Result<Vec<(AlertCategory, u64)>> {
    base::count_grouped::<FoodSecurityAlert, _>(
        conn,
        FoodSecurityAlertIden::AlertCategory,
        Filter::all(),
    )
}

/// Mark an alert RESOLVED and inactive
pub fn resolve_alert(conn: &Connection, id: &str) -> Result<bool> {
    let now = codec::ts(Utc::now());
    let updated = base::update_where::<FoodSecurityAlert>(
        conn,
        vec![
            (FoodSecurityAlertIden::ResolutionStatus, ResolutionStatus::Resolved.into()),
            (FoodSecurityAlertIden::ResolutionDate, now.clone().into()),
            (FoodSecurityAlertIden::IsActive, false.into()),
            (FoodSecurityAlertIden::UpdatedAt, now.into()),
        ],
        Filter::all().eq(FoodSecurityAlertIden::Id, id),
    )?;
    Ok(updated > 0)
}

/// Deactivate every active alert whose expiry is at or before `now`
pub fn deactivate_expired_alerts(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
    let filter = Filter::all()
        .eq(FoodSecurityAlertIden::IsActive, true)
        .lte(FoodSecurityAlertIden::ExpiryDate, codec::ts(now));
    let updated = base::update_where::<FoodSecurityAlert>(
        conn,
        vec![
            (FoodSecurityAlertIden::IsActive, false.into()),
            (FoodSecurityAlertIden::UpdatedAt, codec::ts(Utc::now()).into()),
        ],
        filter,
    )?;
    info!(updated, %now, "deactivated expired food security alerts");
    Ok(updated)
}

fn by_code(code: &str) -> Filter {
    Filter::all().eq(FoodSecurityAlertIden::AlertCode, code)
}

/// Active and either open-ended or expiring after `now`
fn current(now: DateTime<Utc>) -> Filter {
    Filter::all().eq(FoodSecurityAlertIden::IsActive, true).any_of(
        Filter::any()
            .is_null(FoodSecurityAlertIden::ExpiryDate)
            .gt(FoodSecurityAlertIden::ExpiryDate, codec::ts(now)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_database;
    use chrono::Duration;

    fn alert(code: &str, level: AlertLevel, region: &str) -> FoodSecurityAlert {
        FoodSecurityAlert::new(code, format!("Alert {code}"), AlertCategory::Production, level, region)
    }

    #[test]
    fn test_active_excludes_expired_and_inactive() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let now = Utc::now();
        let mut expired = alert("A2", AlertLevel::High, "Eastern");
        expired.expiry_date = Some(now - Duration::hours(1));
        let mut later = alert("A3", AlertLevel::Critical, "Eastern");
        later.expiry_date = Some(now + Duration::days(3));
        let mut closed = alert("A4", AlertLevel::High, "Western");
        closed.is_active = false;
        base::save_all(&conn, &[alert("A1", AlertLevel::Info, "Kigali"), expired, later, closed])
            .unwrap();

        let page = find_active_alerts(&conn, now, PageRequest::first(10)).unwrap();
        assert_eq!(page.total_elements, 2);
        assert_eq!(count_active_alerts(&conn, now).unwrap(), 2);

        let critical = find_critical_active_alerts(&conn, now).unwrap();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].alert_code, "A3");

        assert_eq!(search_active_alerts(&conn, "a1", now).unwrap().len(), 1);
        assert_eq!(search_active_alerts(&conn, "a4", now).unwrap().len(), 0);

        assert_eq!(deactivate_expired_alerts(&conn, now).unwrap(), 1);
        assert!(!find_alert_by_code(&conn, "A2").unwrap().unwrap().is_active);
    }

    #[test]
    fn test_stalled_and_resolve() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut stalled = alert("S1", AlertLevel::Medium, "Southern");
        stalled.resolution_status = ResolutionStatus::InProgress;
        stalled.created_at = Utc::now() - Duration::days(10);
        let mut fresh = alert("S2", AlertLevel::Medium, "Southern");
        fresh.resolution_status = ResolutionStatus::InProgress;
        base::save_all(&conn, &[stalled.clone(), fresh]).unwrap();

        let threshold = Utc::now() - Duration::days(7);
        assert_eq!(find_stalled_alerts(&conn, threshold).unwrap().len(), 1);

        assert!(resolve_alert(&conn, &stalled.id).unwrap());
        assert!(find_stalled_alerts(&conn, threshold).unwrap().is_empty());
        let resolved = find_alert_by_code(&conn, "S1").unwrap().unwrap();
        assert_eq!(resolved.resolution_status, ResolutionStatus::Resolved);
        assert!(resolved.resolution_date.is_some());
        assert!(!resolved.is_active);
    }

    #[test]
    fn test_grouping_and_regions() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut weather = alert("W1", AlertLevel::High, "Northern");
        weather.alert_category = AlertCategory::Weather;
        base::save_all(
            &conn,
            &[weather, alert("P1", AlertLevel::High, "Eastern"), alert("P2", AlertLevel::Low, "Eastern")],
        )
        .unwrap();

        assert_eq!(count_alerts_by_level(&conn).unwrap()[0], (AlertLevel::High, 2));
        assert_eq!(count_alerts_by_category(&conn).unwrap()[0], (AlertCategory::Production, 2));
        assert_eq!(
            distinct_alert_regions(&conn).unwrap(),
            vec!["Eastern".to_string(), "Northern".to_string()]
        );
        let page = find_alerts_by_category(&conn, AlertCategory::Weather, PageRequest::first(5)).unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(find_alerts_by_level(&conn, AlertLevel::High, PageRequest::first(5)).unwrap().total_elements, 2);
        assert_eq!(find_alerts_by_region(&conn, "EASTERN").unwrap().len(), 2);
    }
}
