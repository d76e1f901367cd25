//! Repository for user notifications

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use sea_query::Order;
use tracing::info;

use crate::db::models::{Notification, NotificationIden};
use crate::db::query::{codec, Filter, Page, PageRequest};
use crate::db::repository::base;
use crate::error::Result;

const NEWEST_FIRST: &[(NotificationIden, Order)] = &[(NotificationIden::Timestamp, Order::Desc)];

pub fn find_all_notifications(conn: &Connection) -> Result<Vec<Notification>> {
    base::find_where_ordered(conn, Filter::all(), NEWEST_FIRST)
}

pub fn find_all_notifications_paged(
    conn: &Connection,
    page: PageRequest,
) -> Result<Page<Notification>> {
    base::find_page_where(conn, Filter::all(), NEWEST_FIRST, page)
}

/// Non-duplicate notifications with the same content hash sent at or after
/// `since`
pub fn find_similar_notifications(
    conn: &Connection,
    content_hash: &str,
    since: DateTime<Utc>,
) -> Result<Vec<Notification>> {
    let filter = Filter::all()
        .eq(NotificationIden::ContentHash, content_hash)
        .gte(NotificationIden::Timestamp, codec::ts(since))
        .eq(NotificationIden::Duplicate, false);
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

pub fn find_notifications_by_type(
    conn: &Connection,
    notification_type: &str,
) -> Result<Vec<Notification>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(NotificationIden::NotificationType, notification_type),
        NEWEST_FIRST,
    )
}

pub fn count_notifications_by_type(conn: &Connection) -> Result<Vec<(String, u64)>> {
    base::count_grouped::<Notification, _>(conn, NotificationIden::NotificationType, Filter::all())
}

pub fn mark_notification_duplicate(conn: &Connection, id: &str) -> Result<bool> {
    let updated = base::update_where::<Notification>(
        conn,
        vec![(NotificationIden::Duplicate, true.into())],
        Filter::all().eq(NotificationIden::Id, id),
    )?;
    Ok(updated > 0)
}

/// Delete notifications sent strictly before `cutoff`
pub fn delete_notifications_before(conn: &Connection, cutoff: DateTime<Utc>) -> Result<usize> {
    let deleted = base::delete_where::<Notification>(
        conn,
        Filter::all().lt(NotificationIden::Timestamp, codec::ts(cutoff)),
    )?;
    info!(deleted, %cutoff, "deleted old notifications");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_database;
    use chrono::{Duration, TimeZone};

    fn sent(message: &str, hash: &str, ago_minutes: i64) -> Notification {
        let mut n = Notification::new(message, "ALERT");
        n.content_hash = Some(hash.to_string());
        n.timestamp = Utc::now() - Duration::minutes(ago_minutes);
        n
    }

    #[test]
    fn test_similar_notifications() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let recent = sent("Rain expected", "h1", 5);
        let old = sent("Rain expected", "h1", 120);
        let other = sent("Prices up", "h2", 5);
        let mut dup = sent("Rain expected", "h1", 1);
        dup.duplicate = true;
        base::save_all(&conn, &[recent.clone(), old, other, dup]).unwrap();

        let since = Utc::now() - Duration::minutes(60);
        let similar = find_similar_notifications(&conn, "h1", since).unwrap();
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].id, recent.id);

        assert!(mark_notification_duplicate(&conn, &recent.id).unwrap());
        assert!(find_similar_notifications(&conn, "h1", since).unwrap().is_empty());
    }

    #[test]
    fn test_listing_and_cleanup() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut info = sent("Welcome", "h3", 30);
        info.notification_type = "INFO".to_string();
        base::save_all(&conn, &[sent("a", "h1", 10), sent("b", "h2", 20), info]).unwrap();

        let all = find_all_notifications(&conn).unwrap();
        assert_eq!(all[0].message, "a");
        assert_eq!(all[2].message, "Welcome");

        let page = find_all_notifications_paged(&conn, PageRequest::first(2)).unwrap();
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.content.len(), 2);

        assert_eq!(
            count_notifications_by_type(&conn).unwrap(),
            vec![("ALERT".to_string(), 2), ("INFO".to_string(), 1)]
        );
        assert_eq!(find_notifications_by_type(&conn, "INFO").unwrap().len(), 1);

        let cutoff = Utc::now() - Duration::minutes(15);
        assert_eq!(delete_notifications_before(&conn, cutoff).unwrap(), 2);
        assert_eq!(find_all_notifications(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_similar_since_is_inclusive() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let since = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut at_cutoff = Notification::new("Frost warning", "ALERT");
        at_cutoff.content_hash = Some("h1".to_string());
        at_cutoff.timestamp = since;
        let mut before = at_cutoff.clone();
        before.id = "earlier".to_string();
        before.timestamp = since - Duration::milliseconds(1);
        base::save_all(&conn, &[at_cutoff.clone(), before]).unwrap();

        let similar = find_similar_notifications(&conn, "h1", since).unwrap();
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].id, at_cutoff.id);
        assert!(find_similar_notifications(&conn, "h2", since).unwrap().is_empty());

        // Strictly before the cutoff only
        assert_eq!(delete_notifications_before(&conn, since).unwrap(), 1);
    }

    #[test]
    fn test_mark_duplicate_unknown_id() {
        let db = create_test_database();
        let conn = db.connection().unwrap();

        assert!(!mark_notification_duplicate(&conn, "missing").unwrap());
        let page = find_all_notifications_paged(&conn, PageRequest::first(10)).unwrap();
        assert!(page.content.is_empty());
        assert_eq!(page.total_elements, 0);
    }
}
