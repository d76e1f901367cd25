//! User-facing notifications

use chrono::{DateTime, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

/// A message shown to users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub message: String,
    pub notification_type: String,
    pub timestamp: DateTime<Utc>,
    /// Hash of the message content, used to spot repeats
    pub content_hash: Option<String>,
    pub duplicate: bool,
}

impl Notification {
    /// Create a new notification with a fresh id
    pub fn new(
        message: impl Into<String>,
        notification_type: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message: message.into(),
            notification_type: notification_type.into(),
            timestamp: Utc::now(),
            content_hash: None,
            duplicate: false,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum NotificationIden {
    #[iden = "notifications"]
    Table,
    Id,
    Message,
    NotificationType,
    Timestamp,
    ContentHash,
    Duplicate,
}

impl Entity for Notification {
    type Column = NotificationIden;

    const NAME: &'static str = "notification";
    const TABLE: NotificationIden = NotificationIden::Table;
    const ID: NotificationIden = NotificationIden::Id;
    const COLUMNS: &'static [NotificationIden] = &[
        NotificationIden::Id,
        NotificationIden::Message,
        NotificationIden::NotificationType,
        NotificationIden::Timestamp,
        NotificationIden::ContentHash,
        NotificationIden::Duplicate,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.message.clone().into(),
            self.notification_type.clone().into(),
            codec::ts(self.timestamp).into(),
            self.content_hash.clone().into(),
            self.duplicate.into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            message: row.get("message")?,
            notification_type: row.get("notification_type")?,
            timestamp: row.timestamp("timestamp")?,
            content_hash: row.get("content_hash")?,
            duplicate: row.get("duplicate")?,
        })
    }
}
