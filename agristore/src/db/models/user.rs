//! User accounts

use chrono::{DateTime, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

string_enum! {
    pub enum UserRole {
        Farmer => "FARMER",
        Buyer => "BUYER",
        Admin => "ADMIN",
        Analyst => "ANALYST",
        Government => "GOVERNMENT",
    }
}

/// An account that can sign in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub profile_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a fresh id
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        role: UserRole,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            email: email.into(),
            full_name: None,
            phone_number: None,
            role,
            is_active: true,
            last_login: None,
            profile_image_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum UserIden {
    #[iden = "users"]
    Table,
    Id,
    Username,
    Email,
    FullName,
    PhoneNumber,
    Role,
    IsActive,
    LastLogin,
    ProfileImageUrl,
    CreatedAt,
    UpdatedAt,
}

impl Entity for User {
    type Column = UserIden;

    const NAME: &'static str = "user";
    const TABLE: UserIden = UserIden::Table;
    const ID: UserIden = UserIden::Id;
    const COLUMNS: &'static [UserIden] = &[
        UserIden::Id,
        UserIden::Username,
        UserIden::Email,
        UserIden::FullName,
        UserIden::PhoneNumber,
        UserIden::Role,
        UserIden::IsActive,
        UserIden::LastLogin,
        UserIden::ProfileImageUrl,
        UserIden::CreatedAt,
        UserIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.username.clone().into(),
            self.email.clone().into(),
            self.full_name.clone().into(),
            self.phone_number.clone().into(),
            self.role.into(),
            self.is_active.into(),
            codec::opt_ts(self.last_login).into(),
            self.profile_image_url.clone().into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            username: row.get("username")?,
            email: row.get("email")?,
            full_name: row.get("full_name")?,
            phone_number: row.get("phone_number")?,
            role: row.get("role")?,
            is_active: row.get("is_active")?,
            last_login: row.opt_timestamp("last_login")?,
            profile_image_url: row.get("profile_image_url")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
