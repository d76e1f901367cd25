//! Buyer profiles

use chrono::{DateTime, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

string_enum! {
    pub enum BuyerType {
        Wholesaler => "WHOLESALER",
        Retailer => "RETAILER",
        Processor => "PROCESSOR",
        Exporter => "EXPORTER",
        Cooperative => "COOPERATIVE",
        Government => "GOVERNMENT",
    }
}

/// Purchasing profile attached to a user account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buyer {
    pub id: String,
    pub user_id: String,
    pub buyer_code: String,
    pub company_name: Option<String>,
    pub buyer_type: BuyerType,
    pub location: Option<String>,
    pub contact_person: Option<String>,
    pub credit_limit: f64,
    pub storage_capacity: Option<f64>,
    /// 0 to 10, new buyers start at 5
    pub rating: f64,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Buyer {
    /// Create a new buyer with a fresh id
    pub fn new(
        user_id: impl Into<String>,
        buyer_code: impl Into<String>,
        buyer_type: BuyerType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            buyer_code: buyer_code.into(),
            company_name: None,
            buyer_type,
            location: None,
            contact_person: None,
            credit_limit: 0.0,
            storage_capacity: None,
            rating: 5.0,
            verified: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum BuyerIden {
    #[iden = "buyers"]
    Table,
    Id,
    UserId,
    BuyerCode,
    CompanyName,
    BuyerType,
    Location,
    ContactPerson,
    CreditLimit,
    StorageCapacity,
    Rating,
    Verified,
    CreatedAt,
    UpdatedAt,
}

impl Entity for Buyer {
    type Column = BuyerIden;

    const NAME: &'static str = "buyer";
    const TABLE: BuyerIden = BuyerIden::Table;
    const ID: BuyerIden = BuyerIden::Id;
    const COLUMNS: &'static [BuyerIden] = &[
        BuyerIden::Id,
        BuyerIden::UserId,
        BuyerIden::BuyerCode,
        BuyerIden::CompanyName,
        BuyerIden::BuyerType,
        BuyerIden::Location,
        BuyerIden::ContactPerson,
        BuyerIden::CreditLimit,
        BuyerIden::StorageCapacity,
        BuyerIden::Rating,
        BuyerIden::Verified,
        BuyerIden::CreatedAt,
        BuyerIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.user_id.clone().into(),
            self.buyer_code.clone().into(),
            self.company_name.clone().into(),
            self.buyer_type.into(),
            self.location.clone().into(),
            self.contact_person.clone().into(),
            self.credit_limit.into(),
            self.storage_capacity.into(),
            self.rating.into(),
            self.verified.into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            buyer_code: row.get("buyer_code")?,
            company_name: row.get("company_name")?,
            buyer_type: row.get("buyer_type")?,
            location: row.get("location")?,
            contact_person: row.get("contact_person")?,
            credit_limit: row.get("credit_limit")?,
            storage_capacity: row.get("storage_capacity")?,
            rating: row.get("rating")?,
            verified: row.get("verified")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
