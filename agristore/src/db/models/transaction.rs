//! Sales between farmers and buyers

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

string_enum! {
    pub enum TransactionStatus {
        Pending => "PENDING",
        Confirmed => "CONFIRMED",
        Delivered => "DELIVERED",
        Paid => "PAID",
        Cancelled => "CANCELLED",
        Disputed => "DISPUTED",
    }
}

string_enum! {
    pub enum PaymentMethod {
        Cash => "CASH",
        BankTransfer => "BANK_TRANSFER",
        MobileMoney => "MOBILE_MONEY",
        Check => "CHECK",
        Credit => "CREDIT",
    }
}

string_enum! {
    /// Party that arranges transport
    pub enum TransportResponsibility {
        Farmer => "FARMER",
        Buyer => "BUYER",
        Shared => "SHARED",
        ThirdParty => "THIRD_PARTY",
    }
}

/// A sale of produce from a farmer to a buyer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub transaction_code: String,
    pub farmer_id: String,
    pub buyer_id: String,
    pub crop_id: Option<String>,
    pub crop_production_id: Option<String>,
    pub transaction_date: DateTime<Utc>,
    pub quantity: f64,
    pub unit: String,
    pub price_per_unit: f64,
    /// `quantity * price_per_unit` at creation
    pub total_amount: f64,
    pub currency: String,
    pub status: TransactionStatus,
    pub payment_method: Option<PaymentMethod>,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_location: Option<String>,
    pub quality_grade: Option<String>,
    pub transport_responsibility: TransportResponsibility,
    pub payment_date: Option<DateTime<Utc>>,
    pub completion_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new transaction with a fresh id
    pub fn new(
        transaction_code: impl Into<String>,
        farmer_id: impl Into<String>,
        buyer_id: impl Into<String>,
        transaction_date: DateTime<Utc>,
        quantity: f64,
        price_per_unit: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            transaction_code: transaction_code.into(),
            farmer_id: farmer_id.into(),
            buyer_id: buyer_id.into(),
            crop_id: None,
            crop_production_id: None,
            transaction_date,
            quantity,
            unit: "KG".to_string(),
            price_per_unit,
            total_amount: quantity * price_per_unit,
            currency: "XAF".to_string(),
            status: TransactionStatus::Pending,
            payment_method: None,
            delivery_date: None,
            delivery_location: None,
            quality_grade: None,
            transport_responsibility: TransportResponsibility::Buyer,
            payment_date: None,
            completion_date: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum TransactionIden {
    #[iden = "transactions"]
    Table,
    Id,
    TransactionCode,
    FarmerId,
    BuyerId,
    CropId,
    CropProductionId,
    TransactionDate,
    Quantity,
    Unit,
    PricePerUnit,
    TotalAmount,
    Currency,
    Status,
    PaymentMethod,
    DeliveryDate,
    DeliveryLocation,
    QualityGrade,
    TransportResponsibility,
    PaymentDate,
    CompletionDate,
    Notes,
    CreatedAt,
    UpdatedAt,
}

impl Entity for Transaction {
    type Column = TransactionIden;

    const NAME: &'static str = "transaction";
    const TABLE: TransactionIden = TransactionIden::Table;
    const ID: TransactionIden = TransactionIden::Id;
    const COLUMNS: &'static [TransactionIden] = &[
        TransactionIden::Id,
        TransactionIden::TransactionCode,
        TransactionIden::FarmerId,
        TransactionIden::BuyerId,
        TransactionIden::CropId,
        TransactionIden::CropProductionId,
        TransactionIden::TransactionDate,
        TransactionIden::Quantity,
        TransactionIden::Unit,
        TransactionIden::PricePerUnit,
        TransactionIden::TotalAmount,
        TransactionIden::Currency,
        TransactionIden::Status,
        TransactionIden::PaymentMethod,
        TransactionIden::DeliveryDate,
        TransactionIden::DeliveryLocation,
        TransactionIden::QualityGrade,
        TransactionIden::TransportResponsibility,
        TransactionIden::PaymentDate,
        TransactionIden::CompletionDate,
        TransactionIden::Notes,
        TransactionIden::CreatedAt,
        TransactionIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.transaction_code.clone().into(),
            self.farmer_id.clone().into(),
            self.buyer_id.clone().into(),
            self.crop_id.clone().into(),
            self.crop_production_id.clone().into(),
            codec::ts(self.transaction_date).into(),
            self.quantity.into(),
            self.unit.clone().into(),
            self.price_per_unit.into(),
            self.total_amount.into(),
            self.currency.clone().into(),
            self.status.into(),
            self.payment_method.into(),
            codec::opt_date(self.delivery_date).into(),
            self.delivery_location.clone().into(),
            self.quality_grade.clone().into(),
            self.transport_responsibility.into(),
            codec::opt_ts(self.payment_date).into(),
            codec::opt_ts(self.completion_date).into(),
            self.notes.clone().into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            transaction_code: row.get("transaction_code")?,
            farmer_id: row.get("farmer_id")?,
            buyer_id: row.get("buyer_id")?,
            crop_id: row.get("crop_id")?,
            crop_production_id: row.get("crop_production_id")?,
            transaction_date: row.timestamp("transaction_date")?,
            quantity: row.get("quantity")?,
            unit: row.get("unit")?,
            price_per_unit: row.get("price_per_unit")?,
            total_amount: row.get("total_amount")?,
            currency: row.get("currency")?,
            status: row.get("status")?,
            payment_method: row.get("payment_method")?,
            delivery_date: row.opt_date("delivery_date")?,
            delivery_location: row.get("delivery_location")?,
            quality_grade: row.get("quality_grade")?,
            transport_responsibility: row.get("transport_responsibility")?,
            payment_date: row.opt_timestamp("payment_date")?,
            completion_date: row.opt_timestamp("completion_date")?,
            notes: row.get("notes")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
