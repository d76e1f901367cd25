//! Supply chain stages

use chrono::{DateTime, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

string_enum! {
    pub enum SupplyChainStage {
        Harvest => "HARVEST",
        Collection => "COLLECTION",
        Storage => "STORAGE",
        Processing => "PROCESSING",
        Packaging => "PACKAGING",
        Transport => "TRANSPORT",
        Distribution => "DISTRIBUTION",
        Retail => "RETAIL",
    }
}

string_enum! {
    pub enum QualityStatus {
        Excellent => "EXCELLENT",
        Good => "GOOD",
        Fair => "FAIR",
        Poor => "POOR",
        Rejected => "REJECTED",
    }
}

/// One stage in moving a production lot to market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyChain {
    pub id: String,
    pub crop_production_id: String,
    pub transaction_id: Option<String>,
    pub stage: SupplyChainStage,
    pub stage_order: i32,
    pub stage_start_date: Option<DateTime<Utc>>,
    pub stage_end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub facility_name: Option<String>,
    pub quantity_in: Option<f64>,
    pub quantity_out: Option<f64>,
    pub unit: String,
    pub loss_quantity: f64,
    pub loss_percentage: f64,
    pub quality_status: QualityStatus,
    pub responsible_party: Option<String>,
    pub cost_incurred: Option<f64>,
    pub insurance_coverage: bool,
    pub tracking_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SupplyChain {
    /// Create a new supply chain with a fresh id
    pub fn new(
        crop_production_id: impl Into<String>,
        stage: SupplyChainStage,
        stage_order: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            crop_production_id: crop_production_id.into(),
            transaction_id: None,
            stage,
            stage_order,
            stage_start_date: None,
            stage_end_date: None,
            location: None,
            facility_name: None,
            quantity_in: None,
            quantity_out: None,
            unit: "KG".to_string(),
            loss_quantity: 0.0,
            loss_percentage: 0.0,
            quality_status: QualityStatus::Good,
            responsible_party: None,
            cost_incurred: None,
            insurance_coverage: false,
            tracking_code: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum SupplyChainIden {
    #[iden = "supply_chains"]
    Table,
    Id,
    CropProductionId,
    TransactionId,
    Stage,
    StageOrder,
    StageStartDate,
    StageEndDate,
    Location,
    FacilityName,
    QuantityIn,
    QuantityOut,
    Unit,
    LossQuantity,
    LossPercentage,
    QualityStatus,
    ResponsibleParty,
    CostIncurred,
    InsuranceCoverage,
    TrackingCode,
    CreatedAt,
    UpdatedAt,
}

impl Entity for SupplyChain {
    type Column = SupplyChainIden;

    const NAME: &'static str = "supply chain";
    const TABLE: SupplyChainIden = SupplyChainIden::Table;
    const ID: SupplyChainIden = SupplyChainIden::Id;
    const COLUMNS: &'static [SupplyChainIden] = &[
        SupplyChainIden::Id,
        SupplyChainIden::CropProductionId,
        SupplyChainIden::TransactionId,
        SupplyChainIden::Stage,
        SupplyChainIden::StageOrder,
        SupplyChainIden::StageStartDate,
        SupplyChainIden::StageEndDate,
        SupplyChainIden::Location,
        SupplyChainIden::FacilityName,
        SupplyChainIden::QuantityIn,
        SupplyChainIden::QuantityOut,
        SupplyChainIden::Unit,
        SupplyChainIden::LossQuantity,
        SupplyChainIden::LossPercentage,
        SupplyChainIden::QualityStatus,
        SupplyChainIden::ResponsibleParty,
        SupplyChainIden::CostIncurred,
        SupplyChainIden::InsuranceCoverage,
        SupplyChainIden::TrackingCode,
        SupplyChainIden::CreatedAt,
        SupplyChainIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.crop_production_id.clone().into(),
            self.transaction_id.clone().into(),
            self.stage.into(),
            self.stage_order.into(),
            codec::opt_ts(self.stage_start_date).into(),
            codec::opt_ts(self.stage_end_date).into(),
            self.location.clone().into(),
            self.facility_name.clone().into(),
            self.quantity_in.into(),
            self.quantity_out.into(),
            self.unit.clone().into(),
            self.loss_quantity.into(),
            self.loss_percentage.into(),
            self.quality_status.into(),
            self.responsible_party.clone().into(),
            self.cost_incurred.into(),
            self.insurance_coverage.into(),
            self.tracking_code.clone().into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            crop_production_id: row.get("crop_production_id")?,
            transaction_id: row.get("transaction_id")?,
            stage: row.get("stage")?,
            stage_order: row.get("stage_order")?,
            stage_start_date: row.opt_timestamp("stage_start_date")?,
            stage_end_date: row.opt_timestamp("stage_end_date")?,
            location: row.get("location")?,
            facility_name: row.get("facility_name")?,
            quantity_in: row.get("quantity_in")?,
            quantity_out: row.get("quantity_out")?,
            unit: row.get("unit")?,
            loss_quantity: row.get("loss_quantity")?,
            loss_percentage: row.get("loss_percentage")?,
            quality_status: row.get("quality_status")?,
            responsible_party: row.get("responsible_party")?,
            cost_incurred: row.get("cost_incurred")?,
            insurance_coverage: row.get("insurance_coverage")?,
            tracking_code: row.get("tracking_code")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
