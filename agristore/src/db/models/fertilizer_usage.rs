//! Fertilizer applications

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

string_enum! {
    pub enum FertilizerType {
        Organic => "ORGANIC",
        Npk => "NPK",
        Nitrogen => "NITROGEN",
        Phosphate => "PHOSPHATE",
        Potash => "POTASH",
        Micronutrients => "MICRONUTRIENTS",
    }
}

string_enum! {
    pub enum FertilizerUnit {
        Kg => "KG",
        Tonnes => "TONNES",
        Liters => "LITERS",
        Bags => "BAGS",
    }
}

string_enum! {
    pub enum ApplicationMethod {
        Broadcast => "BROADCAST",
        Band => "BAND",
        Foliar => "FOLIAR",
        Fertigation => "FERTIGATION",
        Spot => "SPOT",
    }
}

/// One application of fertilizer to a production cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FertilizerUsage {
    pub id: String,
    pub crop_production_id: String,
    pub fertilizer_type: FertilizerType,
    pub fertilizer_name: String,
    pub brand: Option<String>,
    pub quantity: f64,
    pub unit: FertilizerUnit,
    pub application_date: NaiveDate,
    pub application_method: ApplicationMethod,
    pub application_stage: Option<String>,
    pub cost_per_unit: Option<f64>,
    pub total_cost: Option<f64>,
    pub supplier: Option<String>,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    /// 1 to 10
    pub effectiveness_rating: Option<i32>,
    pub operator_name: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FertilizerUsage {
    /// Create a new fertilizer usage with a fresh id
    pub fn new(
        crop_production_id: impl Into<String>,
        fertilizer_type: FertilizerType,
        fertilizer_name: impl Into<String>,
        quantity: f64,
        unit: FertilizerUnit,
        application_date: NaiveDate,
        application_method: ApplicationMethod,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            crop_production_id: crop_production_id.into(),
            fertilizer_type,
            fertilizer_name: fertilizer_name.into(),
            brand: None,
            quantity,
            unit,
            application_date,
            application_method,
            application_stage: None,
            cost_per_unit: None,
            total_cost: None,
            supplier: None,
            batch_number: None,
            expiry_date: None,
            effectiveness_rating: None,
            operator_name: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum FertilizerUsageIden {
    #[iden = "fertilizer_usages"]
    Table,
    Id,
    CropProductionId,
    FertilizerType,
    FertilizerName,
    Brand,
    Quantity,
    Unit,
    ApplicationDate,
    ApplicationMethod,
    ApplicationStage,
    CostPerUnit,
    TotalCost,
    Supplier,
    BatchNumber,
    ExpiryDate,
    EffectivenessRating,
    OperatorName,
    Notes,
    CreatedAt,
    UpdatedAt,
}

impl Entity for FertilizerUsage {
    type Column = FertilizerUsageIden;

    const NAME: &'static str = "fertilizer usage";
    const TABLE: FertilizerUsageIden = FertilizerUsageIden::Table;
    const ID: FertilizerUsageIden = FertilizerUsageIden::Id;
    const COLUMNS: &'static [FertilizerUsageIden] = &[
        FertilizerUsageIden::Id,
        FertilizerUsageIden::CropProductionId,
        FertilizerUsageIden::FertilizerType,
        FertilizerUsageIden::FertilizerName,
        FertilizerUsageIden::Brand,
        FertilizerUsageIden::Quantity,
        FertilizerUsageIden::Unit,
        FertilizerUsageIden::ApplicationDate,
        FertilizerUsageIden::ApplicationMethod,
        FertilizerUsageIden::ApplicationStage,
        FertilizerUsageIden::CostPerUnit,
        FertilizerUsageIden::TotalCost,
        FertilizerUsageIden::Supplier,
        FertilizerUsageIden::BatchNumber,
        FertilizerUsageIden::ExpiryDate,
        FertilizerUsageIden::EffectivenessRating,
        FertilizerUsageIden::OperatorName,
        FertilizerUsageIden::Notes,
        FertilizerUsageIden::CreatedAt,
        FertilizerUsageIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.crop_production_id.clone().into(),
            self.fertilizer_type.into(),
            self.fertilizer_name.clone().into(),
            self.brand.clone().into(),
            self.quantity.into(),
            self.unit.into(),
            codec::date(self.application_date).into(),
            self.application_method.into(),
            self.application_stage.clone().into(),
            self.cost_per_unit.into(),
            self.total_cost.into(),
            self.supplier.clone().into(),
            self.batch_number.clone().into(),
            codec::opt_date(self.expiry_date).into(),
            self.effectiveness_rating.into(),
            self.operator_name.clone().into(),
            self.notes.clone().into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            crop_production_id: row.get("crop_production_id")?,
            fertilizer_type: row.get("fertilizer_type")?,
            fertilizer_name: row.get("fertilizer_name")?,
            brand: row.get("brand")?,
            quantity: row.get("quantity")?,
            unit: row.get("unit")?,
            application_date: row.date("application_date")?,
            application_method: row.get("application_method")?,
            application_stage: row.get("application_stage")?,
            cost_per_unit: row.get("cost_per_unit")?,
            total_cost: row.get("total_cost")?,
            supplier: row.get("supplier")?,
            batch_number: row.get("batch_number")?,
            expiry_date: row.opt_date("expiry_date")?,
            effectiveness_rating: row.get("effectiveness_rating")?,
            operator_name: row.get("operator_name")?,
            notes: row.get("notes")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
