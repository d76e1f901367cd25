//! Irrigation events

use chrono::{DateTime, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

string_enum! {
    pub enum IrrigationMethod {
        Sprinkler => "SPRINKLER",
        Drip => "DRIP",
        Flood => "FLOOD",
        Furrow => "FURROW",
        Manual => "MANUAL",
    }
}

string_enum! {
    pub enum WaterSource {
        Well => "WELL",
        River => "RIVER",
        Lake => "LAKE",
        Rainwater => "RAINWATER",
        Municipal => "MUNICIPAL",
    }
}

/// Water applied to a farm in one irrigation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrrigationData {
    pub id: String,
    pub farm_id: String,
    pub crop_production_id: Option<String>,
    pub irrigation_date: DateTime<Utc>,
    /// Litres
    pub water_amount: f64,
    pub irrigation_method: IrrigationMethod,
    /// Minutes
    pub duration: Option<i32>,
    pub water_source: Option<WaterSource>,
    pub water_cost: Option<f64>,
    pub total_cost: Option<f64>,
    pub soil_moisture_before: Option<f64>,
    pub soil_moisture_after: Option<f64>,
    pub operator_name: Option<String>,
    pub equipment_used: Option<String>,
    pub fertilizer_applied: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IrrigationData {
    /// Create a new irrigation data with a fresh id
    pub fn new(
        farm_id: impl Into<String>,
        irrigation_date: DateTime<Utc>,
        water_amount: f64,
        irrigation_method: IrrigationMethod,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            farm_id: farm_id.into(),
            crop_production_id: None,
            irrigation_date,
            water_amount,
            irrigation_method,
            duration: None,
            water_source: None,
            water_cost: None,
            total_cost: None,
            soil_moisture_before: None,
            soil_moisture_after: None,
            operator_name: None,
            equipment_used: None,
            fertilizer_applied: false,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum IrrigationDataIden {
    #[iden = "irrigation_data"]
    Table,
    Id,
    FarmId,
    CropProductionId,
    IrrigationDate,
    WaterAmount,
    IrrigationMethod,
    Duration,
    WaterSource,
    WaterCost,
    TotalCost,
    SoilMoistureBefore,
    SoilMoistureAfter,
    OperatorName,
    EquipmentUsed,
    FertilizerApplied,
    Notes,
    CreatedAt,
    UpdatedAt,
}

impl Entity for IrrigationData {
    type Column = IrrigationDataIden;

    const NAME: &'static str = "irrigation data";
    const TABLE: IrrigationDataIden = IrrigationDataIden::Table;
    const ID: IrrigationDataIden = IrrigationDataIden::Id;
    const COLUMNS: &'static [IrrigationDataIden] = &[
        IrrigationDataIden::Id,
        IrrigationDataIden::FarmId,
        IrrigationDataIden::CropProductionId,
        IrrigationDataIden::IrrigationDate,
        IrrigationDataIden::WaterAmount,
        IrrigationDataIden::IrrigationMethod,
        IrrigationDataIden::Duration,
        IrrigationDataIden::WaterSource,
        IrrigationDataIden::WaterCost,
        IrrigationDataIden::TotalCost,
        IrrigationDataIden::SoilMoistureBefore,
        IrrigationDataIden::SoilMoistureAfter,
        IrrigationDataIden::OperatorName,
        IrrigationDataIden::EquipmentUsed,
        IrrigationDataIden::FertilizerApplied,
        IrrigationDataIden::Notes,
        IrrigationDataIden::CreatedAt,
        IrrigationDataIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.farm_id.clone().into(),
            self.crop_production_id.clone().into(),
            codec::ts(self.irrigation_date).into(),
            self.water_amount.into(),
            self.irrigation_method.into(),
            self.duration.into(),
            self.water_source.into(),
            self.water_cost.into(),
            self.total_cost.into(),
            self.soil_moisture_before.into(),
            self.soil_moisture_after.into(),
            self.operator_name.clone().into(),
            self.equipment_used.clone().into(),
            self.fertilizer_applied.into(),
            self.notes.clone().into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            farm_id: row.get("farm_id")?,
            crop_production_id: row.get("crop_production_id")?,
            irrigation_date: row.timestamp("irrigation_date")?,
            water_amount: row.get("water_amount")?,
            irrigation_method: row.get("irrigation_method")?,
            duration: row.get("duration")?,
            water_source: row.get("water_source")?,
            water_cost: row.get("water_cost")?,
            total_cost: row.get("total_cost")?,
            soil_moisture_before: row.get("soil_moisture_before")?,
            soil_moisture_after: row.get("soil_moisture_after")?,
            operator_name: row.get("operator_name")?,
            equipment_used: row.get("equipment_used")?,
            fertilizer_applied: row.get("fertilizer_applied")?,
            notes: row.get("notes")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
