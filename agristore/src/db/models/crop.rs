//! Crop catalogue

use chrono::{DateTime, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

string_enum! {
    pub enum CropType {
        Cereals => "CEREALS",
        Vegetables => "VEGETABLES",
        Fruits => "FRUITS",
        Legumes => "LEGUMES",
        Tubers => "TUBERS",
        CashCrops => "CASH_CROPS",
    }
}

string_enum! {
    pub enum MarketDemandLevel {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
    }
}

/// A cultivated crop and its agronomic requirements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Crop {
    pub id: String,
    pub crop_name: String,
    pub crop_type: CropType,
    pub scientific_name: Option<String>,
    pub variety: Option<String>,
    pub growing_period_days: Option<i32>,
    pub planting_season: Option<String>,
    pub harvest_season: Option<String>,
    /// Millimetres per season
    pub water_requirement: Option<f64>,
    pub soil_ph_min: Option<f64>,
    pub soil_ph_max: Option<f64>,
    /// Degrees Celsius
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub market_demand_level: MarketDemandLevel,
    pub storage_life_days: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Crop {
    /// Create a new crop with a fresh id
    pub fn new(crop_name: impl Into<String>, crop_type: CropType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            crop_name: crop_name.into(),
            crop_type,
            scientific_name: None,
            variety: None,
            growing_period_days: None,
            planting_season: None,
            harvest_season: None,
            water_requirement: None,
            soil_ph_min: None,
            soil_ph_max: None,
            temperature_min: None,
            temperature_max: None,
            market_demand_level: MarketDemandLevel::Medium,
            storage_life_days: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum CropIden {
    #[iden = "crops"]
    Table,
    Id,
    CropName,
    CropType,
    ScientificName,
    Variety,
    GrowingPeriodDays,
    PlantingSeason,
    HarvestSeason,
    WaterRequirement,
    SoilPhMin,
    SoilPhMax,
    TemperatureMin,
    TemperatureMax,
    MarketDemandLevel,
    StorageLifeDays,
    CreatedAt,
    UpdatedAt,
}

impl Entity for Crop {
    type Column = CropIden;

    const NAME: &'static str = "crop";
    const TABLE: CropIden = CropIden::Table;
    const ID: CropIden = CropIden::Id;
    const COLUMNS: &'static [CropIden] = &[
        CropIden::Id,
        CropIden::CropName,
        CropIden::CropType,
        CropIden::ScientificName,
        CropIden::Variety,
        CropIden::GrowingPeriodDays,
        CropIden::PlantingSeason,
        CropIden::HarvestSeason,
        CropIden::WaterRequirement,
        CropIden::SoilPhMin,
        CropIden::SoilPhMax,
        CropIden::TemperatureMin,
        CropIden::TemperatureMax,
        CropIden::MarketDemandLevel,
        CropIden::StorageLifeDays,
        CropIden::CreatedAt,
        CropIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.crop_name.clone().into(),
            self.crop_type.into(),
            self.scientific_name.clone().into(),
            self.variety.clone().into(),
            self.growing_period_days.into(),
            self.planting_season.clone().into(),
            self.harvest_season.clone().into(),
            self.water_requirement.into(),
            self.soil_ph_min.into(),
            self.soil_ph_max.into(),
            self.temperature_min.into(),
            self.temperature_max.into(),
            self.market_demand_level.into(),
            self.storage_life_days.into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            crop_name: row.get("crop_name")?,
            crop_type: row.get("crop_type")?,
            scientific_name: row.get("scientific_name")?,
            variety: row.get("variety")?,
            growing_period_days: row.get("growing_period_days")?,
            planting_season: row.get("planting_season")?,
            harvest_season: row.get("harvest_season")?,
            water_requirement: row.get("water_requirement")?,
            soil_ph_min: row.get("soil_ph_min")?,
            soil_ph_max: row.get("soil_ph_max")?,
            temperature_min: row.get("temperature_min")?,
            temperature_max: row.get("temperature_max")?,
            market_demand_level: row.get("market_demand_level")?,
            storage_life_days: row.get("storage_life_days")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
