//! Farms and their physical characteristics

use chrono::{DateTime, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

string_enum! {
    /// How a farm is watered
    pub enum IrrigationSystem {
        RainFed => "RAIN_FED",
        Sprinkler => "SPRINKLER",
        Drip => "DRIP",
        Flood => "FLOOD",
        Manual => "MANUAL",
    }
}

string_enum! {
    pub enum RoadAccessQuality {
        Good => "GOOD",
        Moderate => "MODERATE",
        Poor => "POOR",
    }
}

string_enum! {
    pub enum Topography {
        Flat => "FLAT",
        Hilly => "HILLY",
        Mountainous => "MOUNTAINOUS",
    }
}

/// A parcel of land worked by one farmer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Farm {
    pub id: String,
    pub farmer_id: String,
    pub farm_name: String,
    pub farm_code: String,
    /// Size in hectares
    pub farm_size: f64,
    pub soil_type: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Metres above sea level
    pub altitude: Option<f64>,
    pub irrigation_system: IrrigationSystem,
    pub topography: Option<Topography>,
    pub water_source: Option<String>,
    pub electricity_available: bool,
    pub road_access_quality: RoadAccessQuality,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Farm {
    /// Create a new farm with a fresh id
    pub fn new(
        farmer_id: impl Into<String>,
        farm_name: impl Into<String>,
        farm_code: impl Into<String>,
        farm_size: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            farmer_id: farmer_id.into(),
            farm_name: farm_name.into(),
            farm_code: farm_code.into(),
            farm_size,
            soil_type: None,
            latitude: None,
            longitude: None,
            altitude: None,
            irrigation_system: IrrigationSystem::RainFed,
            topography: None,
            water_source: None,
            electricity_available: false,
            road_access_quality: RoadAccessQuality::Moderate,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum FarmIden {
    #[iden = "farms"]
    Table,
    Id,
    FarmerId,
    FarmName,
    FarmCode,
    FarmSize,
    SoilType,
    Latitude,
    Longitude,
    Altitude,
    IrrigationSystem,
    Topography,
    WaterSource,
    ElectricityAvailable,
    RoadAccessQuality,
    CreatedAt,
    UpdatedAt,
}

impl Entity for Farm {
    type Column = FarmIden;

    const NAME: &'static str = "farm";
    const TABLE: FarmIden = FarmIden::Table;
    const ID: FarmIden = FarmIden::Id;
    const COLUMNS: &'static [FarmIden] = &[
        FarmIden::Id,
        FarmIden::FarmerId,
        FarmIden::FarmName,
        FarmIden::FarmCode,
        FarmIden::FarmSize,
        FarmIden::SoilType,
        FarmIden::Latitude,
        FarmIden::Longitude,
        FarmIden::Altitude,
        FarmIden::IrrigationSystem,
        FarmIden::Topography,
        FarmIden::WaterSource,
        FarmIden::ElectricityAvailable,
        FarmIden::RoadAccessQuality,
        FarmIden::CreatedAt,
        FarmIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.farmer_id.clone().into(),
            self.farm_name.clone().into(),
            self.farm_code.clone().into(),
            self.farm_size.into(),
            self.soil_type.clone().into(),
            self.latitude.into(),
            self.longitude.into(),
            self.altitude.into(),
            self.irrigation_system.into(),
            self.topography.into(),
            self.water_source.clone().into(),
            self.electricity_available.into(),
            self.road_access_quality.into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            farmer_id: row.get("farmer_id")?,
            farm_name: row.get("farm_name")?,
            farm_code: row.get("farm_code")?,
            farm_size: row.get("farm_size")?,
            soil_type: row.get("soil_type")?,
            latitude: row.get("latitude")?,
            longitude: row.get("longitude")?,
            altitude: row.get("altitude")?,
            irrigation_system: row.get("irrigation_system")?,
            topography: row.get("topography")?,
            water_source: row.get("water_source")?,
            electricity_available: row.get("electricity_available")?,
            road_access_quality: row.get("road_access_quality")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
