//! Regional environmental monitoring

use chrono::{DateTime, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{DataQuality, ValidationStatus};
use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

string_enum! {
    pub enum EnvironmentalRiskLevel {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Critical => "CRITICAL",
    }
}

/// Environmental indicators recorded for a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalData {
    pub id: String,
    pub monitoring_code: String,
    pub region: String,
    pub district: Option<String>,
    pub sector: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub record_date: DateTime<Utc>,
    pub data_source: Option<String>,
    pub air_quality_index: Option<i32>,
    pub water_quality_index: Option<i32>,
    pub forest_coverage: Option<f64>,
    pub carbon_emission: Option<f64>,
    pub biodiversity_index: Option<f64>,
    pub soil_erosion_rate: Option<f64>,
    pub environmental_risk_level: EnvironmentalRiskLevel,
    pub data_quality: DataQuality,
    pub validation_status: ValidationStatus,
    pub validated_by: Option<String>,
    pub validation_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EnvironmentalData {
    /// Create a new environmental data with a fresh id
    pub fn new(
        monitoring_code: impl Into<String>,
        region: impl Into<String>,
        record_date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            monitoring_code: monitoring_code.into(),
            region: region.into(),
            district: None,
            sector: None,
            latitude: None,
            longitude: None,
            record_date,
            data_source: None,
            air_quality_index: None,
            water_quality_index: None,
            forest_coverage: None,
            carbon_emission: None,
            biodiversity_index: None,
            soil_erosion_rate: None,
            environmental_risk_level: EnvironmentalRiskLevel::Low,
            data_quality: DataQuality::Good,
            validation_status: ValidationStatus::Pending,
            validated_by: None,
            validation_date: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum EnvironmentalDataIden {
    #[iden = "environmental_data"]
    Table,
    Id,
    MonitoringCode,
    Region,
    District,
    Sector,
    Latitude,
    Longitude,
    RecordDate,
    DataSource,
    AirQualityIndex,
    WaterQualityIndex,
    ForestCoverage,
    CarbonEmission,
    BiodiversityIndex,
    SoilErosionRate,
    EnvironmentalRiskLevel,
    DataQuality,
    ValidationStatus,
    ValidatedBy,
    ValidationDate,
    Notes,
    CreatedAt,
    UpdatedAt,
}

impl Entity for EnvironmentalData {
    type Column = EnvironmentalDataIden;

    const NAME: &'static str = "environmental data";
    const TABLE: EnvironmentalDataIden = EnvironmentalDataIden::Table;
    const ID: EnvironmentalDataIden = EnvironmentalDataIden::Id;
    const COLUMNS: &'static [EnvironmentalDataIden] = &[
        EnvironmentalDataIden::Id,
        EnvironmentalDataIden::MonitoringCode,
        EnvironmentalDataIden::Region,
        EnvironmentalDataIden::District,
        EnvironmentalDataIden::Sector,
        EnvironmentalDataIden::Latitude,
        EnvironmentalDataIden::Longitude,
        EnvironmentalDataIden::RecordDate,
        EnvironmentalDataIden::DataSource,
        EnvironmentalDataIden::AirQualityIndex,
        EnvironmentalDataIden::WaterQualityIndex,
        EnvironmentalDataIden::ForestCoverage,
        EnvironmentalDataIden::CarbonEmission,
        EnvironmentalDataIden::BiodiversityIndex,
        EnvironmentalDataIden::SoilErosionRate,
        EnvironmentalDataIden::EnvironmentalRiskLevel,
        EnvironmentalDataIden::DataQuality,
        EnvironmentalDataIden::ValidationStatus,
        EnvironmentalDataIden::ValidatedBy,
        EnvironmentalDataIden::ValidationDate,
        EnvironmentalDataIden::Notes,
        EnvironmentalDataIden::CreatedAt,
        EnvironmentalDataIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.monitoring_code.clone().into(),
            self.region.clone().into(),
            self.district.clone().into(),
            self.sector.clone().into(),
            self.latitude.into(),
            self.longitude.into(),
            codec::ts(self.record_date).into(),
            self.data_source.clone().into(),
            self.air_quality_index.into(),
            self.water_quality_index.into(),
            self.forest_coverage.into(),
            self.carbon_emission.into(),
            self.biodiversity_index.into(),
            self.soil_erosion_rate.into(),
            self.environmental_risk_level.into(),
            self.data_quality.into(),
            self.validation_status.into(),
            self.validated_by.clone().into(),
            codec::opt_ts(self.validation_date).into(),
            self.notes.clone().into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            monitoring_code: row.get("monitoring_code")?,
            region: row.get("region")?,
            district: row.get("district")?,
            sector: row.get("sector")?,
            latitude: row.get("latitude")?,
            longitude: row.get("longitude")?,
            record_date: row.timestamp("record_date")?,
            data_source: row.get("data_source")?,
            air_quality_index: row.get("air_quality_index")?,
            water_quality_index: row.get("water_quality_index")?,
            forest_coverage: row.get("forest_coverage")?,
            carbon_emission: row.get("carbon_emission")?,
            biodiversity_index: row.get("biodiversity_index")?,
            soil_erosion_rate: row.get("soil_erosion_rate")?,
            environmental_risk_level: row.get("environmental_risk_level")?,
            data_quality: row.get("data_quality")?,
            validation_status: row.get("validation_status")?,
            validated_by: row.get("validated_by")?,
            validation_date: row.opt_timestamp("validation_date")?,
            notes: row.get("notes")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
