//! Production forecasts

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{ReportingSeason, ValidationStatus};
use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

string_enum! {
    pub enum PredictionType {
        Yield => "YIELD",
        TotalProduction => "TOTAL_PRODUCTION",
        PlantedArea => "PLANTED_AREA",
        HarvestPeriod => "HARVEST_PERIOD",
    }
}

/// A forecast of production for a crop, region or production cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionPrediction {
    pub id: String,
    pub prediction_code: String,
    pub crop_production_id: Option<String>,
    pub crop_id: Option<String>,
    pub region: Option<String>,
    pub district: Option<String>,
    pub year: i32,
    pub season: Option<ReportingSeason>,
    pub prediction_type: PredictionType,
    pub predicted_value: f64,
    pub unit: Option<String>,
    pub confidence_level: Option<f64>,
    pub model_used: Option<String>,
    pub model_version: Option<String>,
    pub prediction_date: DateTime<Utc>,
    pub target_date: Option<NaiveDate>,
    pub actual_value: Option<f64>,
    /// Percentage accuracy once the actual value is known
    pub accuracy_achieved: Option<f64>,
    pub validation_status: ValidationStatus,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductionPrediction {
    /// Create a new production prediction with a fresh id
    pub fn new(
        prediction_code: impl Into<String>,
        year: i32,
        prediction_type: PredictionType,
        predicted_value: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            prediction_code: prediction_code.into(),
            crop_production_id: None,
            crop_id: None,
            region: None,
            district: None,
            year,
            season: None,
            prediction_type,
            predicted_value,
            unit: None,
            confidence_level: None,
            model_used: None,
            model_version: None,
            prediction_date: Utc::now(),
            target_date: None,
            actual_value: None,
            accuracy_achieved: None,
            validation_status: ValidationStatus::Pending,
            published: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum ProductionPredictionIden {
    #[iden = "production_predictions"]
    Table,
    Id,
    PredictionCode,
    CropProductionId,
    CropId,
    Region,
    District,
    Year,
    Season,
    PredictionType,
    PredictedValue,
    Unit,
    ConfidenceLevel,
    ModelUsed,
    ModelVersion,
    PredictionDate,
    TargetDate,
    ActualValue,
    AccuracyAchieved,
    ValidationStatus,
    Published,
    CreatedAt,
    UpdatedAt,
}

impl Entity for ProductionPrediction {
    type Column = ProductionPredictionIden;

    const NAME: &'static str = "production prediction";
    const TABLE: ProductionPredictionIden = ProductionPredictionIden::Table;
    const ID: ProductionPredictionIden = ProductionPredictionIden::Id;
    const COLUMNS: &'static [ProductionPredictionIden] = &[
        ProductionPredictionIden::Id,
        ProductionPredictionIden::PredictionCode,
        ProductionPredictionIden::CropProductionId,
        ProductionPredictionIden::CropId,
        ProductionPredictionIden::Region,
        ProductionPredictionIden::District,
        ProductionPredictionIden::Year,
        ProductionPredictionIden::Season,
        ProductionPredictionIden::PredictionType,
        ProductionPredictionIden::PredictedValue,
        ProductionPredictionIden::Unit,
        ProductionPredictionIden::ConfidenceLevel,
        ProductionPredictionIden::ModelUsed,
        ProductionPredictionIden::ModelVersion,
        ProductionPredictionIden::PredictionDate,
        ProductionPredictionIden::TargetDate,
        ProductionPredictionIden::ActualValue,
        ProductionPredictionIden::AccuracyAchieved,
        ProductionPredictionIden::ValidationStatus,
        ProductionPredictionIden::Published,
        ProductionPredictionIden::CreatedAt,
        ProductionPredictionIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.prediction_code.clone().into(),
            self.crop_production_id.clone().into(),
            self.crop_id.clone().into(),
            self.region.clone().into(),
            self.district.clone().into(),
            self.year.into(),
            self.season.into(),
            self.prediction_type.into(),
            self.predicted_value.into(),
            self.unit.clone().into(),
            self.confidence_level.into(),
            self.model_used.clone().into(),
            self.model_version.clone().into(),
            codec::ts(self.prediction_date).into(),
            codec::opt_date(self.target_date).into(),
            self.actual_value.into(),
            self.accuracy_achieved.into(),
            self.validation_status.into(),
            self.published.into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            prediction_code: row.get("prediction_code")?,
            crop_production_id: row.get("crop_production_id")?,
            crop_id: row.get("crop_id")?,
            region: row.get("region")?,
            district: row.get("district")?,
            year: row.get("year")?,
            season: row.get("season")?,
            prediction_type: row.get("prediction_type")?,
            predicted_value: row.get("predicted_value")?,
            unit: row.get("unit")?,
            confidence_level: row.get("confidence_level")?,
            model_used: row.get("model_used")?,
            model_version: row.get("model_version")?,
            prediction_date: row.timestamp("prediction_date")?,
            target_date: row.opt_date("target_date")?,
            actual_value: row.get("actual_value")?,
            accuracy_achieved: row.get("accuracy_achieved")?,
            validation_status: row.get("validation_status")?,
            published: row.get("published")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
