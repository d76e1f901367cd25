//! Irrigation need forecasts

use chrono::{DateTime, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::irrigation_data::IrrigationMethod;
use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

string_enum! {
    pub enum IrrigationAlertLevel {
        Low => "LOW",
        Moderate => "MODERATE",
        High => "HIGH",
        Critical => "CRITICAL",
    }
}

/// Forecast water need for a farm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrrigationPrediction {
    pub id: String,
    pub farm_id: String,
    pub crop_production_id: Option<String>,
    pub prediction_date: DateTime<Utc>,
    /// Litres
    pub predicted_water_need: f64,
    pub predicted_irrigation_frequency: Option<i32>,
    pub recommended_method: Option<IrrigationMethod>,
    pub water_stress_risk: Option<f64>,
    pub confidence_level: Option<f64>,
    pub cost_estimation: Option<f64>,
    pub alert_level: IrrigationAlertLevel,
    pub recommendations: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IrrigationPrediction {
    /// Create a new irrigation prediction with a fresh id
    pub fn new(
        farm_id: impl Into<String>,
        prediction_date: DateTime<Utc>,
        predicted_water_need: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            farm_id: farm_id.into(),
            crop_production_id: None,
            prediction_date,
            predicted_water_need,
            predicted_irrigation_frequency: None,
            recommended_method: None,
            water_stress_risk: None,
            confidence_level: None,
            cost_estimation: None,
            alert_level: IrrigationAlertLevel::Low,
            recommendations: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum IrrigationPredictionIden {
    #[iden = "irrigation_predictions"]
    Table,
    Id,
    FarmId,
    CropProductionId,
    PredictionDate,
    PredictedWaterNeed,
    PredictedIrrigationFrequency,
    RecommendedMethod,
    WaterStressRisk,
    ConfidenceLevel,
    CostEstimation,
    AlertLevel,
    Recommendations,
    CreatedAt,
    UpdatedAt,
}

impl Entity for IrrigationPrediction {
    type Column = IrrigationPredictionIden;

    const NAME: &'static str = "irrigation prediction";
    const TABLE: IrrigationPredictionIden = IrrigationPredictionIden::Table;
    const ID: IrrigationPredictionIden = IrrigationPredictionIden::Id;
    const COLUMNS: &'static [IrrigationPredictionIden] = &[
        IrrigationPredictionIden::Id,
        IrrigationPredictionIden::FarmId,
        IrrigationPredictionIden::CropProductionId,
        IrrigationPredictionIden::PredictionDate,
        IrrigationPredictionIden::PredictedWaterNeed,
        IrrigationPredictionIden::PredictedIrrigationFrequency,
        IrrigationPredictionIden::RecommendedMethod,
        IrrigationPredictionIden::WaterStressRisk,
        IrrigationPredictionIden::ConfidenceLevel,
        IrrigationPredictionIden::CostEstimation,
        IrrigationPredictionIden::AlertLevel,
        IrrigationPredictionIden::Recommendations,
        IrrigationPredictionIden::CreatedAt,
        IrrigationPredictionIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.farm_id.clone().into(),
            self.crop_production_id.clone().into(),
            codec::ts(self.prediction_date).into(),
            self.predicted_water_need.into(),
            self.predicted_irrigation_frequency.into(),
            self.recommended_method.into(),
            self.water_stress_risk.into(),
            self.confidence_level.into(),
            self.cost_estimation.into(),
            self.alert_level.into(),
            self.recommendations.clone().into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            farm_id: row.get("farm_id")?,
            crop_production_id: row.get("crop_production_id")?,
            prediction_date: row.timestamp("prediction_date")?,
            predicted_water_need: row.get("predicted_water_need")?,
            predicted_irrigation_frequency: row.get("predicted_irrigation_frequency")?,
            recommended_method: row.get("recommended_method")?,
            water_stress_risk: row.get("water_stress_risk")?,
            confidence_level: row.get("confidence_level")?,
            cost_estimation: row.get("cost_estimation")?,
            alert_level: row.get("alert_level")?,
            recommendations: row.get("recommendations")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
