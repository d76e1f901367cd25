//! Generated advice for farmers

use chrono::{DateTime, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

string_enum! {
    pub enum AiRecommendationType {
        Fertilizer => "FERTILIZER",
        Water => "WATER",
        Seeds => "SEEDS",
        Pesticide => "PESTICIDE",
        Harvest => "HARVEST",
        Planting => "PLANTING",
        SoilManagement => "SOIL_MANAGEMENT",
        PestControl => "PEST_CONTROL",
        DiseasePrevention => "DISEASE_PREVENTION",
        Irrigation => "IRRIGATION",
        CropRotation => "CROP_ROTATION",
        MarketTiming => "MARKET_TIMING",
        Storage => "STORAGE",
        WeatherAdaptation => "WEATHER_ADAPTATION",
        General => "GENERAL",
    }
}

string_enum! {
    /// Urgency of a recommendation, most urgent first
    pub enum AiPriority {
        Urgent => "URGENT",
        High => "HIGH",
        Medium => "MEDIUM",
        Low => "LOW",
    }
}

/// A generated piece of advice addressed to a farmer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiRecommendation {
    pub id: String,
    pub farmer_id: String,
    pub farm_id: Option<String>,
    pub crop_production_id: Option<String>,
    pub recommendation_type: AiRecommendationType,
    pub title: String,
    pub description: Option<String>,
    pub priority: AiPriority,
    pub confidence_score: Option<f64>,
    pub generated_by: Option<String>,
    pub is_read: bool,
    pub is_implemented: bool,
    pub implementation_date: Option<DateTime<Utc>>,
    pub effectiveness_rating: Option<i32>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AiRecommendation {
    /// Create a new ai recommendation with a fresh id
    pub fn new(
        farmer_id: impl Into<String>,
        recommendation_type: AiRecommendationType,
        title: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            farmer_id: farmer_id.into(),
            farm_id: None,
            crop_production_id: None,
            recommendation_type,
            title: title.into(),
            description: None,
            priority: AiPriority::Medium,
            confidence_score: None,
            generated_by: None,
            is_read: false,
            is_implemented: false,
            implementation_date: None,
            effectiveness_rating: None,
            valid_until: None,
            is_active: true,
            read_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum AiRecommendationIden {
    #[iden = "ai_recommendations"]
    Table,
    Id,
    FarmerId,
    FarmId,
    CropProductionId,
    RecommendationType,
    Title,
    Description,
    Priority,
    ConfidenceScore,
    GeneratedBy,
    IsRead,
    IsImplemented,
    ImplementationDate,
    EffectivenessRating,
    ValidUntil,
    IsActive,
    ReadAt,
    CreatedAt,
    UpdatedAt,
}

impl Entity for AiRecommendation {
    type Column = AiRecommendationIden;

    const NAME: &'static str = "ai recommendation";
    const TABLE: AiRecommendationIden = AiRecommendationIden::Table;
    const ID: AiRecommendationIden = AiRecommendationIden::Id;
    const COLUMNS: &'static [AiRecommendationIden] = &[
        AiRecommendationIden::Id,
        AiRecommendationIden::FarmerId,
        AiRecommendationIden::FarmId,
        AiRecommendationIden::CropProductionId,
        AiRecommendationIden::RecommendationType,
        AiRecommendationIden::Title,
        AiRecommendationIden::Description,
        AiRecommendationIden::Priority,
        AiRecommendationIden::ConfidenceScore,
        AiRecommendationIden::GeneratedBy,
        AiRecommendationIden::IsRead,
        AiRecommendationIden::IsImplemented,
        AiRecommendationIden::ImplementationDate,
        AiRecommendationIden::EffectivenessRating,
        AiRecommendationIden::ValidUntil,
        AiRecommendationIden::IsActive,
        AiRecommendationIden::ReadAt,
        AiRecommendationIden::CreatedAt,
        AiRecommendationIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.farmer_id.clone().into(),
            self.farm_id.clone().into(),
            self.crop_production_id.clone().into(),
            self.recommendation_type.into(),
            self.title.clone().into(),
            self.description.clone().into(),
            self.priority.into(),
            self.confidence_score.into(),
            self.generated_by.clone().into(),
            self.is_read.into(),
            self.is_implemented.into(),
            codec::opt_ts(self.implementation_date).into(),
            self.effectiveness_rating.into(),
            codec::opt_ts(self.valid_until).into(),
            self.is_active.into(),
            codec::opt_ts(self.read_at).into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            farmer_id: row.get("farmer_id")?,
            farm_id: row.get("farm_id")?,
            crop_production_id: row.get("crop_production_id")?,
            recommendation_type: row.get("recommendation_type")?,
            title: row.get("title")?,
            description: row.get("description")?,
            priority: row.get("priority")?,
            confidence_score: row.get("confidence_score")?,
            generated_by: row.get("generated_by")?,
            is_read: row.get("is_read")?,
            is_implemented: row.get("is_implemented")?,
            implementation_date: row.opt_timestamp("implementation_date")?,
            effectiveness_rating: row.get("effectiveness_rating")?,
            valid_until: row.opt_timestamp("valid_until")?,
            is_active: row.get("is_active")?,
            read_at: row.opt_timestamp("read_at")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
