//! Resource recommendations for farms

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

string_enum! {
    pub enum ResourceType {
        Fertilizer => "FERTILIZER",
        Water => "WATER",
        Seeds => "SEEDS",
        Pesticide => "PESTICIDE",
        Equipment => "EQUIPMENT",
        Labor => "LABOR",
        Financing => "FINANCING",
    }
}

string_enum! {
    pub enum RecommendationCategory {
        Optimization => "OPTIMIZATION",
        ProblemSolving => "PROBLEM_SOLVING",
        Preventive => "PREVENTIVE",
        Seasonal => "SEASONAL",
        Emergency => "EMERGENCY",
    }
}

string_enum! {
    pub enum PriorityLevel {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Urgent => "URGENT",
    }
}

string_enum! {
    pub enum RecommendationStatus {
        Active => "ACTIVE",
        Implemented => "IMPLEMENTED",
        Expired => "EXPIRED",
        Rejected => "REJECTED",
        Superseded => "SUPERSEDED",
    }
}

/// A recommended use of a resource on a farm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecommendation {
    pub id: String,
    pub recommendation_code: String,
    pub farm_id: String,
    pub crop_production_id: Option<String>,
    pub resource_type: ResourceType,
    pub recommendation_category: RecommendationCategory,
    pub priority_level: PriorityLevel,
    pub title: String,
    pub description: Option<String>,
    pub recommended_quantity: Option<f64>,
    pub unit: Option<String>,
    pub estimated_cost: Option<f64>,
    pub confidence_score: Option<f64>,
    pub generated_date: DateTime<Utc>,
    pub valid_until: Option<NaiveDate>,
    pub status: RecommendationStatus,
    pub implementation_date: Option<NaiveDate>,
    pub effectiveness_rating: Option<i32>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceRecommendation {
    /// Create a new resource recommendation with a fresh id
    pub fn new(
        recommendation_code: impl Into<String>,
        farm_id: impl Into<String>,
        resource_type: ResourceType,
        recommendation_category: RecommendationCategory,
        priority_level: PriorityLevel,
        title: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            recommendation_code: recommendation_code.into(),
            farm_id: farm_id.into(),
            crop_production_id: None,
            resource_type,
            recommendation_category,
            priority_level,
            title: title.into(),
            description: None,
            recommended_quantity: None,
            unit: None,
            estimated_cost: None,
            confidence_score: None,
            generated_date: Utc::now(),
            valid_until: None,
            status: RecommendationStatus::Active,
            implementation_date: None,
            effectiveness_rating: None,
            created_by: "AI_SYSTEM".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum ResourceRecommendationIden {
    #[iden = "resource_recommendations"]
    Table,
    Id,
    RecommendationCode,
    FarmId,
    CropProductionId,
    ResourceType,
    RecommendationCategory,
    PriorityLevel,
    Title,
    Description,
    RecommendedQuantity,
    Unit,
    EstimatedCost,
    ConfidenceScore,
    GeneratedDate,
    ValidUntil,
    Status,
    ImplementationDate,
    EffectivenessRating,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

impl Entity for ResourceRecommendation {
    type Column = ResourceRecommendationIden;

    const NAME: &'static str = "resource recommendation";
    const TABLE: ResourceRecommendationIden = ResourceRecommendationIden::Table;
    const ID: ResourceRecommendationIden = ResourceRecommendationIden::Id;
    const COLUMNS: &'static [ResourceRecommendationIden] = &[
        ResourceRecommendationIden::Id,
        ResourceRecommendationIden::RecommendationCode,
        ResourceRecommendationIden::FarmId,
        ResourceRecommendationIden::CropProductionId,
        ResourceRecommendationIden::ResourceType,
        ResourceRecommendationIden::RecommendationCategory,
        ResourceRecommendationIden::PriorityLevel,
        ResourceRecommendationIden::Title,
        ResourceRecommendationIden::Description,
        ResourceRecommendationIden::RecommendedQuantity,
        ResourceRecommendationIden::Unit,
        ResourceRecommendationIden::EstimatedCost,
        ResourceRecommendationIden::ConfidenceScore,
        ResourceRecommendationIden::GeneratedDate,
        ResourceRecommendationIden::ValidUntil,
        ResourceRecommendationIden::Status,
        ResourceRecommendationIden::ImplementationDate,
        ResourceRecommendationIden::EffectivenessRating,
        ResourceRecommendationIden::CreatedBy,
        ResourceRecommendationIden::CreatedAt,
        ResourceRecommendationIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.recommendation_code.clone().into(),
            self.farm_id.clone().into(),
            self.crop_production_id.clone().into(),
            self.resource_type.into(),
            self.recommendation_category.into(),
            self.priority_level.into(),
            self.title.clone().into(),
            self.description.clone().into(),
            self.recommended_quantity.into(),
            self.unit.clone().into(),
            self.estimated_cost.into(),
            self.confidence_score.into(),
            codec::ts(self.generated_date).into(),
            codec::opt_date(self.valid_until).into(),
            self.status.into(),
            codec::opt_date(self.implementation_date).into(),
            self.effectiveness_rating.into(),
            self.created_by.clone().into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            recommendation_code: row.get("recommendation_code")?,
            farm_id: row.get("farm_id")?,
            crop_production_id: row.get("crop_production_id")?,
            resource_type: row.get("resource_type")?,
            recommendation_category: row.get("recommendation_category")?,
            priority_level: row.get("priority_level")?,
            title: row.get("title")?,
            description: row.get("description")?,
            recommended_quantity: row.get("recommended_quantity")?,
            unit: row.get("unit")?,
            estimated_cost: row.get("estimated_cost")?,
            confidence_score: row.get("confidence_score")?,
            generated_date: row.timestamp("generated_date")?,
            valid_until: row.opt_date("valid_until")?,
            status: row.get("status")?,
            implementation_date: row.opt_date("implementation_date")?,
            effectiveness_rating: row.get("effectiveness_rating")?,
            created_by: row.get("created_by")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
