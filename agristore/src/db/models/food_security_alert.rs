//! Food security alerts

use chrono::{DateTime, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

string_enum! {
    pub enum AlertCategory {
        Production => "PRODUCTION",
        Weather => "WEATHER",
        Market => "MARKET",
        Disease => "DISEASE",
        Policy => "POLICY",
        Infrastructure => "INFRASTRUCTURE",
    }
}

string_enum! {
    pub enum AlertLevel {
        Info => "INFO",
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Critical => "CRITICAL",
    }
}

string_enum! {
    pub enum SourceReliability {
        Verified => "VERIFIED",
        Unverified => "UNVERIFIED",
        Preliminary => "PRELIMINARY",
    }
}

string_enum! {
    pub enum ResolutionStatus {
        Unresolved => "UNRESOLVED",
        InProgress => "IN_PROGRESS",
        Resolved => "RESOLVED",
    }
}

/// An alert about a food security risk in a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodSecurityAlert {
    pub id: String,
    pub alert_code: String,
    pub alert_title: String,
    pub alert_category: AlertCategory,
    pub description: Option<String>,
    pub alert_level: AlertLevel,
    pub severity_score: Option<i32>,
    pub affected_region: String,
    pub affected_population: Option<i32>,
    pub alert_date: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub source_reliability: SourceReliability,
    pub is_active: bool,
    pub response_required: bool,
    pub resolution_status: ResolutionStatus,
    pub resolution_date: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FoodSecurityAlert {
    /// Create a new food security alert with a fresh id
    pub fn new(
        alert_code: impl Into<String>,
        alert_title: impl Into<String>,
        alert_category: AlertCategory,
        alert_level: AlertLevel,
        affected_region: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            alert_code: alert_code.into(),
            alert_title: alert_title.into(),
            alert_category,
            description: None,
            alert_level,
            severity_score: None,
            affected_region: affected_region.into(),
            affected_population: None,
            alert_date: Utc::now(),
            expiry_date: None,
            source: None,
            source_reliability: SourceReliability::Unverified,
            is_active: true,
            response_required: false,
            resolution_status: ResolutionStatus::Unresolved,
            resolution_date: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum FoodSecurityAlertIden {
    #[iden = "food_security_alerts"]
    Table,
    Id,
    AlertCode,
    AlertTitle,
    AlertCategory,
    Description,
    AlertLevel,
    SeverityScore,
    AffectedRegion,
    AffectedPopulation,
    AlertDate,
    ExpiryDate,
    Source,
    SourceReliability,
    IsActive,
    ResponseRequired,
    ResolutionStatus,
    ResolutionDate,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

impl Entity for FoodSecurityAlert {
    type Column = FoodSecurityAlertIden;

    const NAME: &'static str = "food security alert";
    const TABLE: FoodSecurityAlertIden = FoodSecurityAlertIden::Table;
    const ID: FoodSecurityAlertIden = FoodSecurityAlertIden::Id;
    const COLUMNS: &'static [FoodSecurityAlertIden] = &[
        FoodSecurityAlertIden::Id,
        FoodSecurityAlertIden::AlertCode,
        FoodSecurityAlertIden::AlertTitle,
        FoodSecurityAlertIden::AlertCategory,
        FoodSecurityAlertIden::Description,
        FoodSecurityAlertIden::AlertLevel,
        FoodSecurityAlertIden::SeverityScore,
        FoodSecurityAlertIden::AffectedRegion,
        FoodSecurityAlertIden::AffectedPopulation,
        FoodSecurityAlertIden::AlertDate,
        FoodSecurityAlertIden::ExpiryDate,
        FoodSecurityAlertIden::Source,
        FoodSecurityAlertIden::SourceReliability,
        FoodSecurityAlertIden::IsActive,
        FoodSecurityAlertIden::ResponseRequired,
        FoodSecurityAlertIden::ResolutionStatus,
        FoodSecurityAlertIden::ResolutionDate,
        FoodSecurityAlertIden::CreatedBy,
        FoodSecurityAlertIden::CreatedAt,
        FoodSecurityAlertIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.alert_code.clone().into(),
            self.alert_title.clone().into(),
            self.alert_category.into(),
            self.description.clone().into(),
            self.alert_level.into(),
            self.severity_score.into(),
            self.affected_region.clone().into(),
            self.affected_population.into(),
            codec::ts(self.alert_date).into(),
            codec::opt_ts(self.expiry_date).into(),
            self.source.clone().into(),
            self.source_reliability.into(),
            self.is_active.into(),
            self.response_required.into(),
            self.resolution_status.into(),
            codec::opt_ts(self.resolution_date).into(),
            self.created_by.clone().into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            alert_code: row.get("alert_code")?,
            alert_title: row.get("alert_title")?,
            alert_category: row.get("alert_category")?,
            description: row.get("description")?,
            alert_level: row.get("alert_level")?,
            severity_score: row.get("severity_score")?,
            affected_region: row.get("affected_region")?,
            affected_population: row.get("affected_population")?,
            alert_date: row.timestamp("alert_date")?,
            expiry_date: row.opt_timestamp("expiry_date")?,
            source: row.get("source")?,
            source_reliability: row.get("source_reliability")?,
            is_active: row.get("is_active")?,
            response_required: row.get("response_required")?,
            resolution_status: row.get("resolution_status")?,
            resolution_date: row.opt_timestamp("resolution_date")?,
            created_by: row.get("created_by")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
