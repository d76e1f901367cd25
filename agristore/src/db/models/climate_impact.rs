//! Climate events and their agricultural impact

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::ReportingSeason;
use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

string_enum! {
    pub enum ClimateEvent {
        Drought => "DROUGHT",
        Flood => "FLOOD",
        ExtremeHeat => "EXTREME_HEAT",
        ColdWave => "COLD_WAVE",
        Hail => "HAIL",
        StrongWinds => "STRONG_WINDS",
        PestOutbreak => "PEST_OUTBREAK",
        DiseaseOutbreak => "DISEASE_OUTBREAK",
    }
}

string_enum! {
    pub enum EventIntensity {
        Mild => "MILD",
        Moderate => "MODERATE",
        Severe => "SEVERE",
        Extreme => "EXTREME",
    }
}

/// A reported climate event and the damage it caused
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimateImpact {
    pub id: String,
    pub impact_code: String,
    pub crop_id: Option<String>,
    pub region: String,
    pub district: Option<String>,
    pub year: i32,
    pub season: Option<ReportingSeason>,
    pub climate_event: ClimateEvent,
    pub event_intensity: EventIntensity,
    pub event_start_date: Option<NaiveDate>,
    pub event_end_date: Option<NaiveDate>,
    pub affected_area: Option<f64>,
    pub affected_population: Option<i32>,
    /// Percentage change in yield
    pub yield_impact: Option<f64>,
    pub production_loss: Option<f64>,
    pub economic_loss: Option<f64>,
    pub reported_by: Option<String>,
    pub report_date: Option<DateTime<Utc>>,
    pub verified: bool,
    pub verification_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClimateImpact {
    /// Create a new climate impact with a fresh id
    pub fn new(
        impact_code: impl Into<String>,
        region: impl Into<String>,
        year: i32,
        climate_event: ClimateEvent,
        event_intensity: EventIntensity,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            impact_code: impact_code.into(),
            crop_id: None,
            region: region.into(),
            district: None,
            year,
            season: None,
            climate_event,
            event_intensity,
            event_start_date: None,
            event_end_date: None,
            affected_area: None,
            affected_population: None,
            yield_impact: None,
            production_loss: None,
            economic_loss: None,
            reported_by: None,
            report_date: None,
            verified: false,
            verification_date: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum ClimateImpactIden {
    #[iden = "climate_impacts"]
    Table,
    Id,
    ImpactCode,
    CropId,
    Region,
    District,
    Year,
    Season,
    ClimateEvent,
    EventIntensity,
    EventStartDate,
    EventEndDate,
    AffectedArea,
    AffectedPopulation,
    YieldImpact,
    ProductionLoss,
    EconomicLoss,
    ReportedBy,
    ReportDate,
    Verified,
    VerificationDate,
    CreatedAt,
    UpdatedAt,
}

impl Entity for ClimateImpact {
    type Column = ClimateImpactIden;

    const NAME: &'static str = "climate impact";
    const TABLE: ClimateImpactIden = ClimateImpactIden::Table;
    const ID: ClimateImpactIden = ClimateImpactIden::Id;
    const COLUMNS: &'static [ClimateImpactIden] = &[
        ClimateImpactIden::Id,
        ClimateImpactIden::ImpactCode,
        ClimateImpactIden::CropId,
        ClimateImpactIden::Region,
        ClimateImpactIden::District,
        ClimateImpactIden::Year,
        ClimateImpactIden::Season,
        ClimateImpactIden::ClimateEvent,
        ClimateImpactIden::EventIntensity,
        ClimateImpactIden::EventStartDate,
        ClimateImpactIden::EventEndDate,
        ClimateImpactIden::AffectedArea,
        ClimateImpactIden::AffectedPopulation,
        ClimateImpactIden::YieldImpact,
        ClimateImpactIden::ProductionLoss,
        ClimateImpactIden::EconomicLoss,
        ClimateImpactIden::ReportedBy,
        ClimateImpactIden::ReportDate,
        ClimateImpactIden::Verified,
        ClimateImpactIden::VerificationDate,
        ClimateImpactIden::CreatedAt,
        ClimateImpactIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.impact_code.clone().into(),
            self.crop_id.clone().into(),
            self.region.clone().into(),
            self.district.clone().into(),
            self.year.into(),
            self.season.into(),
            self.climate_event.into(),
            self.event_intensity.into(),
            codec::opt_date(self.event_start_date).into(),
            codec::opt_date(self.event_end_date).into(),
            self.affected_area.into(),
            self.affected_population.into(),
            self.yield_impact.into(),
            self.production_loss.into(),
            self.economic_loss.into(),
            self.reported_by.clone().into(),
            codec::opt_ts(self.report_date).into(),
            self.verified.into(),
            codec::opt_ts(self.verification_date).into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            impact_code: row.get("impact_code")?,
            crop_id: row.get("crop_id")?,
            region: row.get("region")?,
            district: row.get("district")?,
            year: row.get("year")?,
            season: row.get("season")?,
            climate_event: row.get("climate_event")?,
            event_intensity: row.get("event_intensity")?,
            event_start_date: row.opt_date("event_start_date")?,
            event_end_date: row.opt_date("event_end_date")?,
            affected_area: row.get("affected_area")?,
            affected_population: row.get("affected_population")?,
            yield_impact: row.get("yield_impact")?,
            production_loss: row.get("production_loss")?,
            economic_loss: row.get("economic_loss")?,
            reported_by: row.get("reported_by")?,
            report_date: row.opt_timestamp("report_date")?,
            verified: row.get("verified")?,
            verification_date: row.opt_timestamp("verification_date")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
