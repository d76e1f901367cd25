//! Crop production cycles

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

string_enum! {
    pub enum ProductionStatus {
        Planned => "PLANNED",
        Planted => "PLANTED",
        Growing => "GROWING",
        Harvested => "HARVESTED",
        Sold => "SOLD",
    }
}

string_enum! {
    /// Rwandan growing seasons
    pub enum CropSeason {
        SeasonA => "SEASON_A",
        SeasonB => "SEASON_B",
        SeasonC => "SEASON_C",
        OffSeason => "OFF_SEASON",
    }
}

string_enum! {
    pub enum ProductionMethod {
        Organic => "ORGANIC",
        Conventional => "CONVENTIONAL",
        Integrated => "INTEGRATED",
    }
}

/// One planting of a crop on a farm, from planting to sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropProduction {
    pub id: String,
    pub farm_id: String,
    pub crop_id: String,
    pub production_code: String,
    pub planting_date: NaiveDate,
    pub expected_harvest_date: Option<NaiveDate>,
    pub actual_harvest_date: Option<NaiveDate>,
    /// Hectares
    pub area_planted: f64,
    pub expected_yield: Option<f64>,
    /// Kilograms per hectare
    pub actual_yield: Option<f64>,
    pub total_production: Option<f64>,
    pub price_per_kg: Option<f64>,
    pub production_status: ProductionStatus,
    pub season: Option<CropSeason>,
    pub year: i32,
    pub seed_variety: Option<String>,
    pub seed_source: Option<String>,
    pub production_method: ProductionMethod,
    pub certification: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CropProduction {
    /// Create a new crop production with a fresh id
    pub fn new(
        farm_id: impl Into<String>,
        crop_id: impl Into<String>,
        production_code: impl Into<String>,
        planting_date: NaiveDate,
        area_planted: f64,
        year: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            farm_id: farm_id.into(),
            crop_id: crop_id.into(),
            production_code: production_code.into(),
            planting_date,
            expected_harvest_date: None,
            actual_harvest_date: None,
            area_planted,
            expected_yield: None,
            actual_yield: None,
            total_production: None,
            price_per_kg: None,
            production_status: ProductionStatus::Planned,
            season: None,
            year,
            seed_variety: None,
            seed_source: None,
            production_method: ProductionMethod::Conventional,
            certification: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum CropProductionIden {
    #[iden = "crop_productions"]
    Table,
    Id,
    FarmId,
    CropId,
    ProductionCode,
    PlantingDate,
    ExpectedHarvestDate,
    ActualHarvestDate,
    AreaPlanted,
    ExpectedYield,
    ActualYield,
    TotalProduction,
    PricePerKg,
    ProductionStatus,
    Season,
    Year,
    SeedVariety,
    SeedSource,
    ProductionMethod,
    Certification,
    Notes,
    CreatedAt,
    UpdatedAt,
}

impl Entity for CropProduction {
    type Column = CropProductionIden;

    const NAME: &'static str = "crop production";
    const TABLE: CropProductionIden = CropProductionIden::Table;
    const ID: CropProductionIden = CropProductionIden::Id;
    const COLUMNS: &'static [CropProductionIden] = &[
        CropProductionIden::Id,
        CropProductionIden::FarmId,
        CropProductionIden::CropId,
        CropProductionIden::ProductionCode,
        CropProductionIden::PlantingDate,
        CropProductionIden::ExpectedHarvestDate,
        CropProductionIden::ActualHarvestDate,
        CropProductionIden::AreaPlanted,
        CropProductionIden::ExpectedYield,
        CropProductionIden::ActualYield,
        CropProductionIden::TotalProduction,
        CropProductionIden::PricePerKg,
        CropProductionIden::ProductionStatus,
        CropProductionIden::Season,
        CropProductionIden::Year,
        CropProductionIden::SeedVariety,
        CropProductionIden::SeedSource,
        CropProductionIden::ProductionMethod,
        CropProductionIden::Certification,
        CropProductionIden::Notes,
        CropProductionIden::CreatedAt,
        CropProductionIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.farm_id.clone().into(),
            self.crop_id.clone().into(),
            self.production_code.clone().into(),
            codec::date(self.planting_date).into(),
            codec::opt_date(self.expected_harvest_date).into(),
            codec::opt_date(self.actual_harvest_date).into(),
            self.area_planted.into(),
            self.expected_yield.into(),
            self.actual_yield.into(),
            self.total_production.into(),
            self.price_per_kg.into(),
            self.production_status.into(),
            self.season.into(),
            self.year.into(),
            self.seed_variety.clone().into(),
            self.seed_source.clone().into(),
            self.production_method.into(),
            self.certification.clone().into(),
            self.notes.clone().into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            farm_id: row.get("farm_id")?,
            crop_id: row.get("crop_id")?,
            production_code: row.get("production_code")?,
            planting_date: row.date("planting_date")?,
            expected_harvest_date: row.opt_date("expected_harvest_date")?,
            actual_harvest_date: row.opt_date("actual_harvest_date")?,
            area_planted: row.get("area_planted")?,
            expected_yield: row.get("expected_yield")?,
            actual_yield: row.get("actual_yield")?,
            total_production: row.get("total_production")?,
            price_per_kg: row.get("price_per_kg")?,
            production_status: row.get("production_status")?,
            season: row.get("season")?,
            year: row.get("year")?,
            seed_variety: row.get("seed_variety")?,
            seed_source: row.get("seed_source")?,
            production_method: row.get("production_method")?,
            certification: row.get("certification")?,
            notes: row.get("notes")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
