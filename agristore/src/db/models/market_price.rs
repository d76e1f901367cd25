//! Market price observations

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

string_enum! {
    pub enum MarketType {
        Wholesale => "WHOLESALE",
        Retail => "RETAIL",
        FarmGate => "FARM_GATE",
        Export => "EXPORT",
        CommodityExchange => "COMMODITY_EXCHANGE",
    }
}

string_enum! {
    pub enum DemandLevel {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        VeryHigh => "VERY_HIGH",
    }
}

string_enum! {
    pub enum SupplyLevel {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Excess => "EXCESS",
    }
}

string_enum! {
    pub enum PriceTrend {
        Increasing => "INCREASING",
        Stable => "STABLE",
        Decreasing => "DECREASING",
    }
}

/// Observed price of a crop in one market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketPrice {
    pub id: String,
    pub crop_id: String,
    pub market_name: String,
    pub market_type: MarketType,
    pub location: Option<String>,
    pub price_date: NaiveDate,
    pub price_per_kg: f64,
    pub currency: String,
    pub quality_grade: Option<String>,
    pub demand_level: DemandLevel,
    pub supply_level: SupplyLevel,
    pub price_trend: PriceTrend,
    pub data_source: Option<String>,
    /// 1 (low) to 10 (high)
    pub reliability_score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MarketPrice {
    /// Create a new market price with a fresh id
    pub fn new(
        crop_id: impl Into<String>,
        market_name: impl Into<String>,
        market_type: MarketType,
        price_date: NaiveDate,
        price_per_kg: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            crop_id: crop_id.into(),
            market_name: market_name.into(),
            market_type,
            location: None,
            price_date,
            price_per_kg,
            currency: "RWF".to_string(),
            quality_grade: None,
            demand_level: DemandLevel::Medium,
            supply_level: SupplyLevel::Medium,
            price_trend: PriceTrend::Stable,
            data_source: None,
            reliability_score: 5,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum MarketPriceIden {
    #[iden = "market_prices"]
    Table,
    Id,
    CropId,
    MarketName,
    MarketType,
    Location,
    PriceDate,
    PricePerKg,
    Currency,
    QualityGrade,
    DemandLevel,
    SupplyLevel,
    PriceTrend,
    DataSource,
    ReliabilityScore,
    CreatedAt,
    UpdatedAt,
}

impl Entity for MarketPrice {
    type Column = MarketPriceIden;

    const NAME: &'static str = "market price";
    const TABLE: MarketPriceIden = MarketPriceIden::Table;
    const ID: MarketPriceIden = MarketPriceIden::Id;
    const COLUMNS: &'static [MarketPriceIden] = &[
        MarketPriceIden::Id,
        MarketPriceIden::CropId,
        MarketPriceIden::MarketName,
        MarketPriceIden::MarketType,
        MarketPriceIden::Location,
        MarketPriceIden::PriceDate,
        MarketPriceIden::PricePerKg,
        MarketPriceIden::Currency,
        MarketPriceIden::QualityGrade,
        MarketPriceIden::DemandLevel,
        MarketPriceIden::SupplyLevel,
        MarketPriceIden::PriceTrend,
        MarketPriceIden::DataSource,
        MarketPriceIden::ReliabilityScore,
        MarketPriceIden::CreatedAt,
        MarketPriceIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.crop_id.clone().into(),
            self.market_name.clone().into(),
            self.market_type.into(),
            self.location.clone().into(),
            codec::date(self.price_date).into(),
            self.price_per_kg.into(),
            self.currency.clone().into(),
            self.quality_grade.clone().into(),
            self.demand_level.into(),
            self.supply_level.into(),
            self.price_trend.into(),
            self.data_source.clone().into(),
            self.reliability_score.into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            crop_id: row.get("crop_id")?,
            market_name: row.get("market_name")?,
            market_type: row.get("market_type")?,
            location: row.get("location")?,
            price_date: row.date("price_date")?,
            price_per_kg: row.get("price_per_kg")?,
            currency: row.get("currency")?,
            quality_grade: row.get("quality_grade")?,
            demand_level: row.get("demand_level")?,
            supply_level: row.get("supply_level")?,
            price_trend: row.get("price_trend")?,
            data_source: row.get("data_source")?,
            reliability_score: row.get("reliability_score")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
