//! Soil test results

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

/// Laboratory analysis of one soil sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilData {
    pub id: String,
    pub farm_id: String,
    pub sample_code: String,
    pub ph_level: Option<f64>,
    pub nitrogen: Option<f64>,
    pub phosphorus: Option<f64>,
    pub potassium: Option<f64>,
    pub organic_matter: Option<f64>,
    pub moisture: Option<f64>,
    /// dS/m; above 2.0 indicates saline soil
    pub electrical_conductivity: Option<f64>,
    /// g/cm³
    pub bulk_density: Option<f64>,
    /// Percent of soil volume
    pub porosity: Option<f64>,
    pub soil_texture: Option<String>,
    pub measurement_date: DateTime<Utc>,
    pub testing_method: Option<String>,
    pub laboratory_name: Option<String>,
    pub depth_cm: i32,
    pub recommendations: Option<String>,
    pub next_test_due: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SoilData {
    /// Create a new soil data with a fresh id
    pub fn new(
        farm_id: impl Into<String>,
        sample_code: impl Into<String>,
        measurement_date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            farm_id: farm_id.into(),
            sample_code: sample_code.into(),
            ph_level: None,
            nitrogen: None,
            phosphorus: None,
            potassium: None,
            organic_matter: None,
            moisture: None,
            electrical_conductivity: None,
            bulk_density: None,
            porosity: None,
            soil_texture: None,
            measurement_date,
            testing_method: None,
            laboratory_name: None,
            depth_cm: 30,
            recommendations: None,
            next_test_due: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum SoilDataIden {
    #[iden = "soil_data"]
    Table,
    Id,
    FarmId,
    SampleCode,
    PhLevel,
    Nitrogen,
    Phosphorus,
    Potassium,
    OrganicMatter,
    Moisture,
    ElectricalConductivity,
    SoilTexture,
    MeasurementDate,
    TestingMethod,
    LaboratoryName,
    DepthCm,
    Recommendations,
    NextTestDue,
    CreatedAt,
    UpdatedAt,
    BulkDensity,
    Porosity,
}

impl Entity for SoilData {
    type Column = SoilDataIden;

    const NAME: &'static str = "soil data";
    const TABLE: SoilDataIden = SoilDataIden::Table;
    const ID: SoilDataIden = SoilDataIden::Id;
    const COLUMNS: &'static [SoilDataIden] = &[
        SoilDataIden::Id,
        SoilDataIden::FarmId,
        SoilDataIden::SampleCode,
        SoilDataIden::PhLevel,
        SoilDataIden::Nitrogen,
        SoilDataIden::Phosphorus,
        SoilDataIden::Potassium,
        SoilDataIden::OrganicMatter,
        SoilDataIden::Moisture,
        SoilDataIden::ElectricalConductivity,
        SoilDataIden::SoilTexture,
        SoilDataIden::MeasurementDate,
        SoilDataIden::TestingMethod,
        SoilDataIden::LaboratoryName,
        SoilDataIden::DepthCm,
        SoilDataIden::Recommendations,
        SoilDataIden::NextTestDue,
        SoilDataIden::CreatedAt,
        SoilDataIden::UpdatedAt,
        SoilDataIden::BulkDensity,
        SoilDataIden::Porosity,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.farm_id.clone().into(),
            self.sample_code.clone().into(),
            self.ph_level.into(),
            self.nitrogen.into(),
            self.phosphorus.into(),
            self.potassium.into(),
            self.organic_matter.into(),
            self.moisture.into(),
            self.electrical_conductivity.into(),
            self.soil_texture.clone().into(),
            codec::ts(self.measurement_date).into(),
            self.testing_method.clone().into(),
            self.laboratory_name.clone().into(),
            self.depth_cm.into(),
            self.recommendations.clone().into(),
            codec::opt_date(self.next_test_due).into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
            self.bulk_density.into(),
            self.porosity.into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            farm_id: row.get("farm_id")?,
            sample_code: row.get("sample_code")?,
            ph_level: row.get("ph_level")?,
            nitrogen: row.get("nitrogen")?,
            phosphorus: row.get("phosphorus")?,
            potassium: row.get("potassium")?,
            organic_matter: row.get("organic_matter")?,
            moisture: row.get("moisture")?,
            electrical_conductivity: row.get("electrical_conductivity")?,
            bulk_density: row.get("bulk_density")?,
            porosity: row.get("porosity")?,
            soil_texture: row.get("soil_texture")?,
            measurement_date: row.timestamp("measurement_date")?,
            testing_method: row.get("testing_method")?,
            laboratory_name: row.get("laboratory_name")?,
            depth_cm: row.get("depth_cm")?,
            recommendations: row.get("recommendations")?,
            next_test_due: row.opt_date("next_test_due")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
