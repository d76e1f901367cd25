//! Farmer profiles

use chrono::{DateTime, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

string_enum! {
    pub enum ExperienceLevel {
        Beginner => "BEGINNER",
        Intermediate => "INTERMEDIATE",
        Expert => "EXPERT",
    }
}

/// Farming profile attached to a user account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Farmer {
    pub id: String,
    pub user_id: String,
    pub farmer_code: String,
    pub cooperative_name: Option<String>,
    /// Hectares across all of the farmer's land
    pub total_land_size: Option<f64>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub province: Option<String>,
    pub district: Option<String>,
    pub sector: Option<String>,
    pub experience_level: ExperienceLevel,
    pub certification_level: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Farmer {
    /// Create a new farmer with a fresh id
    pub fn new(user_id: impl Into<String>, farmer_code: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            farmer_code: farmer_code.into(),
            cooperative_name: None,
            total_land_size: None,
            location: None,
            latitude: None,
            longitude: None,
            province: None,
            district: None,
            sector: None,
            experience_level: ExperienceLevel::Beginner,
            certification_level: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum FarmerIden {
    #[iden = "farmers"]
    Table,
    Id,
    UserId,
    FarmerCode,
    CooperativeName,
    TotalLandSize,
    Location,
    Latitude,
    Longitude,
    Province,
    District,
    Sector,
    ExperienceLevel,
    CertificationLevel,
    CreatedAt,
    UpdatedAt,
}

impl Entity for Farmer {
    type Column = FarmerIden;

    const NAME: &'static str = "farmer";
    const TABLE: FarmerIden = FarmerIden::Table;
    const ID: FarmerIden = FarmerIden::Id;
    const COLUMNS: &'static [FarmerIden] = &[
        FarmerIden::Id,
        FarmerIden::UserId,
        FarmerIden::FarmerCode,
        FarmerIden::CooperativeName,
        FarmerIden::TotalLandSize,
        FarmerIden::Location,
        FarmerIden::Latitude,
        FarmerIden::Longitude,
        FarmerIden::Province,
        FarmerIden::District,
        FarmerIden::Sector,
        FarmerIden::ExperienceLevel,
        FarmerIden::CertificationLevel,
        FarmerIden::CreatedAt,
        FarmerIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.user_id.clone().into(),
            self.farmer_code.clone().into(),
            self.cooperative_name.clone().into(),
            self.total_land_size.into(),
            self.location.clone().into(),
            self.latitude.into(),
            self.longitude.into(),
            self.province.clone().into(),
            self.district.clone().into(),
            self.sector.clone().into(),
            self.experience_level.into(),
            self.certification_level.clone().into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            farmer_code: row.get("farmer_code")?,
            cooperative_name: row.get("cooperative_name")?,
            total_land_size: row.get("total_land_size")?,
            location: row.get("location")?,
            latitude: row.get("latitude")?,
            longitude: row.get("longitude")?,
            province: row.get("province")?,
            district: row.get("district")?,
            sector: row.get("sector")?,
            experience_level: row.get("experience_level")?,
            certification_level: row.get("certification_level")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
