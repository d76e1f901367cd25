//! Stored produce

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

string_enum! {
    pub enum FacilityType {
        FarmStorage => "FARM_STORAGE",
        Warehouse => "WAREHOUSE",
        Silo => "SILO",
        ColdStorage => "COLD_STORAGE",
        ProcessingPlant => "PROCESSING_PLANT",
        RetailStore => "RETAIL_STORE",
    }
}

string_enum! {
    pub enum InventoryStatus {
        Available => "AVAILABLE",
        Reserved => "RESERVED",
        InTransit => "IN_TRANSIT",
        Sold => "SOLD",
        Damaged => "DAMAGED",
        Expired => "EXPIRED",
        Disposed => "DISPOSED",
    }
}

string_enum! {
    pub enum PestStatus {
        PestFree => "PEST_FREE",
        MinorInfestation => "MINOR_INFESTATION",
        MajorInfestation => "MAJOR_INFESTATION",
    }
}

/// A lot of stored produce in one facility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub id: String,
    pub inventory_code: String,
    pub crop_id: String,
    pub farmer_user_id: Option<String>,
    pub facility_type: FacilityType,
    pub storage_location: Option<String>,
    pub facility_name: Option<String>,
    pub storage_capacity: Option<f64>,
    pub current_quantity: f64,
    pub reserved_quantity: f64,
    pub available_quantity: f64,
    pub unit: String,
    pub quality_grade: Option<String>,
    pub harvest_date: Option<NaiveDate>,
    pub storage_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub status: InventoryStatus,
    pub pest_status: PestStatus,
    pub market_value_per_unit: Option<f64>,
    pub minimum_stock_level: Option<f64>,
    /// Share of the stored quantity lost, 0 to 100
    pub loss_percentage: f64,
    pub organic_certified: bool,
    pub next_inspection_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Inventory {
    /// Create a new inventory with a fresh id
    pub fn new(
        inventory_code: impl Into<String>,
        crop_id: impl Into<String>,
        facility_type: FacilityType,
        current_quantity: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            inventory_code: inventory_code.into(),
            crop_id: crop_id.into(),
            farmer_user_id: None,
            facility_type,
            storage_location: None,
            facility_name: None,
            storage_capacity: None,
            current_quantity,
            reserved_quantity: 0.0,
            available_quantity: current_quantity,
            unit: "KG".to_string(),
            quality_grade: None,
            harvest_date: None,
            storage_date: None,
            expiry_date: None,
            status: InventoryStatus::Available,
            pest_status: PestStatus::PestFree,
            market_value_per_unit: None,
            minimum_stock_level: None,
            loss_percentage: 0.0,
            organic_certified: false,
            next_inspection_date: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum InventoryIden {
    #[iden = "inventories"]
    Table,
    Id,
    InventoryCode,
    CropId,
    FarmerUserId,
    FacilityType,
    StorageLocation,
    FacilityName,
    StorageCapacity,
    CurrentQuantity,
    ReservedQuantity,
    AvailableQuantity,
    Unit,
    QualityGrade,
    HarvestDate,
    StorageDate,
    ExpiryDate,
    Status,
    PestStatus,
    MarketValuePerUnit,
    MinimumStockLevel,
    LossPercentage,
    OrganicCertified,
    NextInspectionDate,
    CreatedAt,
    UpdatedAt,
}

impl Entity for Inventory {
    type Column = InventoryIden;

    const NAME: &'static str = "inventory";
    const TABLE: InventoryIden = InventoryIden::Table;
    const ID: InventoryIden = InventoryIden::Id;
    const COLUMNS: &'static [InventoryIden] = &[
        InventoryIden::Id,
        InventoryIden::InventoryCode,
        InventoryIden::CropId,
        InventoryIden::FarmerUserId,
        InventoryIden::FacilityType,
        InventoryIden::StorageLocation,
        InventoryIden::FacilityName,
        InventoryIden::StorageCapacity,
        InventoryIden::CurrentQuantity,
        InventoryIden::ReservedQuantity,
        InventoryIden::AvailableQuantity,
        InventoryIden::Unit,
        InventoryIden::QualityGrade,
        InventoryIden::HarvestDate,
        InventoryIden::StorageDate,
        InventoryIden::ExpiryDate,
        InventoryIden::Status,
        InventoryIden::PestStatus,
        InventoryIden::MarketValuePerUnit,
        InventoryIden::MinimumStockLevel,
        InventoryIden::LossPercentage,
        InventoryIden::OrganicCertified,
        InventoryIden::NextInspectionDate,
        InventoryIden::CreatedAt,
        InventoryIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.inventory_code.clone().into(),
            self.crop_id.clone().into(),
            self.farmer_user_id.clone().into(),
            self.facility_type.into(),
            self.storage_location.clone().into(),
            self.facility_name.clone().into(),
            self.storage_capacity.into(),
            self.current_quantity.into(),
            self.reserved_quantity.into(),
            self.available_quantity.into(),
            self.unit.clone().into(),
            self.quality_grade.clone().into(),
            codec::opt_date(self.harvest_date).into(),
            codec::opt_date(self.storage_date).into(),
            codec::opt_date(self.expiry_date).into(),
            self.status.into(),
            self.pest_status.into(),
            self.market_value_per_unit.into(),
            self.minimum_stock_level.into(),
            self.loss_percentage.into(),
            self.organic_certified.into(),
            codec::opt_date(self.next_inspection_date).into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            inventory_code: row.get("inventory_code")?,
            crop_id: row.get("crop_id")?,
            farmer_user_id: row.get("farmer_user_id")?,
            facility_type: row.get("facility_type")?,
            storage_location: row.get("storage_location")?,
            facility_name: row.get("facility_name")?,
            storage_capacity: row.get("storage_capacity")?,
            current_quantity: row.get("current_quantity")?,
            reserved_quantity: row.get("reserved_quantity")?,
            available_quantity: row.get("available_quantity")?,
            unit: row.get("unit")?,
            quality_grade: row.get("quality_grade")?,
            harvest_date: row.opt_date("harvest_date")?,
            storage_date: row.opt_date("storage_date")?,
            expiry_date: row.opt_date("expiry_date")?,
            status: row.get("status")?,
            pest_status: row.get("pest_status")?,
            market_value_per_unit: row.get("market_value_per_unit")?,
            minimum_stock_level: row.get("minimum_stock_level")?,
            loss_percentage: row.get("loss_percentage")?,
            organic_certified: row.get("organic_certified")?,
            next_inspection_date: row.opt_date("next_inspection_date")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
