//! Repository functions for each record type
//!
//! Keeps database access apart from business logic. Generic CRUD and
//! aggregation live in [`base`]; each `*_repo` module adds the lookups,
//! statistics and bulk maintenance for one entity. Modules are not glob
//! re-exported because several share operation names.

pub mod base;

pub mod ai_recommendation_repo;
pub mod buyer_repo;
pub mod climate_impact_repo;
pub mod crop_production_repo;
pub mod crop_repo;
pub mod environmental_data_repo;
pub mod farm_repo;
pub mod farmer_repo;
pub mod fertilizer_usage_repo;
pub mod food_security_alert_repo;
pub mod inventory_repo;
pub mod irrigation_data_repo;
pub mod irrigation_prediction_repo;
pub mod market_price_repo;
pub mod notification_repo;
pub mod policy_data_repo;
pub mod production_prediction_repo;
pub mod resource_recommendation_repo;
pub mod soil_data_repo;
pub mod supply_chain_repo;
pub mod transaction_repo;
pub mod user_repo;
pub mod weather_data_repo;
