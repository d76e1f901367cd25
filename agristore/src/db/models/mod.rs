//! Record types stored by the repository layer
//!
//! Each module holds one record struct, its classification enums, the column
//! identifiers of its table and its [`Entity`](crate::db::query::Entity)
//! implementation.

/// Declare a classification enum stored as SCREAMING_SNAKE_CASE text
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::UnknownVariant;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::error::UnknownVariant::new(stringify!($name), other)),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$name> for sea_query::Value {
            fn from(value: $name) -> Self {
                sea_query::Value::from(value.as_str())
            }
        }

        impl sea_query::Nullable for $name {
            fn null() -> sea_query::Value {
                sea_query::Value::String(None)
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e| rusqlite::types::FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

pub mod ai_recommendation;
pub mod buyer;
pub mod climate_impact;
pub mod common;
pub mod crop;
pub mod crop_production;
pub mod environmental_data;
pub mod farm;
pub mod farmer;
pub mod fertilizer_usage;
pub mod food_security_alert;
pub mod inventory;
pub mod irrigation_data;
pub mod irrigation_prediction;
pub mod market_price;
pub mod notification;
pub mod policy_data;
pub mod production_prediction;
pub mod resource_recommendation;
pub mod soil_data;
pub mod supply_chain;
pub mod transaction;
pub mod user;
pub mod weather_data;

pub use ai_recommendation::*;
pub use buyer::*;
pub use climate_impact::*;
pub use common::*;
pub use crop::*;
pub use crop_production::*;
pub use environmental_data::*;
pub use farm::*;
pub use farmer::*;
pub use fertilizer_usage::*;
pub use food_security_alert::*;
pub use inventory::*;
pub use irrigation_data::*;
pub use irrigation_prediction::*;
pub use market_price::*;
pub use notification::*;
pub use policy_data::*;
pub use production_prediction::*;
pub use resource_recommendation::*;
pub use soil_data::*;
pub use supply_chain::*;
pub use transaction::*;
pub use user::*;
pub use weather_data::*;
