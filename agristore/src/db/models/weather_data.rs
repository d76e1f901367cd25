//! Weather observations

use chrono::{DateTime, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::DataQuality;
use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

/// One observation from a weather station or feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherData {
    pub id: String,
    pub station_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub record_date: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub humidity: Option<f64>,
    /// Millimetres
    pub rainfall: Option<f64>,
    /// km/h
    pub wind_speed: Option<f64>,
    pub weather_condition: Option<String>,
    pub data_source: Option<String>,
    pub data_quality: DataQuality,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WeatherData {
    /// Create a new weather data with a fresh id
    pub fn new(latitude: f64, longitude: f64, record_date: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            station_id: None,
            latitude,
            longitude,
            record_date,
            temperature: None,
            temperature_min: None,
            temperature_max: None,
            humidity: None,
            rainfall: None,
            wind_speed: None,
            weather_condition: None,
            data_source: None,
            data_quality: DataQuality::Good,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum WeatherDataIden {
    #[iden = "weather_data"]
    Table,
    Id,
    StationId,
    Latitude,
    Longitude,
    RecordDate,
    Temperature,
    TemperatureMin,
    TemperatureMax,
    Humidity,
    Rainfall,
    WindSpeed,
    WeatherCondition,
    DataSource,
    DataQuality,
    CreatedAt,
    UpdatedAt,
}

impl Entity for WeatherData {
    type Column = WeatherDataIden;

    const NAME: &'static str = "weather data";
    const TABLE: WeatherDataIden = WeatherDataIden::Table;
    const ID: WeatherDataIden = WeatherDataIden::Id;
    const COLUMNS: &'static [WeatherDataIden] = &[
        WeatherDataIden::Id,
        WeatherDataIden::StationId,
        WeatherDataIden::Latitude,
        WeatherDataIden::Longitude,
        WeatherDataIden::RecordDate,
        WeatherDataIden::Temperature,
        WeatherDataIden::TemperatureMin,
        WeatherDataIden::TemperatureMax,
        WeatherDataIden::Humidity,
        WeatherDataIden::Rainfall,
        WeatherDataIden::WindSpeed,
        WeatherDataIden::WeatherCondition,
        WeatherDataIden::DataSource,
        WeatherDataIden::DataQuality,
        WeatherDataIden::CreatedAt,
        WeatherDataIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.station_id.clone().into(),
            self.latitude.into(),
            self.longitude.into(),
            codec::ts(self.record_date).into(),
            self.temperature.into(),
            self.temperature_min.into(),
            self.temperature_max.into(),
            self.humidity.into(),
            self.rainfall.into(),
            self.wind_speed.into(),
            self.weather_condition.clone().into(),
            self.data_source.clone().into(),
            self.data_quality.into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            station_id: row.get("station_id")?,
            latitude: row.get("latitude")?,
            longitude: row.get("longitude")?,
            record_date: row.timestamp("record_date")?,
            temperature: row.get("temperature")?,
            temperature_min: row.get("temperature_min")?,
            temperature_max: row.get("temperature_max")?,
            humidity: row.get("humidity")?,
            rainfall: row.get("rainfall")?,
            wind_speed: row.get("wind_speed")?,
            weather_condition: row.get("weather_condition")?,
            data_source: row.get("data_source")?,
            data_quality: row.get("data_quality")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
