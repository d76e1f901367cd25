//! Repository for weather observations

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::Connection;
use sea_query::{Alias, Expr, Func, Order, Query};
use tracing::info;

use crate::db::models::{DataQuality, WeatherData, WeatherDataIden};
use crate::db::query::{self, codec, BoundingBox, Filter, Page, PageRequest};
use crate::db::repository::base::{self, Aggregate};
use crate::error::Result;

/// Thresholds for [`find_extreme_weather`]; each bound is inclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtremeThresholds {
    pub hot: f64,
    pub cold: f64,
    pub wind_speed: f64,
    pub rainfall: f64,
}

impl Default for ExtremeThresholds {
    fn default() -> Self {
        Self {
            hot: 35.0,
            cold: 5.0,
            wind_speed: 50.0,
            rainfall: 50.0,
        }
    }
}

/// Daily averages derived from the observations of one day
#[derive(Debug, Clone, PartialEq)]
pub struct DailyWeather {
    pub day: NaiveDate,
    pub average_temperature: Option<f64>,
    pub total_rainfall: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct WeatherFilter {
    pub station_id: Option<String>,
    pub data_source: Option<String>,
    pub data_quality: Option<DataQuality>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub area: Option<BoundingBox>,
}

impl WeatherFilter {
    fn to_filter(&self) -> Filter {
        let filter = Filter::all()
            .eq_opt(WeatherDataIden::StationId, self.station_id.as_deref())
            .eq_opt(WeatherDataIden::DataSource, self.data_source.as_deref())
            .eq_opt(WeatherDataIden::DataQuality, self.data_quality)
            .gte_opt(WeatherDataIden::RecordDate, codec::opt_ts(self.from))
            .lte_opt(WeatherDataIden::RecordDate, codec::opt_ts(self.to))
            .gte_opt(WeatherDataIden::Temperature, self.min_temperature)
            .lte_opt(WeatherDataIden::Temperature, self.max_temperature);
        match &self.area {
            Some(area) => filter.and(area.condition(WeatherDataIden::Latitude, WeatherDataIden::Longitude)),
            None => filter,
        }
    }
}

const NEWEST_FIRST: &[(WeatherDataIden, Order)] = &[(WeatherDataIden::RecordDate, Order::Desc)];

/// Observations from one station, latest first
pub fn find_weather_by_station(conn: &Connection, station_id: &str) -> Result<Vec<WeatherData>> {
    base::find_where_ordered(conn, by_station(station_id), NEWEST_FIRST)
}

pub fn find_weather_by_quality(
    conn: &Connection,
    quality: DataQuality,
) -> Result<Vec<WeatherData>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(WeatherDataIden::DataQuality, quality),
        NEWEST_FIRST,
    )
}

pub fn find_weather_recorded_between(
    conn: &Connection,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<WeatherData>> {
    base::find_where_ordered(conn, window(from, to), NEWEST_FIRST)
}

pub fn find_weather_by_temperature_between(
    conn: &Connection,
    min: f64,
    max: f64,
) -> Result<Vec<WeatherData>> {
    base::find_where_ordered(
        conn,
        Filter::all().between(WeatherDataIden::Temperature, min, max),
        NEWEST_FIRST,
    )
}

/// Observations strictly warmer than `temperature`
pub fn find_weather_above_temperature(
    conn: &Connection,
    temperature: f64,
) -> Result<Vec<WeatherData>> {
    base::find_where_ordered(
        conn,
        Filter::all().gt(WeatherDataIden::Temperature, temperature),
        NEWEST_FIRST,
    )
}

/// Observations strictly colder than `temperature`
pub fn find_weather_below_temperature(
    conn: &Connection,
    temperature: f64,
) -> Result<Vec<WeatherData>> {
    base::find_where_ordered(
        conn,
        Filter::all().lt(WeatherDataIden::Temperature, temperature),
        NEWEST_FIRST,
    )
}

pub fn find_latest_weather_for_station(
    conn: &Connection,
    station_id: &str,
) -> Result<Option<WeatherData>> {
    base::find_first_ordered(conn, by_station(station_id), NEWEST_FIRST)
}

pub fn find_weather_with_filters(
    conn: &Connection,
    filter: &WeatherFilter,
    page: PageRequest,
) -> Result<Page<WeatherData>> {
    base::find_page_where(conn, filter.to_filter(), NEWEST_FIRST, page)
}

/// Observations whose station, condition or source contains `term`
pub fn search_weather(conn: &Connection, term: &str) -> Result<Vec<WeatherData>> {
    let filter = Filter::all().search_any(
        [
            WeatherDataIden::StationId,
            WeatherDataIden::WeatherCondition,
            WeatherDataIden::DataSource,
        ],
        term,
    );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

pub fn average_temperature_between(
    conn: &Connection,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Option<f64>> {
    base::aggregate::<WeatherData>(conn, Aggregate::Avg, WeatherDataIden::Temperature, window(from, to))
}

pub fn max_temperature_between(
    conn: &Connection,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Option<f64>> {
    base::aggregate::<WeatherData>(conn, Aggregate::Max, WeatherDataIden::Temperature, window(from, to))
}

pub fn min_temperature_between(
    conn: &Connection,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Option<f64>> {
    base::aggregate::<WeatherData>(conn, Aggregate::Min, WeatherDataIden::Temperature, window(from, to))
}

/// Rainfall summed over the window; 0 when nothing was recorded
pub fn total_rainfall_between(
    conn: &Connection,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<f64> {
    let total = base::aggregate::<WeatherData>(
        conn,
        Aggregate::Sum,
        WeatherDataIden::Rainfall,
        window(from, to),
    )?;
    Ok(total.unwrap_or(0.0))
}

pub fn count_weather_by_source(conn: &Connection) -> Result<Vec<(Option<String>, u64)>> {
    base::count_grouped::<WeatherData, _>(conn, WeatherDataIden::DataSource, Filter::all())
}

pub fn count_weather_by_quality(conn: &Connection) -> Result<Vec<(DataQuality, u64)>> {
    base::count_grouped::<WeatherData, _>(conn, WeatherDataIden::DataQuality, Filter::all())
}

/// Average temperature and total rainfall per calendar day (UTC), earliest first
pub fn daily_weather_trend(
    conn: &Connection,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<DailyWeather>> {
    let day = Alias::new("day");
    let stmt = Query::select()
        .expr_as(
            Func::cust(Alias::new("substr"))
                .arg(Expr::col(WeatherDataIden::RecordDate))
                .arg(1)
                .arg(10),
            day.clone(),
        )
        .expr(Func::avg(Expr::col(WeatherDataIden::Temperature)))
        .expr(Func::sum(Expr::col(WeatherDataIden::Rainfall)))
        .from(WeatherDataIden::Table)
        .cond_where(window(from, to))
        .group_by_col(day.clone())
        .order_by(day, Order::Asc)
        .to_owned();

    query::fetch_rows(conn, &stmt, |row| {
        let raw: String = row.get(0)?;
        let day = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
        Ok(DailyWeather {
            day,
            average_temperature: row.get(1)?,
            total_rainfall: row.get(2)?,
        })
    })
}

/// Observations at or beyond any of the thresholds, latest first
pub fn find_extreme_weather(
    conn: &Connection,
    thresholds: &ExtremeThresholds,
) -> Result<Vec<WeatherData>> {
    let filter = Filter::all().any_of(
        Filter::any()
            .gte(WeatherDataIden::Temperature, thresholds.hot)
            .lte(WeatherDataIden::Temperature, thresholds.cold)
            .gte(WeatherDataIden::WindSpeed, thresholds.wind_speed)
            .gte(WeatherDataIden::Rainfall, thresholds.rainfall),
    );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

/// Delete observations recorded strictly before `cutoff`
pub fn delete_weather_recorded_before(conn: &Connection, cutoff: DateTime<Utc>) -> Result<usize> {
    let deleted = base::delete_where::<WeatherData>(conn, before(cutoff))?;
    info!(deleted, %cutoff, "deleted old weather observations");
    Ok(deleted)
}

/// Delete poor-quality observations recorded strictly before `cutoff`
pub fn delete_poor_quality_weather_before(
    conn: &Connection,
    cutoff: DateTime<Utc>,
) -> Result<usize> {
    let deleted = base::delete_where::<WeatherData>(
        conn,
        before(cutoff).eq(WeatherDataIden::DataQuality, DataQuality::Poor),
    )?;
    info!(deleted, %cutoff, "deleted poor quality weather observations");
    Ok(deleted)
}

fn by_station(station_id: &str) -> Filter {
    Filter::all().eq(WeatherDataIden::StationId, station_id)
}

fn window(from: DateTime<Utc>, to: DateTime<Utc>) -> Filter {
    Filter::all().between(WeatherDataIden::RecordDate, codec::ts(from), codec::ts(to))
}

fn before(cutoff: DateTime<Utc>) -> Filter {
    Filter::all().lt(WeatherDataIden::RecordDate, codec::ts(cutoff))
}
