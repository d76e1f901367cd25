//! Repository for production forecasts and their measured outcomes

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use sea_query::{Alias, Expr, Func, Order, Query, SimpleExpr};
use tracing::{debug, info};

use crate::db::models::{
    PredictionType, ProductionPrediction, ProductionPredictionIden, ReportingSeason,
    ValidationStatus,
};
use crate::db::query::{self, codec, Filter, Page, PageRequest};
use crate::db::repository::base::{self, Aggregate};
use crate::error::{Result, StoreError};

const NEWEST_FIRST: &[(ProductionPredictionIden, Order)] =
    &[(ProductionPredictionIden::PredictionDate, Order::Desc)];

pub fn find_prediction_by_code(
    conn: &Connection,
    code: &str,
) -> Result<Option<ProductionPrediction>> {
    base::find_one_where(conn, by_code(code))
}

pub fn exists_prediction_by_code(conn: &Connection, code: &str) -> Result<bool> {
    base::exists_where::<ProductionPrediction>(conn, by_code(code))
}

pub fn find_predictions_by_crop_production(
    conn: &Connection,
    crop_production_id: &str,
) -> Result<Vec<ProductionPrediction>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(ProductionPredictionIden::CropProductionId, crop_production_id),
        NEWEST_FIRST,
    )
}

pub fn find_predictions_by_crop(
    conn: &Connection,
    crop_id: &str,
) -> Result<Vec<ProductionPrediction>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(ProductionPredictionIden::CropId, crop_id),
        NEWEST_FIRST,
    )
}

pub fn find_predictions_by_region(
    conn: &Connection,
    region: &str,
) -> Result<Vec<ProductionPrediction>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq_ignore_case(ProductionPredictionIden::Region, region),
        NEWEST_FIRST,
    )
}

pub fn find_predictions_by_year_and_season(
    conn: &Connection,
    year: i32,
    season: ReportingSeason,
) -> Result<Vec<ProductionPrediction>> {
    let filter = Filter::all()
        .eq(ProductionPredictionIden::Year, year)
        .eq(ProductionPredictionIden::Season, season);
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

pub fn find_predictions_by_type(
    conn: &Connection,
    prediction_type: PredictionType,
) -> Result<Vec<ProductionPrediction>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(ProductionPredictionIden::PredictionType, prediction_type),
        NEWEST_FIRST,
    )
}

/// Predictions whose target date passed before `as_of` without an actual value
pub fn find_overdue_predictions(
    conn: &Connection,
    as_of: NaiveDate,
) -> Result<Vec<ProductionPrediction>> {
    let filter = uncompleted().lt(ProductionPredictionIden::TargetDate, codec::date(as_of));
    base::find_where_ordered(conn, filter, &[(ProductionPredictionIden::TargetDate, Order::Asc)])
}

/// Predictions with a confidence level of at least `min_confidence` percent
pub fn find_high_confidence_predictions(
    conn: &Connection,
    min_confidence: f64,
) -> Result<Vec<ProductionPrediction>> {
    base::find_where_ordered(
        conn,
        Filter::all().gte(ProductionPredictionIden::ConfidenceLevel, min_confidence),
        &[(ProductionPredictionIden::ConfidenceLevel, Order::Desc)],
    )
}

/// Predictions with a recorded actual value
pub fn find_completed_predictions(conn: &Connection) -> Result<Vec<ProductionPrediction>> {
    base::find_where_ordered(
        conn,
        Filter::all().is_not_null(ProductionPredictionIden::ActualValue),
        NEWEST_FIRST,
    )
}

/// Predictions whose code, region, district or model contain `term`
pub fn search_predictions(
    conn: &Connection,
    term: &str,
    page: PageRequest,
) -> Result<Page<ProductionPrediction>> {
    let filter = Filter::all().search_any(
        [
            ProductionPredictionIden::PredictionCode,
            ProductionPredictionIden::Region,
            ProductionPredictionIden::District,
            ProductionPredictionIden::ModelUsed,
        ],
        term,
    );
    base::find_page_where(conn, filter, NEWEST_FIRST, page)
}

/// Models ranked by mean achieved accuracy, best first
pub fn top_models_by_accuracy(conn: &Connection, limit: u64) -> Result<Vec<(String, f64)>> {
    let average = Alias::new("average_accuracy");
    let stmt = Query::select()
        .column(ProductionPredictionIden::ModelUsed)
        .expr_as(
            Func::avg(Expr::col(ProductionPredictionIden::AccuracyAchieved)),
            average.clone(),
        )
        .from(ProductionPredictionIden::Table)
        .cond_where(
            Filter::all()
                .is_not_null(ProductionPredictionIden::ModelUsed)
                .is_not_null(ProductionPredictionIden::AccuracyAchieved),
        )
        .group_by_col(ProductionPredictionIden::ModelUsed)
        .order_by(average, Order::Desc)
        .order_by(ProductionPredictionIden::ModelUsed, Order::Asc)
        .limit(limit)
        .to_owned();

    query::fetch_rows(conn, &stmt, |row| Ok((row.get(0)?, row.get(1)?)))
}

pub fn average_accuracy_by_type(
    conn: &Connection,
) -> Result<Vec<(PredictionType, Option<f64>)>> {
    base::aggregate_grouped::<ProductionPrediction, _>(
        conn,
        Aggregate::Avg,
        ProductionPredictionIden::PredictionType,
        ProductionPredictionIden::AccuracyAchieved,
        Filter::all(),
    )
}

pub fn count_predictions_by_validation_status(
    conn: &Connection,
) -> Result<Vec<(ValidationStatus, u64)>> {
    base::count_grouped::<ProductionPrediction, _>(
        conn,
        ProductionPredictionIden::ValidationStatus,
        Filter::all(),
    )
}

/// Store the measured outcome of a prediction together with the accuracy
/// it achieved. Returns `false` when no prediction has this id.
///
/// Accuracy is the percentage closeness of `actual` to the stored
/// prediction, clamped to 0..=100 and rounded to two decimals. It is left
/// empty when the prediction is not positive.
pub fn record_actual_value(conn: &Connection, id: &str, actual: f64) -> Result<bool> {
    if !actual.is_finite() || actual < 0.0 {
        return Err(StoreError::validation(format!(
            "actual value must be a non-negative number, got {actual}"
        )));
    }
    debug!(id, actual, "recording actual production value");

    let updated = base::update_where::<ProductionPrediction>(
        conn,
        vec![
            (ProductionPredictionIden::ActualValue, actual.into()),
            (ProductionPredictionIden::AccuracyAchieved, achieved_accuracy(actual)),
            (ProductionPredictionIden::UpdatedAt, codec::ts(Utc::now()).into()),
        ],
        Filter::all().eq(ProductionPredictionIden::Id, id),
    )?;
    Ok(updated > 0)
}

/// Delete predictions created strictly before `cutoff` that never received
/// an actual value
pub fn delete_old_uncompleted_predictions(
    conn: &Connection,
    cutoff: DateTime<Utc>,
) -> Result<usize> {
    let deleted = base::delete_where::<ProductionPrediction>(
        conn,
        uncompleted().lt(ProductionPredictionIden::CreatedAt, codec::ts(cutoff)),
    )?;
    info!(deleted, %cutoff, "deleted stale uncompleted predictions");
    Ok(deleted)
}

/// Accuracy of `actual` against the row's own predicted value, computed in
/// the same statement that stores it
fn achieved_accuracy(actual: f64) -> SimpleExpr {
    Expr::cust_with_values(
        "CASE WHEN predicted_value > 0 \
         THEN MAX(0.0, MIN(100.0, ROUND((1.0 - ABS(? - predicted_value) / predicted_value) * 100.0, 2))) \
         ELSE NULL END",
        [actual],
    )
}

fn by_code(code: &str) -> Filter {
    Filter::all().eq(ProductionPredictionIden::PredictionCode, code)
}

fn uncompleted() -> Filter {
    Filter::all().is_null(ProductionPredictionIden::ActualValue)
}
