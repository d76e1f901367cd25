//! Repository for predicted irrigation needs

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use sea_query::Order;
use tracing::info;

use crate::db::models::{IrrigationAlertLevel, IrrigationPrediction, IrrigationPredictionIden};
use crate::db::query::{codec, Filter};
use crate::db::repository::base::{self, Aggregate};
use crate::error::Result;

const NEWEST_FIRST: &[(IrrigationPredictionIden, Order)] =
    &[(IrrigationPredictionIden::PredictionDate, Order::Desc)];

pub fn find_irrigation_predictions_by_farm(
    conn: &Connection,
    farm_id: &str,
) -> Result<Vec<IrrigationPrediction>> {
    base::find_where_ordered(conn, by_farm(farm_id), NEWEST_FIRST)
}

pub fn find_irrigation_predictions_by_crop_production(
    conn: &Connection,
    crop_production_id: &str,
) -> Result<Vec<IrrigationPrediction>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(IrrigationPredictionIden::CropProductionId, crop_production_id),
        NEWEST_FIRST,
    )
}

pub fn find_irrigation_predictions_by_alert_level(
    conn: &Connection,
    level: IrrigationAlertLevel,
) -> Result<Vec<IrrigationPrediction>> {
    base::find_where_ordered(
        conn,
        Filter::all().eq(IrrigationPredictionIden::AlertLevel, level),
        NEWEST_FIRST,
    )
}

pub fn find_irrigation_predictions_by_farm_between(
    conn: &Connection,
    farm_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<IrrigationPrediction>> {
    base::find_where_ordered(conn, by_farm(farm_id).and(window(from, to)), NEWEST_FIRST)
}

/// HIGH and CRITICAL alerts, latest first
pub fn find_critical_irrigation_alerts(conn: &Connection) -> Result<Vec<IrrigationPrediction>> {
    let filter = Filter::all().is_in(
        IrrigationPredictionIden::AlertLevel,
        [IrrigationAlertLevel::High, IrrigationAlertLevel::Critical],
    );
    base::find_where_ordered(conn, filter, NEWEST_FIRST)
}

pub fn find_latest_irrigation_prediction_by_farm(
    conn: &Connection,
    farm_id: &str,
) -> Result<Option<IrrigationPrediction>> {
    base::find_first_ordered(conn, by_farm(farm_id), NEWEST_FIRST)
}

/// Predictions with a water stress risk strictly above `threshold`
pub fn find_high_water_stress(
    conn: &Connection,
    threshold: f64,
) -> Result<Vec<IrrigationPrediction>> {
    base::find_where_ordered(
        conn,
        Filter::all().gt(IrrigationPredictionIden::WaterStressRisk, threshold),
        &[(IrrigationPredictionIden::WaterStressRisk, Order::Desc)],
    )
}

pub fn average_water_need_by_farm(
    conn: &Connection,
    farm_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Option<f64>> {
    base::aggregate::<IrrigationPrediction>(
        conn,
        Aggregate::Avg,
        IrrigationPredictionIden::PredictedWaterNeed,
        by_farm(farm_id).and(window(from, to)),
    )
}

pub fn count_irrigation_predictions_by_alert_level(
    conn: &Connection,
) -> Result<Vec<(IrrigationAlertLevel, u64)>> {
    base::count_grouped::<IrrigationPrediction, _>(
        conn,
        IrrigationPredictionIden::AlertLevel,
        Filter::all(),
    )
}

/// Delete predictions made strictly before `cutoff`
pub fn delete_irrigation_predictions_before(
    conn: &Connection,
    cutoff: DateTime<Utc>,
) -> Result<usize> {
    let deleted = base::delete_where::<IrrigationPrediction>(
        conn,
        Filter::all().lt(IrrigationPredictionIden::PredictionDate, codec::ts(cutoff)),
    )?;
    info!(deleted, %cutoff, "deleted old irrigation predictions");
    Ok(deleted)
}

fn by_farm(farm_id: &str) -> Filter {
    Filter::all().eq(IrrigationPredictionIden::FarmId, farm_id)
}

fn window(from: DateTime<Utc>, to: DateTime<Utc>) -> Filter {
    Filter::all().between(
        IrrigationPredictionIden::PredictionDate,
        codec::ts(from),
        codec::ts(to),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_database;
    use chrono::TimeZone;

    fn on(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, day, 6, 0, 0).unwrap()
    }

    fn predicted(farm: &str, day: u32, need: f64, level: IrrigationAlertLevel) -> IrrigationPrediction {
        let mut p = IrrigationPrediction::new(farm, on(day), need);
        p.alert_level = level;
        p
    }

    #[test]
    fn test_farm_window_and_latest() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        base::save_all(
            &conn,
            &[
                predicted("farm-1", 1, 20.0, IrrigationAlertLevel::Low),
                predicted("farm-1", 5, 40.0, IrrigationAlertLevel::High),
                predicted("farm-1", 9, 60.0, IrrigationAlertLevel::Critical),
                predicted("farm-2", 5, 99.0, IrrigationAlertLevel::Low),
            ],
        )
        .unwrap();

        let window = find_irrigation_predictions_by_farm_between(&conn, "farm-1", on(2), on(9)).unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].prediction_date, on(9));

        assert_eq!(average_water_need_by_farm(&conn, "farm-1", on(1), on(9)).unwrap(), Some(40.0));
        assert_eq!(average_water_need_by_farm(&conn, "farm-3", on(1), on(9)).unwrap(), None);

        let latest = find_latest_irrigation_prediction_by_farm(&conn, "farm-1").unwrap().unwrap();
        assert_eq!(latest.predicted_water_need, 60.0);

        let critical = find_critical_irrigation_alerts(&conn).unwrap();
        assert_eq!(critical.len(), 2);
        assert_eq!(critical[0].alert_level, IrrigationAlertLevel::Critical);

        let counts = count_irrigation_predictions_by_alert_level(&conn).unwrap();
        assert_eq!(counts[0], (IrrigationAlertLevel::Low, 2));
    }

    #[test]
    fn test_water_stress_and_cleanup() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut stressed = predicted("farm-1", 2, 10.0, IrrigationAlertLevel::Moderate);
        stressed.water_stress_risk = Some(0.8);
        let mut borderline = predicted("farm-1", 8, 10.0, IrrigationAlertLevel::Moderate);
        borderline.water_stress_risk = Some(0.6);
        base::save_all(&conn, &[stressed, borderline]).unwrap();

        assert_eq!(find_high_water_stress(&conn, 0.6).unwrap().len(), 1);
        assert_eq!(delete_irrigation_predictions_before(&conn, on(5)).unwrap(), 1);
        assert_eq!(find_irrigation_predictions_by_farm(&conn, "farm-1").unwrap().len(), 1);
    }

    #[test]
    fn test_lookups_and_boundaries() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        let mut linked = predicted("farm-1", 3, 15.0, IrrigationAlertLevel::Moderate);
        linked.crop_production_id = Some("prod-1".to_string());
        let mut at_threshold = predicted("farm-1", 4, 15.0, IrrigationAlertLevel::Low);
        at_threshold.water_stress_risk = Some(0.5);
        base::save_all(
            &conn,
            &[linked, at_threshold, predicted("farm-1", 7, 25.0, IrrigationAlertLevel::Low)],
        )
        .unwrap();

        // Both window ends are included
        let window = find_irrigation_predictions_by_farm_between(&conn, "farm-1", on(3), on(7)).unwrap();
        assert_eq!(window.len(), 3);

        let by_farm = find_irrigation_predictions_by_farm(&conn, "farm-1").unwrap();
        let days: Vec<_> = by_farm.iter().map(|p| p.prediction_date).collect();
        assert_eq!(days, vec![on(7), on(4), on(3)]);

        assert_eq!(find_irrigation_predictions_by_crop_production(&conn, "prod-1").unwrap().len(), 1);
        assert_eq!(
            find_irrigation_predictions_by_alert_level(&conn, IrrigationAlertLevel::Low).unwrap().len(),
            2
        );
        assert!(find_high_water_stress(&conn, 0.5).unwrap().is_empty());
        assert_eq!(find_high_water_stress(&conn, 0.49).unwrap().len(), 1);
        assert!(find_critical_irrigation_alerts(&conn).unwrap().is_empty());
        assert!(find_latest_irrigation_prediction_by_farm(&conn, "farm-2").unwrap().is_none());
    }
}
