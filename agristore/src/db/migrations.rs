use rusqlite::{Connection, OptionalExtension, Result};
use tracing::{debug, info};

/// Current schema version - increment this when adding new migrations
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    // Create migrations table if it doesn't exist
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )?;

    let current_version = get_current_version(conn)?;
    debug!(current_version, target = CURRENT_VERSION, "checking schema version");

    // Run migrations in order
    if current_version < 1 {
        migrate_v1(conn)?;
        set_version(conn, 1)?;
        info!("applied schema migration v1");
    }

    if current_version < 2 {
        migrate_v2(conn)?;
        set_version(conn, 2)?;
        info!("applied schema migration v2");
    }

    Ok(())
}

/// Get the current schema version
pub fn get_current_version(conn: &Connection) -> Result<i32> {
    let version: Option<i32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))
        .optional()?
        .flatten();
    Ok(version.unwrap_or(0))
}

/// Set the schema version after a successful migration
fn set_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Migration v1: composite indexes for the multi-column lookups
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE INDEX IF NOT EXISTS idx_transactions_farmer_status
            ON transactions(farmer_id, status);

        CREATE INDEX IF NOT EXISTS idx_crop_productions_farm_status
            ON crop_productions(farm_id, production_status);

        CREATE INDEX IF NOT EXISTS idx_market_prices_crop_date
            ON market_prices(crop_id, price_date);

        CREATE INDEX IF NOT EXISTS idx_weather_data_station_date
            ON weather_data(station_id, record_date);

        CREATE INDEX IF NOT EXISTS idx_soil_data_farm_measured
            ON soil_data(farm_id, measurement_date);

        CREATE INDEX IF NOT EXISTS idx_ai_recommendations_farmer_read
            ON ai_recommendations(farmer_id, is_read, is_active);

        CREATE INDEX IF NOT EXISTS idx_resource_recommendations_farm_status
            ON resource_recommendations(farm_id, status);

        CREATE INDEX IF NOT EXISTS idx_climate_impacts_region_year
            ON climate_impacts(region, year);

        CREATE INDEX IF NOT EXISTS idx_supply_chains_production_order
            ON supply_chains(crop_production_id, stage_order);

        CREATE INDEX IF NOT EXISTS idx_irrigation_data_farm_date
            ON irrigation_data(farm_id, irrigation_date);
        "#,
    )?;
    Ok(())
}

/// Migration v2: physical soil properties used by the drainage checks
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        ALTER TABLE soil_data ADD COLUMN bulk_density REAL;
        ALTER TABLE soil_data ADD COLUMN porosity REAL;
        "#,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;

    fn setup_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::init_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_fresh_database_reaches_current_version() {
        let conn = setup_conn();
        run_migrations(&conn).unwrap();
        assert_eq!(get_current_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_running_twice_is_a_no_op() {
        let conn = setup_conn();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, i64::from(CURRENT_VERSION));
    }

    #[test]
    fn test_v1_creates_composite_indexes() {
        let conn = setup_conn();
        run_migrations(&conn).unwrap();

        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = 'idx_transactions_farmer_status')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(exists);
    }

    #[test]
    fn test_v2_adds_soil_physical_columns() {
        let conn = setup_conn();
        run_migrations(&conn).unwrap();

        let columns: Vec<String> = conn
            .prepare("SELECT name FROM pragma_table_info('soil_data')")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert!(columns.iter().any(|c| c == "bulk_density"));
        assert!(columns.iter().any(|c| c == "porosity"));
    }
}
