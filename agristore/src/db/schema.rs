//! Table definitions
//!
//! Every table has a TEXT primary key. Timestamps are UTC RFC 3339 text,
//! dates are `YYYY-MM-DD` text and classification enums are stored by name.
//! Relations between records are plain id columns without foreign key
//! constraints.

use rusqlite::{Connection, Result};

pub fn init_database(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Farms and their physical characteristics
        CREATE TABLE IF NOT EXISTS farms (
            id TEXT PRIMARY KEY,
            farmer_id TEXT NOT NULL,
            farm_name TEXT NOT NULL,
            farm_code TEXT NOT NULL UNIQUE,
            farm_size REAL NOT NULL CHECK (farm_size > 0),
            soil_type TEXT,
            latitude REAL,
            longitude REAL,
            altitude REAL,
            irrigation_system TEXT NOT NULL DEFAULT 'RAIN_FED',
            topography TEXT,
            water_source TEXT,
            electricity_available INTEGER NOT NULL DEFAULT 0,
            road_access_quality TEXT NOT NULL DEFAULT 'MODERATE',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Farmer profiles
        CREATE TABLE IF NOT EXISTS farmers (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL UNIQUE,
            farmer_code TEXT NOT NULL UNIQUE,
            cooperative_name TEXT,
            total_land_size REAL,
            location TEXT,
            latitude REAL,
            longitude REAL,
            province TEXT,
            district TEXT,
            sector TEXT,
            experience_level TEXT NOT NULL DEFAULT 'BEGINNER',
            certification_level TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Crop catalogue
        CREATE TABLE IF NOT EXISTS crops (
            id TEXT PRIMARY KEY,
            crop_name TEXT NOT NULL UNIQUE,
            crop_type TEXT NOT NULL,
            scientific_name TEXT,
            variety TEXT,
            growing_period_days INTEGER,
            planting_season TEXT,
            harvest_season TEXT,
            water_requirement REAL,
            soil_ph_min REAL,
            soil_ph_max REAL,
            temperature_min REAL,
            temperature_max REAL,
            market_demand_level TEXT NOT NULL DEFAULT 'MEDIUM',
            storage_life_days INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Crop production cycles
        CREATE TABLE IF NOT EXISTS crop_productions (
            id TEXT PRIMARY KEY,
            farm_id TEXT NOT NULL,
            crop_id TEXT NOT NULL,
            production_code TEXT NOT NULL UNIQUE,
            planting_date TEXT NOT NULL,
            expected_harvest_date TEXT,
            actual_harvest_date TEXT,
            area_planted REAL NOT NULL,
            expected_yield REAL,
            actual_yield REAL,
            total_production REAL,
            price_per_kg REAL,
            production_status TEXT NOT NULL DEFAULT 'PLANNED',
            season TEXT,
            year INTEGER NOT NULL,
            seed_variety TEXT,
            seed_source TEXT,
            production_method TEXT NOT NULL DEFAULT 'CONVENTIONAL',
            certification TEXT,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Sales between farmers and buyers
        CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            transaction_code TEXT NOT NULL UNIQUE,
            farmer_id TEXT NOT NULL,
            buyer_id TEXT NOT NULL,
            crop_id TEXT,
            crop_production_id TEXT,
            transaction_date TEXT NOT NULL,
            quantity REAL NOT NULL,
            unit TEXT NOT NULL DEFAULT 'KG',
            price_per_unit REAL NOT NULL,
            total_amount REAL NOT NULL,
            currency TEXT NOT NULL DEFAULT 'XAF',
            status TEXT NOT NULL DEFAULT 'PENDING',
            payment_method TEXT,
            delivery_date TEXT,
            delivery_location TEXT,
            quality_grade TEXT,
            transport_responsibility TEXT NOT NULL DEFAULT 'BUYER',
            payment_date TEXT,
            completion_date TEXT,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Stored produce
        CREATE TABLE IF NOT EXISTS inventories (
            id TEXT PRIMARY KEY,
            inventory_code TEXT NOT NULL UNIQUE,
            crop_id TEXT NOT NULL,
            farmer_user_id TEXT,
            facility_type TEXT NOT NULL,
            storage_location TEXT,
            facility_name TEXT,
            storage_capacity REAL,
            current_quantity REAL NOT NULL,
            reserved_quantity REAL NOT NULL DEFAULT 0.0,
            available_quantity REAL NOT NULL,
            unit TEXT NOT NULL DEFAULT 'KG',
            quality_grade TEXT,
            harvest_date TEXT,
            storage_date TEXT,
            expiry_date TEXT,
            status TEXT NOT NULL DEFAULT 'AVAILABLE',
            pest_status TEXT NOT NULL DEFAULT 'PEST_FREE',
            market_value_per_unit REAL,
            minimum_stock_level REAL,
            loss_percentage REAL NOT NULL DEFAULT 0.0,
            organic_certified INTEGER NOT NULL DEFAULT 0,
            next_inspection_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Soil test results
        CREATE TABLE IF NOT EXISTS soil_data (
            id TEXT PRIMARY KEY,
            farm_id TEXT NOT NULL,
            sample_code TEXT NOT NULL UNIQUE,
            ph_level REAL,
            nitrogen REAL,
            phosphorus REAL,
            potassium REAL,
            organic_matter REAL,
            moisture REAL,
            electrical_conductivity REAL,
            soil_texture TEXT,
            measurement_date TEXT NOT NULL,
            testing_method TEXT,
            laboratory_name TEXT,
            depth_cm INTEGER NOT NULL DEFAULT 30,
            recommendations TEXT,
            next_test_due TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Weather observations
        CREATE TABLE IF NOT EXISTS weather_data (
            id TEXT PRIMARY KEY,
            station_id TEXT,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            record_date TEXT NOT NULL,
            temperature REAL,
            temperature_min REAL,
            temperature_max REAL,
            humidity REAL,
            rainfall REAL,
            wind_speed REAL,
            weather_condition TEXT,
            data_source TEXT,
            data_quality TEXT NOT NULL DEFAULT 'GOOD',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Regional environmental monitoring
        CREATE TABLE IF NOT EXISTS environmental_data (
            id TEXT PRIMARY KEY,
            monitoring_code TEXT NOT NULL UNIQUE,
            region TEXT NOT NULL,
            district TEXT,
            sector TEXT,
            latitude REAL,
            longitude REAL,
            record_date TEXT NOT NULL,
            data_source TEXT,
            air_quality_index INTEGER,
            water_quality_index INTEGER,
            forest_coverage REAL,
            carbon_emission REAL,
            biodiversity_index REAL,
            soil_erosion_rate REAL,
            environmental_risk_level TEXT NOT NULL DEFAULT 'LOW',
            data_quality TEXT NOT NULL DEFAULT 'GOOD',
            validation_status TEXT NOT NULL DEFAULT 'PENDING',
            validated_by TEXT,
            validation_date TEXT,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Climate events and their agricultural impact
        CREATE TABLE IF NOT EXISTS climate_impacts (
            id TEXT PRIMARY KEY,
            impact_code TEXT NOT NULL UNIQUE,
            crop_id TEXT,
            region TEXT NOT NULL,
            district TEXT,
            year INTEGER NOT NULL,
            season TEXT,
            climate_event TEXT NOT NULL,
            event_intensity TEXT NOT NULL,
            event_start_date TEXT,
            event_end_date TEXT,
            affected_area REAL,
            affected_population INTEGER,
            yield_impact REAL,
            production_loss REAL,
            economic_loss REAL,
            reported_by TEXT,
            report_date TEXT,
            verified INTEGER NOT NULL DEFAULT 0,
            verification_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Market price observations
        CREATE TABLE IF NOT EXISTS market_prices (
            id TEXT PRIMARY KEY,
            crop_id TEXT NOT NULL,
            market_name TEXT NOT NULL,
            market_type TEXT NOT NULL,
            location TEXT,
            price_date TEXT NOT NULL,
            price_per_kg REAL NOT NULL,
            currency TEXT NOT NULL DEFAULT 'RWF',
            quality_grade TEXT,
            demand_level TEXT NOT NULL DEFAULT 'MEDIUM',
            supply_level TEXT NOT NULL DEFAULT 'MEDIUM',
            price_trend TEXT NOT NULL DEFAULT 'STABLE',
            data_source TEXT,
            reliability_score INTEGER NOT NULL DEFAULT 5,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Production forecasts
        CREATE TABLE IF NOT EXISTS production_predictions (
            id TEXT PRIMARY KEY,
            prediction_code TEXT NOT NULL UNIQUE,
            crop_production_id TEXT,
            crop_id TEXT,
            region TEXT,
            district TEXT,
            year INTEGER NOT NULL,
            season TEXT,
            prediction_type TEXT NOT NULL,
            predicted_value REAL NOT NULL,
            unit TEXT,
            confidence_level REAL,
            model_used TEXT,
            model_version TEXT,
            prediction_date TEXT NOT NULL,
            target_date TEXT,
            actual_value REAL,
            accuracy_achieved REAL,
            validation_status TEXT NOT NULL DEFAULT 'PENDING',
            published INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Irrigation need forecasts
        CREATE TABLE IF NOT EXISTS irrigation_predictions (
            id TEXT PRIMARY KEY,
            farm_id TEXT NOT NULL,
            crop_production_id TEXT,
            prediction_date TEXT NOT NULL,
            predicted_water_need REAL NOT NULL,
            predicted_irrigation_frequency INTEGER,
            recommended_method TEXT,
            water_stress_risk REAL,
            confidence_level REAL,
            cost_estimation REAL,
            alert_level TEXT NOT NULL DEFAULT 'LOW',
            recommendations TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Resource recommendations for farms
        CREATE TABLE IF NOT EXISTS resource_recommendations (
            id TEXT PRIMARY KEY,
            recommendation_code TEXT NOT NULL UNIQUE,
            farm_id TEXT NOT NULL,
            crop_production_id TEXT,
            resource_type TEXT NOT NULL,
            recommendation_category TEXT NOT NULL,
            priority_level TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            recommended_quantity REAL,
            unit TEXT,
            estimated_cost REAL,
            confidence_score REAL,
            generated_date TEXT NOT NULL,
            valid_until TEXT,
            status TEXT NOT NULL DEFAULT 'ACTIVE',
            implementation_date TEXT,
            effectiveness_rating INTEGER,
            created_by TEXT NOT NULL DEFAULT 'AI_SYSTEM',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Generated advice for farmers
        CREATE TABLE IF NOT EXISTS ai_recommendations (
            id TEXT PRIMARY KEY,
            farmer_id TEXT NOT NULL,
            farm_id TEXT,
            crop_production_id TEXT,
            recommendation_type TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            priority TEXT NOT NULL DEFAULT 'MEDIUM',
            confidence_score REAL,
            generated_by TEXT,
            is_read INTEGER NOT NULL DEFAULT 0,
            is_implemented INTEGER NOT NULL DEFAULT 0,
            implementation_date TEXT,
            effectiveness_rating INTEGER,
            valid_until TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            read_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Food security alerts
        CREATE TABLE IF NOT EXISTS food_security_alerts (
            id TEXT PRIMARY KEY,
            alert_code TEXT NOT NULL UNIQUE,
            alert_title TEXT NOT NULL,
            alert_category TEXT NOT NULL,
            description TEXT,
            alert_level TEXT NOT NULL,
            severity_score INTEGER,
            affected_region TEXT NOT NULL,
            affected_population INTEGER,
            alert_date TEXT NOT NULL,
            expiry_date TEXT,
            source TEXT,
            source_reliability TEXT NOT NULL DEFAULT 'UNVERIFIED',
            is_active INTEGER NOT NULL DEFAULT 1,
            response_required INTEGER NOT NULL DEFAULT 0,
            resolution_status TEXT NOT NULL DEFAULT 'UNRESOLVED',
            resolution_date TEXT,
            created_by TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Agricultural policies
        CREATE TABLE IF NOT EXISTS policy_data (
            id TEXT PRIMARY KEY,
            policy_code TEXT NOT NULL UNIQUE,
            policy_name TEXT NOT NULL,
            policy_type TEXT NOT NULL,
            policy_category TEXT NOT NULL,
            description TEXT,
            geographic_scope TEXT NOT NULL DEFAULT 'NATIONAL',
            affected_regions TEXT,
            effective_date TEXT NOT NULL,
            expiry_date TEXT,
            total_budget REAL,
            budget_utilized REAL,
            utilization_rate REAL,
            implementing_agency TEXT,
            beneficiaries_count INTEGER,
            status TEXT NOT NULL DEFAULT 'DRAFT',
            climate_smart INTEGER NOT NULL DEFAULT 0,
            youth_focus INTEGER NOT NULL DEFAULT 0,
            created_by TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- User-facing notifications
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            message TEXT NOT NULL,
            notification_type TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            content_hash TEXT,
            duplicate INTEGER NOT NULL DEFAULT 0
        );

        -- Supply chain stages
        CREATE TABLE IF NOT EXISTS supply_chains (
            id TEXT PRIMARY KEY,
            crop_production_id TEXT NOT NULL,
            transaction_id TEXT,
            stage TEXT NOT NULL,
            stage_order INTEGER NOT NULL,
            stage_start_date TEXT,
            stage_end_date TEXT,
            location TEXT,
            facility_name TEXT,
            quantity_in REAL,
            quantity_out REAL,
            unit TEXT NOT NULL DEFAULT 'KG',
            loss_quantity REAL NOT NULL DEFAULT 0.0,
            loss_percentage REAL NOT NULL DEFAULT 0.0,
            quality_status TEXT NOT NULL DEFAULT 'GOOD',
            responsible_party TEXT,
            cost_incurred REAL,
            insurance_coverage INTEGER NOT NULL DEFAULT 0,
            tracking_code TEXT UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Buyer profiles
        CREATE TABLE IF NOT EXISTS buyers (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL UNIQUE,
            buyer_code TEXT NOT NULL UNIQUE,
            company_name TEXT,
            buyer_type TEXT NOT NULL,
            location TEXT,
            contact_person TEXT,
            credit_limit REAL NOT NULL DEFAULT 0.0,
            storage_capacity REAL,
            rating REAL NOT NULL DEFAULT 5.0,
            verified INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- User accounts
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            full_name TEXT,
            phone_number TEXT,
            role TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            last_login TEXT,
            profile_image_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Fertilizer applications
        CREATE TABLE IF NOT EXISTS fertilizer_usages (
            id TEXT PRIMARY KEY,
            crop_production_id TEXT NOT NULL,
            fertilizer_type TEXT NOT NULL,
            fertilizer_name TEXT NOT NULL,
            brand TEXT,
            quantity REAL NOT NULL,
            unit TEXT NOT NULL,
            application_date TEXT NOT NULL,
            application_method TEXT NOT NULL,
            application_stage TEXT,
            cost_per_unit REAL,
            total_cost REAL,
            supplier TEXT,
            batch_number TEXT,
            expiry_date TEXT,
            effectiveness_rating INTEGER,
            operator_name TEXT,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Irrigation events
        CREATE TABLE IF NOT EXISTS irrigation_data (
            id TEXT PRIMARY KEY,
            farm_id TEXT NOT NULL,
            crop_production_id TEXT,
            irrigation_date TEXT NOT NULL,
            water_amount REAL NOT NULL,
            irrigation_method TEXT NOT NULL,
            duration INTEGER,
            water_source TEXT,
            water_cost REAL,
            total_cost REAL,
            soil_moisture_before REAL,
            soil_moisture_after REAL,
            operator_name TEXT,
            equipment_used TEXT,
            fertilizer_applied INTEGER NOT NULL DEFAULT 0,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Indexes
        CREATE INDEX IF NOT EXISTS idx_farms_farmer_id ON farms(farmer_id);
        CREATE INDEX IF NOT EXISTS idx_farms_soil_type ON farms(soil_type);
        CREATE INDEX IF NOT EXISTS idx_crops_crop_type ON crops(crop_type);
        CREATE INDEX IF NOT EXISTS idx_crop_productions_farm_id ON crop_productions(farm_id);
        CREATE INDEX IF NOT EXISTS idx_crop_productions_crop_id ON crop_productions(crop_id);
        CREATE INDEX IF NOT EXISTS idx_crop_productions_production_status ON crop_productions(production_status);
        CREATE INDEX IF NOT EXISTS idx_transactions_farmer_id ON transactions(farmer_id);
        CREATE INDEX IF NOT EXISTS idx_transactions_buyer_id ON transactions(buyer_id);
        CREATE INDEX IF NOT EXISTS idx_transactions_crop_id ON transactions(crop_id);
        CREATE INDEX IF NOT EXISTS idx_transactions_crop_production_id ON transactions(crop_production_id);
        CREATE INDEX IF NOT EXISTS idx_transactions_status ON transactions(status);
        CREATE INDEX IF NOT EXISTS idx_transactions_transaction_date ON transactions(transaction_date);
        CREATE INDEX IF NOT EXISTS idx_inventories_crop_id ON inventories(crop_id);
        CREATE INDEX IF NOT EXISTS idx_inventories_farmer_user_id ON inventories(farmer_user_id);
        CREATE INDEX IF NOT EXISTS idx_inventories_status ON inventories(status);
        CREATE INDEX IF NOT EXISTS idx_inventories_expiry_date ON inventories(expiry_date);
        CREATE INDEX IF NOT EXISTS idx_soil_data_farm_id ON soil_data(farm_id);
        CREATE INDEX IF NOT EXISTS idx_soil_data_measurement_date ON soil_data(measurement_date);
        CREATE INDEX IF NOT EXISTS idx_weather_data_station_id ON weather_data(station_id);
        CREATE INDEX IF NOT EXISTS idx_weather_data_record_date ON weather_data(record_date);
        CREATE INDEX IF NOT EXISTS idx_environmental_data_region ON environmental_data(region);
        CREATE INDEX IF NOT EXISTS idx_climate_impacts_crop_id ON climate_impacts(crop_id);
        CREATE INDEX IF NOT EXISTS idx_climate_impacts_region ON climate_impacts(region);
        CREATE INDEX IF NOT EXISTS idx_climate_impacts_year ON climate_impacts(year);
        CREATE INDEX IF NOT EXISTS idx_market_prices_crop_id ON market_prices(crop_id);
        CREATE INDEX IF NOT EXISTS idx_market_prices_price_date ON market_prices(price_date);
        CREATE INDEX IF NOT EXISTS idx_production_predictions_crop_production_id ON production_predictions(crop_production_id);
        CREATE INDEX IF NOT EXISTS idx_production_predictions_crop_id ON production_predictions(crop_id);
        CREATE INDEX IF NOT EXISTS idx_production_predictions_target_date ON production_predictions(target_date);
        CREATE INDEX IF NOT EXISTS idx_irrigation_predictions_farm_id ON irrigation_predictions(farm_id);
        CREATE INDEX IF NOT EXISTS idx_irrigation_predictions_crop_production_id ON irrigation_predictions(crop_production_id);
        CREATE INDEX IF NOT EXISTS idx_resource_recommendations_farm_id ON resource_recommendations(farm_id);
        CREATE INDEX IF NOT EXISTS idx_resource_recommendations_crop_production_id ON resource_recommendations(crop_production_id);
        CREATE INDEX IF NOT EXISTS idx_resource_recommendations_status ON resource_recommendations(status);
        CREATE INDEX IF NOT EXISTS idx_ai_recommendations_farmer_id ON ai_recommendations(farmer_id);
        CREATE INDEX IF NOT EXISTS idx_ai_recommendations_farm_id ON ai_recommendations(farm_id);
        CREATE INDEX IF NOT EXISTS idx_ai_recommendations_crop_production_id ON ai_recommendations(crop_production_id);
        CREATE INDEX IF NOT EXISTS idx_ai_recommendations_is_active ON ai_recommendations(is_active);
        CREATE INDEX IF NOT EXISTS idx_food_security_alerts_is_active ON food_security_alerts(is_active);
        CREATE INDEX IF NOT EXISTS idx_food_security_alerts_alert_level ON food_security_alerts(alert_level);
        CREATE INDEX IF NOT EXISTS idx_policy_data_status ON policy_data(status);
        CREATE INDEX IF NOT EXISTS idx_notifications_timestamp ON notifications(timestamp);
        CREATE INDEX IF NOT EXISTS idx_notifications_content_hash ON notifications(content_hash);
        CREATE INDEX IF NOT EXISTS idx_supply_chains_crop_production_id ON supply_chains(crop_production_id);
        CREATE INDEX IF NOT EXISTS idx_supply_chains_transaction_id ON supply_chains(transaction_id);
        CREATE INDEX IF NOT EXISTS idx_supply_chains_stage ON supply_chains(stage);
        CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);
        CREATE INDEX IF NOT EXISTS idx_fertilizer_usages_crop_production_id ON fertilizer_usages(crop_production_id);
        CREATE INDEX IF NOT EXISTS idx_fertilizer_usages_application_date ON fertilizer_usages(application_date);
        CREATE INDEX IF NOT EXISTS idx_irrigation_data_farm_id ON irrigation_data(farm_id);
        CREATE INDEX IF NOT EXISTS idx_irrigation_data_crop_production_id ON irrigation_data(crop_production_id);
        CREATE INDEX IF NOT EXISTS idx_irrigation_data_irrigation_date ON irrigation_data(irrigation_date);
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<String>>>()
            .unwrap()
    }

    #[test]
    fn test_creates_every_table() {
        let conn = Connection::open_in_memory().unwrap();
        init_database(&conn).unwrap();

        let names = table_names(&conn);
        for table in ["farms", "crop_productions", "policy_data", "notifications", "irrigation_data"] {
            assert!(names.iter().any(|n| n == table), "missing table {table}");
        }
        assert_eq!(names.len(), 23);
    }

    #[test]
    fn test_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_database(&conn).unwrap();
        init_database(&conn).unwrap();
    }

    #[test]
    fn test_business_codes_are_unique() {
        let conn = Connection::open_in_memory().unwrap();
        init_database(&conn).unwrap();

        let insert = "INSERT INTO farms (id, farmer_id, farm_name, farm_code, farm_size, created_at, updated_at) \
                      VALUES (?1, 'f1', 'Hill', 'FARM-1', 2.0, '2024-01-01T00:00:00.000Z', '2024-01-01T00:00:00.000Z')";
        conn.execute(insert, ["a"]).unwrap();
        assert!(conn.execute(insert, ["b"]).is_err());
    }

    #[test]
    fn test_farm_size_must_be_positive() {
        let conn = Connection::open_in_memory().unwrap();
        init_database(&conn).unwrap();

        let insert = "INSERT INTO farms (id, farmer_id, farm_name, farm_code, farm_size, created_at, updated_at) \
                      VALUES (?1, 'f1', 'Hill', ?1, ?2, '2024-01-01T00:00:00.000Z', '2024-01-01T00:00:00.000Z')";
        assert!(conn.execute(insert, rusqlite::params!["zero", 0.0]).is_err());
        assert!(conn.execute(insert, rusqlite::params!["negative", -4.0]).is_err());
        assert!(conn.execute(insert, rusqlite::params!["tiny", 0.01]).is_ok());
    }
}
