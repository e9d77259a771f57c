//! Database initialization
//!
//! Opens (or creates) the SQLite report store and creates the
//! `doctor_reports` table if needed. Schema creation is idempotent and safe
//! to run on every startup.

use crate::config::DatabaseConfig;
use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path, config: &DatabaseConfig) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = connect_pool(&db_url, config).await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows concurrent readers while a report is being written
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// Build a connection pool for the given SQLite URL
pub async fn connect_pool(db_url: &str, config: &DatabaseConfig) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Some(Duration::from_secs(600)))
        .connect(db_url)
        .await?;

    Ok(pool)
}

/// Create the report tables (idempotent)
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_doctor_reports_table(pool).await?;
    info!("Database tables initialized (doctor_reports)");
    Ok(())
}

/// One flat row per verification report
///
/// `*_matches` columns are tri-state: 1, 0 or NULL (not enough data to compare).
/// Multi-valued fields (insurance networks, observed services) hold JSON arrays.
async fn create_doctor_reports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS doctor_reports (
            report_id TEXT PRIMARY KEY,
            verification_id TEXT NOT NULL UNIQUE,

            full_name_input TEXT,
            full_name_scraped TEXT,
            full_name_scraped_from TEXT,
            full_name_matches INTEGER,

            specialty_input TEXT,
            specialty_scraped TEXT,
            specialty_scraped_from TEXT,
            specialty_matches INTEGER,

            address_input TEXT,
            address_scraped TEXT,
            address_scraped_from TEXT,
            address_matches INTEGER,

            phone_number_input TEXT,
            phone_number_scraped TEXT,
            phone_number_scraped_from TEXT,
            phone_number_matches INTEGER,

            license_number_input TEXT,
            license_number_scraped TEXT,
            license_number_scraped_from TEXT,
            license_number_matches INTEGER,

            insurance_networks_input TEXT,
            insurance_networks_scraped TEXT,
            insurance_networks_scraped_from TEXT,
            insurance_networks_matches INTEGER,

            services_offered_input TEXT,
            services_offered_scraped TEXT,
            services_offered_scraped_from TEXT,
            services_offered_matches INTEGER,

            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,

            CHECK (full_name_matches IN (0, 1) OR full_name_matches IS NULL),
            CHECK (specialty_matches IN (0, 1) OR specialty_matches IS NULL),
            CHECK (address_matches IN (0, 1) OR address_matches IS NULL),
            CHECK (phone_number_matches IN (0, 1) OR phone_number_matches IS NULL),
            CHECK (license_number_matches IN (0, 1) OR license_number_matches IS NULL),
            CHECK (insurance_networks_matches IN (0, 1) OR insurance_networks_matches IS NULL),
            CHECK (services_offered_matches IN (0, 1) OR services_offered_matches IS NULL)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_doctor_reports_created_at ON doctor_reports(created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
