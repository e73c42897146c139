//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all application data.

mod bookings;
mod cms;
mod comments;
mod costs;
mod drivers;
mod feedback;
mod users;

pub use bookings::PaymentUpdate;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::errors::AppError;
use crate::models::{default_configuration, format_timestamp};

/// Database repository for all data operations.
///
/// Operations are grouped per entity in the submodules of `db`.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Check an expected version against the stored one.
fn check_version(expected: Option<i64>, current: i64) -> Result<(), AppError> {
    match expected {
        Some(expected) if expected != current => Err(AppError::Conflict {
            message: format!(
                "Version mismatch: expected {}, current {}",
                expected, current
            ),
            current_version: current,
        }),
        _ => Ok(()),
    }
}

fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bookings (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT NOT NULL,
            pickup_location TEXT NOT NULL,
            dropoff_location TEXT NOT NULL,
            pickup_date_time TEXT NOT NULL,
            passengers INTEGER NOT NULL,
            fare REAL,
            flight_number TEXT,
            notes TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            driver_id TEXT,
            payment_status TEXT NOT NULL DEFAULT 'unpaid',
            payment_link_url TEXT,
            payment_order_id TEXT,
            payment_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cms_config (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            data TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1,
            updated_at TEXT NOT NULL,
            updated_by TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT OR IGNORE INTO cms_config (id, data, version, updated_at) VALUES (1, ?, 1, ?)",
    )
    .bind(default_configuration().to_string())
    .bind(now_timestamp())
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id TEXT PRIMARY KEY,
            page_url TEXT NOT NULL,
            element_selector TEXT NOT NULL,
            element_text TEXT,
            comment TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'open',
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            resolved_at TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS costs (
            id TEXT PRIMARY KEY,
            category TEXT NOT NULL,
            provider TEXT NOT NULL,
            amount REAL NOT NULL,
            description TEXT,
            booking_id TEXT,
            incurred_at TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS driver_locations (
            driver_id TEXT PRIMARY KEY,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            heading REAL,
            speed REAL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS feedback (
            id TEXT PRIMARY KEY,
            booking_id TEXT,
            name TEXT NOT NULL,
            email TEXT,
            rating INTEGER NOT NULL,
            comment TEXT NOT NULL,
            approved INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'customer',
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            expires_at TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_bookings_status ON bookings(status);
        CREATE INDEX IF NOT EXISTS idx_bookings_pickup ON bookings(pickup_date_time);
        CREATE INDEX IF NOT EXISTS idx_bookings_order ON bookings(payment_order_id);
        CREATE INDEX IF NOT EXISTS idx_comments_page ON comments(page_url);
        CREATE INDEX IF NOT EXISTS idx_costs_incurred ON costs(incurred_at);
        CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_repository() -> (Repository, tempfile::TempDir) {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let pool = init_database(&temp_dir.path().join("test.sqlite"))
        .await
        .expect("Failed to init DB");
    (Repository::new(pool), temp_dir)
}
