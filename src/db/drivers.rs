//! Driver location persistence.

use sqlx::{sqlite::SqliteRow, Row};

use super::{now_timestamp, Repository};
use crate::errors::AppError;
use crate::models::{DriverLocation, UpdateLocationRequest};

impl Repository {
    /// Store the driver's current position, replacing the previous one.
    pub async fn upsert_driver_location(
        &self,
        driver_id: &str,
        request: &UpdateLocationRequest,
    ) -> Result<DriverLocation, AppError> {
        let now = now_timestamp();

        sqlx::query(
            r#"INSERT INTO driver_locations (driver_id, latitude, longitude, heading, speed, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(driver_id) DO UPDATE SET
                   latitude = excluded.latitude,
                   longitude = excluded.longitude,
                   heading = excluded.heading,
                   speed = excluded.speed,
                   updated_at = excluded.updated_at"#,
        )
        .bind(driver_id)
        .bind(request.latitude)
        .bind(request.longitude)
        .bind(request.heading)
        .bind(request.speed)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(DriverLocation {
            driver_id: driver_id.to_string(),
            latitude: request.latitude,
            longitude: request.longitude,
            heading: request.heading,
            speed: request.speed,
            updated_at: now,
        })
    }

    /// Get a driver's last known position.
    pub async fn get_driver_location(
        &self,
        driver_id: &str,
    ) -> Result<Option<DriverLocation>, AppError> {
        let row = sqlx::query(
            "SELECT driver_id, latitude, longitude, heading, speed, updated_at FROM driver_locations WHERE driver_id = ?",
        )
        .bind(driver_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(location_from_row))
    }

    /// List every driver's last known position.
    pub async fn list_driver_locations(&self) -> Result<Vec<DriverLocation>, AppError> {
        let rows = sqlx::query(
            "SELECT driver_id, latitude, longitude, heading, speed, updated_at FROM driver_locations ORDER BY driver_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(location_from_row).collect())
    }
}

fn location_from_row(row: &SqliteRow) -> DriverLocation {
    DriverLocation {
        driver_id: row.get("driver_id"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        heading: row.get("heading"),
        speed: row.get("speed"),
        updated_at: row.get("updated_at"),
    }
}
