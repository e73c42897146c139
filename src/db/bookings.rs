//! Booking persistence.

use sqlx::{sqlite::SqliteRow, Row};

use super::{check_version, now_timestamp, Repository};
use crate::errors::AppError;
use crate::models::{
    Booking, BookingStatus, NewBooking, PaymentStatus, UpdateBookingRequest,
};

const BOOKING_COLUMNS: &str = "id, name, email, phone, pickup_location, dropoff_location, \
     pickup_date_time, passengers, fare, flight_number, notes, status, driver_id, \
     payment_status, payment_link_url, payment_order_id, payment_id, created_at, updated_at, version";

/// Payment fields written together after a Square interaction.
#[derive(Debug, Clone, Default)]
pub struct PaymentUpdate {
    pub payment_status: Option<PaymentStatus>,
    pub payment_link_url: Option<String>,
    pub payment_order_id: Option<String>,
    pub payment_id: Option<String>,
}

impl Repository {
    /// List bookings ordered by pickup time, optionally filtered by status.
    pub async fn list_bookings(
        &self,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>, AppError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {} FROM bookings WHERE status = ? ORDER BY pickup_date_time",
                    BOOKING_COLUMNS
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM bookings ORDER BY pickup_date_time",
                    BOOKING_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(booking_from_row).collect())
    }

    /// Get a booking by ID.
    pub async fn get_booking(&self, id: &str) -> Result<Option<Booking>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM bookings WHERE id = ?",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(booking_from_row))
    }

    /// Get a booking by ID, or `NotFound`.
    pub async fn require_booking(&self, id: &str) -> Result<Booking, AppError> {
        self.get_booking(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", id)))
    }

    /// Confirmed or in-progress bookings a driver is assigned to.
    pub async fn list_active_bookings_for_driver(
        &self,
        driver_id: &str,
    ) -> Result<Vec<Booking>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM bookings WHERE driver_id = ? AND status IN ('confirmed', 'in-progress') ORDER BY pickup_date_time",
            BOOKING_COLUMNS
        ))
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(booking_from_row).collect())
    }

    /// Find the booking a Square order was created for.
    pub async fn find_booking_by_order(&self, order_id: &str) -> Result<Option<Booking>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM bookings WHERE payment_order_id = ?",
            BOOKING_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(booking_from_row))
    }

    /// Create a booking from a validated form.
    pub async fn create_booking(&self, booking: &NewBooking) -> Result<Booking, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query(
            r#"INSERT INTO bookings (
                id, name, email, phone, pickup_location, dropoff_location, pickup_date_time,
                passengers, fare, flight_number, notes, status, payment_status,
                created_at, updated_at, version
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)"#,
        )
        .bind(&id)
        .bind(&booking.name)
        .bind(&booking.email)
        .bind(&booking.phone)
        .bind(&booking.pickup_location)
        .bind(&booking.dropoff_location)
        .bind(&booking.pickup_date_time)
        .bind(booking.passengers)
        .bind(booking.fare)
        .bind(&booking.flight_number)
        .bind(&booking.notes)
        .bind(BookingStatus::Pending.as_str())
        .bind(PaymentStatus::Unpaid.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Booking {
            id,
            name: booking.name.clone(),
            email: booking.email.clone(),
            phone: booking.phone.clone(),
            pickup_location: booking.pickup_location.clone(),
            dropoff_location: booking.dropoff_location.clone(),
            pickup_date_time: booking.pickup_date_time.clone(),
            passengers: booking.passengers,
            fare: booking.fare,
            flight_number: booking.flight_number.clone(),
            notes: booking.notes.clone(),
            status: BookingStatus::Pending,
            driver_id: None,
            payment_status: PaymentStatus::Unpaid,
            payment_link_url: None,
            payment_order_id: None,
            payment_id: None,
            created_at: now.clone(),
            updated_at: now,
            version: 1,
        })
    }

    /// Move a booking to `status`, enforcing the lifecycle table.
    ///
    /// Returns the booking and whether anything changed; re-applying the
    /// current status is a no-op.
    pub async fn update_booking_status(
        &self,
        id: &str,
        status: BookingStatus,
        expected_version: Option<i64>,
    ) -> Result<(Booking, bool), AppError> {
        let existing = self.require_booking(id).await?;
        check_version(expected_version, existing.version)?;

        if existing.status == status {
            return Ok((existing, false));
        }
        if !existing.status.can_transition_to(status) {
            return Err(AppError::InvalidTransition {
                from: existing.status.as_str().to_string(),
                to: status.as_str().to_string(),
            });
        }

        let now = now_timestamp();
        let result = sqlx::query(
            "UPDATE bookings SET status = ?, updated_at = ?, version = version + 1 WHERE id = ? AND version = ?",
        )
        .bind(status.as_str())
        .bind(&now)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.concurrent_modification(id).await);
        }

        Ok((
            Booking {
                status,
                updated_at: now,
                version: existing.version + 1,
                ..existing
            },
            true,
        ))
    }

    /// Assign (or unassign) a driver.
    pub async fn assign_driver(
        &self,
        id: &str,
        driver_id: Option<&str>,
        expected_version: Option<i64>,
    ) -> Result<Booking, AppError> {
        let existing = self.require_booking(id).await?;
        check_version(expected_version, existing.version)?;

        if existing.status.is_terminal() {
            return Err(AppError::validation(format!(
                "Cannot assign a driver to a {} booking",
                existing.status.as_str()
            )));
        }

        let now = now_timestamp();
        let result = sqlx::query(
            "UPDATE bookings SET driver_id = ?, updated_at = ?, version = version + 1 WHERE id = ? AND version = ?",
        )
        .bind(driver_id)
        .bind(&now)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.concurrent_modification(id).await);
        }

        Ok(Booking {
            driver_id: driver_id.map(str::to_string),
            updated_at: now,
            version: existing.version + 1,
            ..existing
        })
    }

    /// Edit fare, flight number, notes or phone.
    pub async fn update_booking(
        &self,
        id: &str,
        request: &UpdateBookingRequest,
    ) -> Result<Booking, AppError> {
        let existing = self.require_booking(id).await?;
        check_version(request.expected_version, existing.version)?;

        let now = now_timestamp();
        let fare = request.fare.or(existing.fare);
        let flight_number = request
            .flight_number
            .clone()
            .or(existing.flight_number.clone());
        let notes = request.notes.clone().or(existing.notes.clone());
        let phone = request.phone.clone().unwrap_or(existing.phone.clone());

        let result = sqlx::query(
            "UPDATE bookings SET fare = ?, flight_number = ?, notes = ?, phone = ?, updated_at = ?, version = version + 1 WHERE id = ? AND version = ?",
        )
        .bind(fare)
        .bind(&flight_number)
        .bind(&notes)
        .bind(&phone)
        .bind(&now)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.concurrent_modification(id).await);
        }

        Ok(Booking {
            fare,
            flight_number,
            notes,
            phone,
            updated_at: now,
            version: existing.version + 1,
            ..existing
        })
    }

    /// Record payment state; fields left `None` keep their stored value.
    pub async fn update_payment(
        &self,
        id: &str,
        update: &PaymentUpdate,
    ) -> Result<Booking, AppError> {
        let existing = self.require_booking(id).await?;
        let now = now_timestamp();

        let payment_status = update.payment_status.unwrap_or(existing.payment_status);
        let payment_link_url = update
            .payment_link_url
            .clone()
            .or(existing.payment_link_url.clone());
        let payment_order_id = update
            .payment_order_id
            .clone()
            .or(existing.payment_order_id.clone());
        let payment_id = update.payment_id.clone().or(existing.payment_id.clone());

        sqlx::query(
            "UPDATE bookings SET payment_status = ?, payment_link_url = ?, payment_order_id = ?, payment_id = ?, updated_at = ?, version = version + 1 WHERE id = ?",
        )
        .bind(payment_status.as_str())
        .bind(&payment_link_url)
        .bind(&payment_order_id)
        .bind(&payment_id)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.require_booking(id).await
    }

    async fn concurrent_modification(&self, id: &str) -> AppError {
        let current_version = match self.get_booking(id).await {
            Ok(Some(booking)) => booking.version,
            _ => 0,
        };
        AppError::Conflict {
            message: "Concurrent modification detected".to_string(),
            current_version,
        }
    }
}

fn booking_from_row(row: &SqliteRow) -> Booking {
    let status: String = row.get("status");
    let payment_status: String = row.get("payment_status");
    Booking {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        pickup_location: row.get("pickup_location"),
        dropoff_location: row.get("dropoff_location"),
        pickup_date_time: row.get("pickup_date_time"),
        passengers: row.get("passengers"),
        fare: row.get("fare"),
        flight_number: row.get("flight_number"),
        notes: row.get("notes"),
        status: BookingStatus::from_str(&status).unwrap_or(BookingStatus::Pending),
        driver_id: row.get("driver_id"),
        payment_status: PaymentStatus::from_str(&payment_status).unwrap_or(PaymentStatus::Unpaid),
        payment_link_url: row.get("payment_link_url"),
        payment_order_id: row.get("payment_order_id"),
        payment_id: row.get("payment_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}
