//! Cost record persistence.

use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};

use super::{now_timestamp, Repository};
use crate::errors::AppError;
use crate::models::{format_timestamp, parse_pickup_time, CostRange, CostRecord, CreateCostRequest};

impl Repository {
    /// List costs in an inclusive `incurred_at` range, oldest first.
    pub async fn list_costs(&self, range: &CostRange) -> Result<Vec<CostRecord>, AppError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, category, provider, amount, description, booking_id, incurred_at, created_at FROM costs WHERE 1 = 1",
        );
        if let Some(from) = &range.from {
            builder
                .push(" AND incurred_at >= ")
                .push_bind(normalize_time(from, "from")?);
        }
        if let Some(to) = &range.to {
            builder
                .push(" AND incurred_at <= ")
                .push_bind(normalize_time(to, "to")?);
        }
        builder.push(" ORDER BY incurred_at, id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(cost_from_row).collect())
    }

    /// Record a cost.
    pub async fn create_cost(&self, request: &CreateCostRequest) -> Result<CostRecord, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();
        let incurred_at = match &request.incurred_at {
            Some(raw) => normalize_time(raw, "incurredAt")?,
            None => now.clone(),
        };

        sqlx::query(
            "INSERT INTO costs (id, category, provider, amount, description, booking_id, incurred_at, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.category)
        .bind(&request.provider)
        .bind(request.amount)
        .bind(&request.description)
        .bind(&request.booking_id)
        .bind(&incurred_at)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(CostRecord {
            id,
            category: request.category.clone(),
            provider: request.provider.clone(),
            amount: request.amount,
            description: request.description.clone(),
            booking_id: request.booking_id.clone(),
            incurred_at,
            created_at: now,
        })
    }

    /// Delete a cost record.
    pub async fn delete_cost(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM costs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Cost {} not found", id)));
        }
        Ok(())
    }
}

/// Stored times share one canonical format, so range filters compare as strings.
fn normalize_time(raw: &str, field: &str) -> Result<String, AppError> {
    parse_pickup_time(raw.trim())
        .map(format_timestamp)
        .ok_or_else(|| AppError::validation(format!("{} is not a valid timestamp", field)))
}

fn cost_from_row(row: &SqliteRow) -> CostRecord {
    CostRecord {
        id: row.get("id"),
        category: row.get("category"),
        provider: row.get("provider"),
        amount: row.get("amount"),
        description: row.get("description"),
        booking_id: row.get("booking_id"),
        incurred_at: row.get("incurred_at"),
        created_at: row.get("created_at"),
    }
}
