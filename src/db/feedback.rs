//! Feedback persistence.

use sqlx::{sqlite::SqliteRow, Row};

use super::{now_timestamp, Repository};
use crate::errors::AppError;
use crate::models::{CreateFeedbackRequest, Feedback};

impl Repository {
    /// List feedback, newest first; `approved_only` hides unmoderated entries.
    pub async fn list_feedback(&self, approved_only: bool) -> Result<Vec<Feedback>, AppError> {
        let sql = if approved_only {
            "SELECT id, booking_id, name, email, rating, comment, approved, created_at FROM feedback WHERE approved = 1 ORDER BY created_at DESC, id"
        } else {
            "SELECT id, booking_id, name, email, rating, comment, approved, created_at FROM feedback ORDER BY created_at DESC, id"
        };
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(feedback_from_row).collect())
    }

    /// Store submitted feedback, unapproved.
    pub async fn create_feedback(
        &self,
        request: &CreateFeedbackRequest,
    ) -> Result<Feedback, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();
        let name = request.name.trim().to_string();
        let comment = request.comment.trim().to_string();

        sqlx::query(
            "INSERT INTO feedback (id, booking_id, name, email, rating, comment, approved, created_at) VALUES (?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(&request.booking_id)
        .bind(&name)
        .bind(&request.email)
        .bind(request.rating)
        .bind(&comment)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Feedback {
            id,
            booking_id: request.booking_id.clone(),
            name,
            email: request.email.clone(),
            rating: request.rating,
            comment,
            approved: false,
            created_at: now,
        })
    }

    /// Approve or hide a review.
    pub async fn set_feedback_approval(&self, id: &str, approved: bool) -> Result<Feedback, AppError> {
        let result = sqlx::query("UPDATE feedback SET approved = ? WHERE id = ?")
            .bind(approved as i32)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Feedback {} not found", id)));
        }

        let row = sqlx::query(
            "SELECT id, booking_id, name, email, rating, comment, approved, created_at FROM feedback WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(feedback_from_row(&row))
    }

    /// Delete a review.
    pub async fn delete_feedback(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM feedback WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Feedback {} not found", id)));
        }
        Ok(())
    }
}

fn feedback_from_row(row: &SqliteRow) -> Feedback {
    let approved: i32 = row.get("approved");
    Feedback {
        id: row.get("id"),
        booking_id: row.get("booking_id"),
        name: row.get("name"),
        email: row.get("email"),
        rating: row.get("rating"),
        comment: row.get("comment"),
        approved: approved != 0,
        created_at: row.get("created_at"),
    }
}
