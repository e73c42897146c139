//! Comment persistence.

use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};

use super::{now_timestamp, Repository};
use crate::errors::AppError;
use crate::models::{
    CommentQuery, CommentRecord, CommentStatus, CreateCommentRequest, UpdateCommentRequest,
};

impl Repository {
    /// List comments, newest first, filtered by page and/or status.
    pub async fn list_comments(&self, query: &CommentQuery) -> Result<Vec<CommentRecord>, AppError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, page_url, element_selector, element_text, comment, status, created_by, created_at, updated_at, resolved_at FROM comments WHERE 1 = 1",
        );
        if let Some(page_url) = &query.page_url {
            builder.push(" AND page_url = ").push_bind(page_url);
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        builder.push(" ORDER BY created_at DESC, id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(comment_from_row).collect())
    }

    /// Get a comment by ID.
    pub async fn get_comment(&self, id: &str) -> Result<Option<CommentRecord>, AppError> {
        let row = sqlx::query(
            "SELECT id, page_url, element_selector, element_text, comment, status, created_by, created_at, updated_at, resolved_at FROM comments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(comment_from_row))
    }

    /// Create a new open comment.
    pub async fn create_comment(
        &self,
        request: &CreateCommentRequest,
    ) -> Result<CommentRecord, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query(
            "INSERT INTO comments (id, page_url, element_selector, element_text, comment, status, created_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.page_url)
        .bind(&request.element_selector)
        .bind(&request.element_text)
        .bind(&request.comment)
        .bind(CommentStatus::Open.as_str())
        .bind(&request.created_by)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(CommentRecord {
            id,
            page_url: request.page_url.clone(),
            element_selector: request.element_selector.clone(),
            element_text: request.element_text.clone(),
            comment: request.comment.clone(),
            status: CommentStatus::Open,
            created_by: request.created_by.clone(),
            created_at: now.clone(),
            updated_at: now,
            resolved_at: None,
        })
    }

    /// Edit the text and/or move the status along the transition table.
    pub async fn update_comment(
        &self,
        id: &str,
        request: &UpdateCommentRequest,
    ) -> Result<CommentRecord, AppError> {
        let existing = self
            .get_comment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", id)))?;

        let now = now_timestamp();
        let status = match request.status {
            Some(next) if next != existing.status => {
                if !existing.status.can_transition_to(next) {
                    return Err(AppError::InvalidTransition {
                        from: existing.status.as_str().to_string(),
                        to: next.as_str().to_string(),
                    });
                }
                next
            }
            _ => existing.status,
        };
        let resolved_at = match status {
            CommentStatus::Resolved if existing.status != CommentStatus::Resolved => {
                Some(now.clone())
            }
            CommentStatus::Resolved => existing.resolved_at.clone(),
            _ => None,
        };
        let comment = request.comment.clone().unwrap_or(existing.comment.clone());

        sqlx::query(
            "UPDATE comments SET comment = ?, status = ?, updated_at = ?, resolved_at = ? WHERE id = ?",
        )
        .bind(&comment)
        .bind(status.as_str())
        .bind(&now)
        .bind(&resolved_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(CommentRecord {
            comment,
            status,
            updated_at: now,
            resolved_at,
            ..existing
        })
    }

    /// Delete a comment.
    pub async fn delete_comment(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Comment {} not found", id)));
        }
        Ok(())
    }
}

fn comment_from_row(row: &SqliteRow) -> CommentRecord {
    let status: String = row.get("status");
    CommentRecord {
        id: row.get("id"),
        page_url: row.get("page_url"),
        element_selector: row.get("element_selector"),
        element_text: row.get("element_text"),
        comment: row.get("comment"),
        status: CommentStatus::from_str(&status).unwrap_or(CommentStatus::Open),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        resolved_at: row.get("resolved_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_repository;

    fn request(page_url: &str) -> CreateCommentRequest {
        CreateCommentRequest {
            page_url: page_url.to_string(),
            element_selector: "#hero h1".to_string(),
            element_text: Some("Reliable Airport Rides".to_string()),
            comment: "Typo in heading".to_string(),
            created_by: "qa@example.com".to_string(),
        }
    }

    fn status_change(status: CommentStatus) -> UpdateCommentRequest {
        UpdateCommentRequest {
            comment: None,
            status: Some(status),
        }
    }

    #[tokio::test]
    async fn test_resolve_and_reopen() {
        let (repo, _dir) = test_repository().await;
        let comment = repo.create_comment(&request("/")).await.unwrap();

        let resolved = repo
            .update_comment(&comment.id, &status_change(CommentStatus::Resolved))
            .await
            .unwrap();
        assert_eq!(resolved.status, CommentStatus::Resolved);
        assert!(resolved.resolved_at.is_some());

        let err = repo
            .update_comment(&comment.id, &status_change(CommentStatus::InProgress))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        let reopened = repo
            .update_comment(&comment.id, &status_change(CommentStatus::Open))
            .await
            .unwrap();
        assert!(reopened.resolved_at.is_none());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (repo, _dir) = test_repository().await;
        let home = repo.create_comment(&request("/")).await.unwrap();
        repo.create_comment(&request("/about")).await.unwrap();
        repo.update_comment(&home.id, &status_change(CommentStatus::InProgress))
            .await
            .unwrap();

        let by_page = repo
            .list_comments(&CommentQuery {
                page_url: Some("/about".to_string()),
                status: None,
            })
            .await
            .unwrap();
        assert_eq!(by_page.len(), 1);

        let by_status = repo
            .list_comments(&CommentQuery {
                page_url: None,
                status: Some(CommentStatus::InProgress),
            })
            .await
            .unwrap();
        assert_eq!(by_status.len(), 1);
        assert_eq!(by_status[0].id, home.id);

        repo.delete_comment(&home.id).await.unwrap();
        assert_eq!(repo.list_comments(&CommentQuery::default()).await.unwrap().len(), 1);
    }
}
