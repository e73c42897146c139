//! Users and persisted sessions.

use std::time::Duration;

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use super::{now_timestamp, Repository};
use crate::errors::AppError;
use crate::models::{format_timestamp, CreateUserRequest, Role, Session, User};

impl Repository {
    /// List all users.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query(
            "SELECT id, email, display_name, role, created_at FROM users ORDER BY email",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row =
            sqlx::query("SELECT id, email, display_name, role, created_at FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Create a user; emails are unique, case-insensitively.
    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<User, AppError> {
        let email = request.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AppError::validation("Email is required"));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();
        let display_name = request
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&email)
            .to_string();

        sqlx::query(
            "INSERT INTO users (id, email, display_name, role, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&email)
        .bind(&display_name)
        .bind(request.role.as_str())
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            // The UNIQUE index decides, so concurrent creates cannot both succeed.
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::validation(format!("A user with email {} already exists", email))
            }
            other => AppError::from(other),
        })?;

        Ok(User {
            id,
            email,
            display_name,
            role: request.role,
            created_at: now,
        })
    }

    /// Change a user's role. Existing sessions pick the new role up on their next check.
    pub async fn update_user_role(&self, id: &str, role: Role) -> Result<User, AppError> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        self.get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    /// Issue a session token for a user.
    pub async fn create_session(&self, user_id: &str, ttl: Duration) -> Result<Session, AppError> {
        let user = self
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let token = uuid::Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AppError::Config(format!("Session TTL out of range: {}", e)))?;
        let expires_at = format_timestamp(now + ttl);
        let created_at = format_timestamp(now);

        sqlx::query(
            "INSERT INTO sessions (token, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&token)
        .bind(&user.id)
        .bind(&expires_at)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        Ok(Session {
            token,
            user_id: user.id,
            email: user.email,
            role: user.role,
            expires_at,
            created_at,
        })
    }

    /// Look up an unexpired session, joined with the user's current role.
    pub async fn get_active_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        let row = sqlx::query(
            r#"SELECT s.token, s.user_id, u.email, u.role, s.expires_at, s.created_at
               FROM sessions s JOIN users u ON u.id = s.user_id
               WHERE s.token = ? AND s.expires_at > ?"#,
        )
        .bind(token)
        .bind(now_timestamp())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(|row| {
            let role: String = row.get("role");
            Session {
                token: row.get("token"),
                user_id: row.get("user_id"),
                email: row.get("email"),
                role: Role::from_str(&role).unwrap_or(Role::Customer),
                expires_at: row.get("expires_at"),
                created_at: row.get("created_at"),
            }
        }))
    }

    /// Revoke a session. Returns whether it existed.
    pub async fn delete_session(&self, token: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every expired session; returns how many were removed.
    pub async fn purge_expired_sessions(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now_timestamp())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn user_from_row(row: &SqliteRow) -> User {
    let role: String = row.get("role");
    User {
        id: row.get("id"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        role: Role::from_str(&role).unwrap_or(Role::Customer),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_repository;

    fn user_request(email: &str, role: Role) -> CreateUserRequest {
        CreateUserRequest {
            email: email.to_string(),
            display_name: None,
            role,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (repo, _dir) = test_repository().await;
        repo.create_user(&user_request("Ops@Example.com", Role::Admin))
            .await
            .unwrap();
        let err = repo
            .create_user(&user_request("ops@example.com", Role::Viewer))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_creates() {
        let (repo, _dir) = test_repository().await;
        let first = user_request("dispatch@example.com", Role::Admin);
        let second = user_request("dispatch@example.com", Role::Editor);

        let (a, b) = tokio::join!(repo.create_user(&first), repo.create_user(&second));

        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::Validation(_)))));
    }

    #[tokio::test]
    async fn test_session_lifecycle_follows_role_changes() {
        let (repo, _dir) = test_repository().await;
        let user = repo
            .create_user(&user_request("editor@example.com", Role::Editor))
            .await
            .unwrap();

        let session = repo
            .create_session(&user.id, Duration::from_secs(3600))
            .await
            .unwrap();
        let active = repo.get_active_session(&session.token).await.unwrap().unwrap();
        assert_eq!(active.role, Role::Editor);

        repo.update_user_role(&user.id, Role::Viewer).await.unwrap();
        let active = repo.get_active_session(&session.token).await.unwrap().unwrap();
        assert_eq!(active.role, Role::Viewer);

        assert!(repo.delete_session(&session.token).await.unwrap());
        assert!(repo.get_active_session(&session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_inactive_and_purged() {
        let (repo, _dir) = test_repository().await;
        let user = repo
            .create_user(&user_request("viewer@example.com", Role::Viewer))
            .await
            .unwrap();

        let session = repo.create_session(&user.id, Duration::ZERO).await.unwrap();
        assert!(repo.get_active_session(&session.token).await.unwrap().is_none());
        assert_eq!(repo.purge_expired_sessions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_session_for_unknown_user() {
        let (repo, _dir) = test_repository().await;
        let err = repo
            .create_session("nobody", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
