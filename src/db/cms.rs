//! CMS document persistence.

use serde_json::Value;
use sqlx::Row;

use super::{check_version, now_timestamp, Repository};
use crate::errors::AppError;
use crate::models::{set_cms_field, CmsConfiguration};

impl Repository {
    /// Get the CMS document.
    pub async fn get_cms(&self) -> Result<CmsConfiguration, AppError> {
        let row =
            sqlx::query("SELECT data, version, updated_at, updated_by FROM cms_config WHERE id = 1")
                .fetch_one(&self.pool)
                .await?;

        let data: String = row.get("data");
        Ok(CmsConfiguration {
            data: serde_json::from_str(&data)?,
            version: row.get("version"),
            updated_at: row.get("updated_at"),
            updated_by: row.get("updated_by"),
        })
    }

    /// Replace the whole document.
    pub async fn replace_cms(
        &self,
        data: &Value,
        updated_by: Option<&str>,
        expected_version: Option<i64>,
    ) -> Result<CmsConfiguration, AppError> {
        if !data.is_object() {
            return Err(AppError::validation("CMS configuration must be a JSON object"));
        }

        let existing = self.get_cms().await?;
        check_version(expected_version, existing.version)?;
        self.write_cms(data, updated_by, existing.version).await
    }

    /// Set a single field, leaving the rest of the document untouched.
    pub async fn update_cms_field(
        &self,
        path: &str,
        value: Value,
        updated_by: Option<&str>,
        expected_version: Option<i64>,
    ) -> Result<CmsConfiguration, AppError> {
        let existing = self.get_cms().await?;
        check_version(expected_version, existing.version)?;

        let mut data = existing.data;
        set_cms_field(&mut data, path, value).map_err(AppError::validation)?;
        self.write_cms(&data, updated_by, existing.version).await
    }

    async fn write_cms(
        &self,
        data: &Value,
        updated_by: Option<&str>,
        current_version: i64,
    ) -> Result<CmsConfiguration, AppError> {
        let now = now_timestamp();
        let result = sqlx::query(
            "UPDATE cms_config SET data = ?, version = version + 1, updated_at = ?, updated_by = ? WHERE id = 1 AND version = ?",
        )
        .bind(data.to_string())
        .bind(&now)
        .bind(updated_by)
        .bind(current_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_cms().await?;
            return Err(AppError::Conflict {
                message: "Concurrent modification detected".to_string(),
                current_version: current.version,
            });
        }

        Ok(CmsConfiguration {
            data: data.clone(),
            version: current_version + 1,
            updated_at: now,
            updated_by: updated_by.map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::db::test_repository;
    use crate::errors::AppError;
    use crate::models::get_cms_field;

    #[tokio::test]
    async fn test_default_document_is_seeded() {
        let (repo, _dir) = test_repository().await;
        let cms = repo.get_cms().await.unwrap();

        assert_eq!(cms.version, 1);
        assert_eq!(
            get_cms_field(&cms.data, "bookingForm.title", ""),
            json!("Book a Ride")
        );
    }

    #[tokio::test]
    async fn test_field_update_bumps_version_and_keeps_siblings() {
        let (repo, _dir) = test_repository().await;

        let updated = repo
            .update_cms_field("pages.home.hero.title", json!("Fly Easy"), Some("editor-1"), Some(1))
            .await
            .unwrap();

        assert_eq!(updated.version, 2);
        assert_eq!(updated.updated_by.as_deref(), Some("editor-1"));
        let stored = repo.get_cms().await.unwrap();
        assert_eq!(get_cms_field(&stored.data, "pages.home.hero.title", ""), json!("Fly Easy"));
        assert_eq!(get_cms_field(&stored.data, "pages.home.cta", ""), json!("Book Your Ride"));
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let (repo, _dir) = test_repository().await;
        repo.replace_cms(&json!({ "pages": {} }), None, None)
            .await
            .unwrap();

        let err = repo
            .replace_cms(&json!({ "pages": {} }), None, Some(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { current_version: 2, .. }));
    }

    #[tokio::test]
    async fn test_non_object_document_rejected() {
        let (repo, _dir) = test_repository().await;
        let err = repo.replace_cms(&json!([1, 2]), None, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
