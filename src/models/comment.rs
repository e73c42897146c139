//! QA annotation comments left on site elements by the admin team.

use serde::{Deserialize, Serialize};

/// Review status of a comment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CommentStatus {
    Open,
    InProgress,
    Resolved,
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::Open => "open",
            CommentStatus::InProgress => "in-progress",
            CommentStatus::Resolved => "resolved",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(CommentStatus::Open),
            "in-progress" => Some(CommentStatus::InProgress),
            "resolved" => Some(CommentStatus::Resolved),
            _ => None,
        }
    }

    /// Resolved comments can only be reopened.
    pub fn can_transition_to(&self, next: CommentStatus) -> bool {
        use CommentStatus::*;
        matches!(
            (self, next),
            (Open, InProgress)
                | (Open, Resolved)
                | (InProgress, Open)
                | (InProgress, Resolved)
                | (Resolved, Open)
        )
    }
}

/// A comment anchored to an element on a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub id: String,
    pub page_url: String,
    pub element_selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_text: Option<String>,
    pub comment: String,
    pub status: CommentStatus,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,
}

/// Request body for creating a comment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub page_url: String,
    pub element_selector: String,
    #[serde(default)]
    pub element_text: Option<String>,
    pub comment: String,
    #[serde(default)]
    pub created_by: String,
}

/// Request body for editing a comment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommentRequest {
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub status: Option<CommentStatus>,
}

/// List filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentQuery {
    #[serde(default)]
    pub page_url: Option<String>,
    #[serde(default)]
    pub status: Option<CommentStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_transitions() {
        use CommentStatus::*;
        assert!(Open.can_transition_to(InProgress));
        assert!(Open.can_transition_to(Resolved));
        assert!(InProgress.can_transition_to(Resolved));
        assert!(Resolved.can_transition_to(Open));
        assert!(!Resolved.can_transition_to(InProgress));
        assert!(!Open.can_transition_to(Open));
    }

    #[test]
    fn test_query_status_deserializes_kebab_case() {
        let query: CommentQuery = serde_json::from_str(r#"{"status":"in-progress"}"#).unwrap();
        assert_eq!(query.status, Some(CommentStatus::InProgress));
        assert!(query.page_url.is_none());
    }
}
