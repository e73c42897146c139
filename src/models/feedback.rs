//! Customer feedback and reviews.

use serde::{Deserialize, Serialize};

/// A customer review; shown publicly only once approved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub rating: i64,
    pub comment: String,
    pub approved: bool,
    pub created_at: String,
}

/// Request body for submitting feedback.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackRequest {
    #[serde(default)]
    pub booking_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

impl CreateFeedbackRequest {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Name is required".to_string());
        }
        if self.comment.trim().is_empty() {
            errors.push("Comment is required".to_string());
        }
        if !(1..=5).contains(&self.rating) {
            errors.push("Rating must be between 1 and 5".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Admin moderation toggle.
#[derive(Debug, Clone, Deserialize)]
pub struct ApproveFeedbackRequest {
    pub approved: bool,
}

/// A review as shown on the public site, without contact details.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicReview {
    pub id: String,
    pub name: String,
    pub rating: i64,
    pub comment: String,
    pub created_at: String,
}

impl From<Feedback> for PublicReview {
    fn from(feedback: Feedback) -> Self {
        Self {
            id: feedback.id,
            name: feedback.name,
            rating: feedback.rating,
            comment: feedback.comment,
            created_at: feedback.created_at,
        }
    }
}

/// Public rating summary over approved reviews.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSummary {
    pub count: usize,
    /// `None` when there are no reviews yet
    pub average_rating: Option<f64>,
}

impl FeedbackSummary {
    pub fn from_feedback(items: &[Feedback]) -> Self {
        let count = items.len();
        let average_rating = (count > 0)
            .then(|| items.iter().map(|f| f.rating as f64).sum::<f64>() / count as f64);
        Self {
            count,
            average_rating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: i64) -> Feedback {
        Feedback {
            id: rating.to_string(),
            booking_id: None,
            name: "Rider".to_string(),
            email: None,
            rating,
            comment: "Great".to_string(),
            approved: true,
            created_at: "2026-10-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_summary_average() {
        let summary = FeedbackSummary::from_feedback(&[review(5), review(4), review(3)]);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average_rating, Some(4.0));
        assert_eq!(FeedbackSummary::from_feedback(&[]).average_rating, None);
    }

    #[test]
    fn test_public_review_drops_contact_details() {
        let mut feedback = review(5);
        feedback.email = Some("rider@example.com".to_string());
        feedback.booking_id = Some("b1".to_string());

        let json = serde_json::to_value(PublicReview::from(feedback)).unwrap();
        assert!(json.get("email").is_none());
        assert!(json.get("bookingId").is_none());
        assert_eq!(json["rating"], 5);
    }

    #[test]
    fn test_rating_bounds() {
        let request = CreateFeedbackRequest {
            booking_id: None,
            name: "Rider".to_string(),
            email: None,
            rating: 6,
            comment: "ok".to_string(),
        };
        assert_eq!(
            request.validate().unwrap_err(),
            vec!["Rating must be between 1 and 5"]
        );
    }
}
