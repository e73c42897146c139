//! Operating cost records and their aggregation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single cost entry (fuel, tolls, provider fees, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostRecord {
    pub id: String,
    pub category: String,
    pub provider: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    pub incurred_at: String,
    pub created_at: String,
}

/// Request body for recording a cost.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCostRequest {
    pub category: String,
    pub provider: String,
    pub amount: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub booking_id: Option<String>,
    /// Defaults to the time of recording
    #[serde(default)]
    pub incurred_at: Option<String>,
}

/// Inclusive `incurredAt` range for listing and summaries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CostRange {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

/// Totals over a set of cost records.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CostSummary {
    pub total: f64,
    pub count: usize,
    pub by_category: BTreeMap<String, f64>,
    pub by_provider: BTreeMap<String, f64>,
}

/// Sum records into overall, per-category and per-provider totals.
pub fn aggregate_costs(records: &[CostRecord]) -> CostSummary {
    records
        .iter()
        .fold(CostSummary::default(), |mut summary, record| {
            summary.total += record.amount;
            summary.count += 1;
            *summary
                .by_category
                .entry(record.category.clone())
                .or_insert(0.0) += record.amount;
            *summary
                .by_provider
                .entry(record.provider.clone())
                .or_insert(0.0) += record.amount;
            summary
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cost(category: &str, provider: &str, amount: f64) -> CostRecord {
        CostRecord {
            id: format!("{}-{}-{}", category, provider, amount),
            category: category.to_string(),
            provider: provider.to_string(),
            amount,
            description: None,
            booking_id: None,
            incurred_at: "2026-10-01T00:00:00Z".to_string(),
            created_at: "2026-10-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_aggregate_groups_by_category_and_provider() {
        let records = vec![
            cost("fuel", "shell", 40.0),
            cost("fuel", "chevron", 35.5),
            cost("sms", "twilio", 0.5),
            cost("payments", "square", 3.25),
            cost("sms", "twilio", 0.75),
        ];

        let summary = aggregate_costs(&records);

        assert_eq!(summary.count, 5);
        assert!((summary.total - 80.0).abs() < 1e-9);
        assert!((summary.by_category["fuel"] - 75.5).abs() < 1e-9);
        assert!((summary.by_category["sms"] - 1.25).abs() < 1e-9);
        assert!((summary.by_provider["twilio"] - 1.25).abs() < 1e-9);
        assert_eq!(summary.by_provider.len(), 4);
    }

    #[test]
    fn test_aggregate_empty() {
        let summary = aggregate_costs(&[]);
        assert_eq!(summary, CostSummary::default());
    }
}
