//! Driver position reports.

use serde::{Deserialize, Serialize};

/// Last known position of a driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriverLocation {
    pub driver_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    pub updated_at: String,
}

/// Position report sent by the driver app.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLocationRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
}

impl UpdateLocationRequest {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if !(-90.0..=90.0).contains(&self.latitude) {
            errors.push("Latitude must be between -90 and 90".to_string());
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            errors.push("Longitude must be between -180 and 180".to_string());
        }
        if let Some(heading) = self.heading {
            if !(0.0..360.0).contains(&heading) {
                errors.push("Heading must be in [0, 360)".to_string());
            }
        }
        if self.speed.is_some_and(|s| s < 0.0 || !s.is_finite()) {
            errors.push("Speed must be non-negative".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
