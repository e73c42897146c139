//! CMS configuration document and dotted-path field resolution.
//!
//! The configuration is a free-form JSON tree; nothing here enforces a schema.
//! Pages read individual fields with [`get_cms_field`] and fall back to a literal default.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// The single stored CMS document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmsConfiguration {
    pub data: Value,
    pub version: i64,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

/// Request body replacing the whole document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceCmsRequest {
    pub data: Value,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Request body editing one field.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCmsFieldRequest {
    pub path: String,
    pub value: Value,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Query of `GET /api/cms/field`.
#[derive(Debug, Clone, Deserialize)]
pub struct CmsFieldQuery {
    pub path: String,
    #[serde(default)]
    pub default: Option<String>,
}

/// Resolved field returned to the page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CmsFieldValue {
    pub path: String,
    pub value: Value,
    /// True when `value` is the caller's default rather than stored content
    pub is_default: bool,
}

/// Look up `path` (dot separated) in `data`.
///
/// Numeric segments index into arrays. A stored `null` is treated as absent.
pub fn lookup_cms_field<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    (!current.is_null()).then_some(current)
}

/// Resolve `path` in `data`, falling back to `default` when the field is absent.
pub fn get_cms_field(data: &Value, path: &str, default: impl Into<Value>) -> Value {
    lookup_cms_field(data, path)
        .cloned()
        .unwrap_or_else(|| default.into())
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// Fails when the path is empty or passes through a scalar, or when an array
/// index is out of bounds.
pub fn set_cms_field(data: &mut Value, path: &str, value: Value) -> Result<(), String> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(format!("Invalid CMS path: '{}'", path));
    }
    let Some((last, parents)) = segments.split_last() else {
        return Err(format!("Invalid CMS path: '{}'", path));
    };

    if data.is_null() {
        *data = Value::Object(Map::new());
    }

    let mut current = data;
    for segment in parents {
        current = match current {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => {
                let index = array_index(segment, items.len(), path)?;
                &mut items[index]
            }
            _ => return Err(format!("CMS path '{}' traverses a non-object value", path)),
        };
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
    }

    match current {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let index = array_index(last, items.len(), path)?;
            items[index] = value;
            Ok(())
        }
        _ => Err(format!("CMS path '{}' traverses a non-object value", path)),
    }
}

fn array_index(segment: &str, len: usize, path: &str) -> Result<usize, String> {
    segment
        .parse::<usize>()
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| format!("CMS path '{}' has an invalid array index '{}'", path, segment))
}

/// Content seeded into an empty database.
pub fn default_configuration() -> Value {
    json!({
        "pages": {
            "home": {
                "hero": {
                    "title": "Reliable Airport Rides",
                    "subtitle": "Door-to-terminal car service, booked in a minute."
                },
                "cta": "Book Your Ride"
            },
            "about": {
                "title": "About Us",
                "body": "Local drivers, clean cars, on-time pickups."
            },
            "success": {
                "title": "Booking Received",
                "message": "We will text you when your ride is confirmed."
            }
        },
        "bookingForm": {
            "title": "Book a Ride",
            "submitLabel": "Request Booking",
            "maxPassengers": 10,
            "labels": {
                "name": "Full name",
                "email": "Email",
                "phone": "Phone",
                "pickupLocation": "Pickup address",
                "dropoffLocation": "Drop-off address",
                "pickupDateTime": "Pickup date and time",
                "passengers": "Passengers"
            }
        },
        "business": {
            "name": "Airport Car Service",
            "phone": "",
            "email": "",
            "hours": "24/7"
        },
        "pricing": {
            "currency": "USD",
            "baseFare": 45.0,
            "perMile": 2.5,
            "minimumFare": 45.0
        },
        "themeColors": {
            "primary": "#1f3a5f",
            "secondary": "#f2a541",
            "background": "#ffffff",
            "text": "#1a1a1a"
        },
        "communication": {
            "smsEnabled": true,
            "emailEnabled": false
        },
        "analytics": {
            "enabled": false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_lookup_returns_value() {
        let data = json!({ "a": { "b": { "c": "deep" } } });
        assert_eq!(get_cms_field(&data, "a.b.c", "default"), json!("deep"));
    }

    #[test]
    fn test_missing_path_returns_default() {
        let data = json!({ "a": { "b": {} } });
        assert_eq!(get_cms_field(&data, "a.b.c", "default"), json!("default"));
        assert_eq!(get_cms_field(&data, "x", "default"), json!("default"));
        assert_eq!(get_cms_field(&json!(null), "a", "default"), json!("default"));
    }

    #[test]
    fn test_arbitrary_depth() {
        let mut data = json!("leaf");
        let mut path = Vec::new();
        for depth in (0..32).rev() {
            let key = format!("k{}", depth);
            let mut level = Map::new();
            level.insert(key.clone(), data);
            data = Value::Object(level);
            path.insert(0, key);
        }
        assert_eq!(get_cms_field(&data, &path.join("."), "none"), json!("leaf"));
    }

    #[test]
    fn test_null_and_scalar_traversal_fall_back() {
        let data = json!({ "a": null, "b": "text" });
        assert_eq!(get_cms_field(&data, "a", "d"), json!("d"));
        assert_eq!(get_cms_field(&data, "b.c", "d"), json!("d"));
    }

    #[test]
    fn test_array_index_segments() {
        let data = json!({ "faq": [{ "q": "First?" }, { "q": "Second?" }] });
        assert_eq!(get_cms_field(&data, "faq.1.q", ""), json!("Second?"));
        assert_eq!(get_cms_field(&data, "faq.2.q", "none"), json!("none"));
        assert_eq!(get_cms_field(&data, "faq.x.q", "none"), json!("none"));
    }

    #[test]
    fn test_non_string_values_are_returned_as_is() {
        let data = default_configuration();
        assert_eq!(get_cms_field(&data, "bookingForm.maxPassengers", 0), json!(10));
        assert_eq!(
            get_cms_field(&data, "communication.smsEnabled", false),
            json!(true)
        );
    }

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut data = json!({});
        set_cms_field(&mut data, "pages.contact.title", json!("Contact")).unwrap();
        assert_eq!(get_cms_field(&data, "pages.contact.title", ""), json!("Contact"));
    }

    #[test]
    fn test_set_overwrites_array_element() {
        let mut data = json!({ "faq": ["a", "b"] });
        set_cms_field(&mut data, "faq.1", json!("c")).unwrap();
        assert_eq!(data, json!({ "faq": ["a", "c"] }));
        assert!(set_cms_field(&mut data, "faq.5", json!("d")).is_err());
    }

    #[test]
    fn test_set_rejects_scalar_traversal_and_empty_segments() {
        let mut data = json!({ "title": "text" });
        assert!(set_cms_field(&mut data, "title.sub", json!(1)).is_err());
        assert!(set_cms_field(&mut data, "", json!(1)).is_err());
        assert!(set_cms_field(&mut data, "a..b", json!(1)).is_err());
        assert_eq!(data, json!({ "title": "text" }));
    }
}
