//! Browsing telemetry records
//!
//! Telemetry arrives in two shapes: as a row of a labeled training dataset,
//! where `mouseMovements` is already a numeric aggregate, and as a JSON
//! request body, where `mouseMovements` is the raw list of mouse events.
//! Both are normalised into [`Telemetry`] before feature extraction so the
//! two paths share one encoder.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Canonical telemetry record consumed by the feature extractor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Telemetry {
    /// Mouse movement value (dataset aggregate, or average event timestamp)
    pub mouse_movement: f64,
    pub screen_width: f64,
    pub screen_height: f64,
    pub clicks: f64,
    /// Time spent on the page, in seconds
    pub time_on_page: f64,
    pub key_presses: f64,
    pub language: String,
    pub browser_name: String,
    pub user_agent: String,
    pub referrer: String,
}

/// One row of a telemetry CSV, kept as raw text until cleaned.
///
/// The same layout is used for training datasets and for the collector's
/// capture file (where `label` is left empty).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRow {
    #[serde(rename = "mouseMovements")]
    pub mouse_movements: String,
    #[serde(rename = "screenWidth")]
    pub screen_width: String,
    #[serde(rename = "screenHeight")]
    pub screen_height: String,
    pub clicks: String,
    #[serde(rename = "timeOnPage")]
    pub time_on_page: String,
    #[serde(rename = "keyPresses")]
    pub key_presses: String,
    pub language: String,
    #[serde(rename = "browserName")]
    pub browser_name: String,
    #[serde(rename = "userAgent")]
    pub user_agent: String,
    pub referrer: String,
    #[serde(default)]
    pub label: String,
}

/// Column names every telemetry CSV must carry.
pub const TELEMETRY_COLUMNS: [&str; 11] = [
    "mouseMovements",
    "screenWidth",
    "screenHeight",
    "clicks",
    "timeOnPage",
    "keyPresses",
    "language",
    "browserName",
    "userAgent",
    "referrer",
    "label",
];

/// Client-facing input errors raised while reading a prediction request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    /// The body is not valid JSON
    #[error("invalid JSON body: {0}")]
    MalformedJson(String),

    /// `mouseMovements` is missing, not a list, or holds unusable events
    #[error("{0}")]
    InvalidInput(String),

    /// `mouseMovements` is an empty list
    #[error("The list 'mouseMovements' is empty")]
    EmptyInput,

    /// The body is valid JSON but not an object
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// A field is present with the wrong JSON type
    #[error("'{field}' must be {expected}, got {found}")]
    FieldType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl InputError {
    /// Whether the error concerns a value (as opposed to a JSON type).
    pub fn is_value_error(&self) -> bool {
        matches!(
            self,
            InputError::MalformedJson(_) | InputError::InvalidInput(_) | InputError::EmptyInput
        )
    }
}

const NOT_A_LIST: &str = "Expected 'mouseMovements' to be a list";
const NOT_INTEGERS: &str = "All elements in 'mouseMovements' should be convertible to integers";

/// A validated prediction request.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRequest {
    /// Timestamps of the mouse events, in arrival order (never empty)
    pub mouse_timestamps: Vec<i64>,
    pub screen_width: f64,
    pub screen_height: f64,
    pub clicks: f64,
    pub time_on_page: f64,
    pub key_presses: f64,
    pub language: String,
    pub browser_name: String,
    pub user_agent: String,
    pub referrer: String,
}

impl TelemetryRequest {
    /// Parse and validate a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, InputError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| InputError::MalformedJson(e.to_string()))?;
        Self::from_json(&value)
    }

    /// Validate an already-parsed JSON value.
    ///
    /// Optional fields default to `0` or the empty string when absent or
    /// `null`. `mouseMovements` is mandatory and must be a non-empty list of
    /// events whose `timestamp` converts to an integer.
    pub fn from_json(value: &Value) -> Result<Self, InputError> {
        let obj = value
            .as_object()
            .ok_or_else(|| InputError::NotAnObject(json_type_name(value)))?;

        let events = match obj.get("mouseMovements") {
            Some(Value::Array(events)) => events,
            _ => return Err(InputError::InvalidInput(NOT_A_LIST.to_string())),
        };

        let mouse_timestamps = events
            .iter()
            .map(event_timestamp)
            .collect::<Result<Vec<i64>, InputError>>()?;

        if mouse_timestamps.is_empty() {
            return Err(InputError::EmptyInput);
        }

        Ok(Self {
            mouse_timestamps,
            screen_width: number_field(obj, "screenWidth")?,
            screen_height: number_field(obj, "screenHeight")?,
            clicks: number_field(obj, "clicks")?,
            time_on_page: number_field(obj, "timeOnPage")?,
            key_presses: number_field(obj, "keyPresses")?,
            language: text_field(obj, "language")?,
            browser_name: text_field(obj, "browserName")?,
            user_agent: text_field(obj, "userAgent")?,
            referrer: text_field(obj, "referrer")?,
        })
    }

    /// Average of the mouse event timestamps.
    pub fn average_mouse_movement(&self) -> f64 {
        let sum: f64 = self.mouse_timestamps.iter().map(|&t| t as f64).sum();
        sum / self.mouse_timestamps.len() as f64
    }

    /// Number of mouse events carried by the request.
    pub fn mouse_event_count(&self) -> usize {
        self.mouse_timestamps.len()
    }

    /// Normalise into the canonical record used by the feature extractor.
    pub fn to_telemetry(&self) -> Telemetry {
        Telemetry {
            mouse_movement: self.average_mouse_movement(),
            screen_width: self.screen_width,
            screen_height: self.screen_height,
            clicks: self.clicks,
            time_on_page: self.time_on_page,
            key_presses: self.key_presses,
            language: self.language.clone(),
            browser_name: self.browser_name.clone(),
            user_agent: self.user_agent.clone(),
            referrer: self.referrer.clone(),
        }
    }

    /// Render as an unlabeled CSV row; `mouseMovements` becomes the event count.
    pub fn to_row(&self) -> TelemetryRow {
        TelemetryRow {
            mouse_movements: self.mouse_event_count().to_string(),
            screen_width: self.screen_width.to_string(),
            screen_height: self.screen_height.to_string(),
            clicks: self.clicks.to_string(),
            time_on_page: self.time_on_page.to_string(),
            key_presses: self.key_presses.to_string(),
            language: self.language.clone(),
            browser_name: self.browser_name.clone(),
            user_agent: self.user_agent.clone(),
            referrer: self.referrer.clone(),
            label: String::new(),
        }
    }
}

/// Extract the integer timestamp of one mouse event. A missing `timestamp`
/// key counts as zero.
fn event_timestamp(event: &Value) -> Result<i64, InputError> {
    let invalid = || InputError::InvalidInput(NOT_INTEGERS.to_string());

    let event = event.as_object().ok_or_else(invalid)?;
    let timestamp = match event.get("timestamp") {
        None => return Ok(0),
        Some(value) => value,
    };

    let converted = match timestamp {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    converted.ok_or_else(invalid)
}

fn number_field(obj: &Map<String, Value>, field: &str) -> Result<f64, InputError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| type_error(field, "a number", "number")),
        Some(Value::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
        Some(other) => Err(type_error(field, "a number", json_type_name(other))),
    }
}

fn text_field(obj: &Map<String, Value>, field: &str) -> Result<String, InputError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(type_error(field, "a string", json_type_name(other))),
    }
}

fn type_error(field: &str, expected: &'static str, found: &'static str) -> InputError {
    InputError::FieldType {
        field: field.to_string(),
        expected,
        found,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_body() -> Value {
        json!({
            "mouseMovements": [{"timestamp": 10}, {"timestamp": 300}],
            "screenWidth": 1536,
            "screenHeight": 864,
            "timeOnPage": 15,
            "clicks": 8,
            "keyPresses": 20,
            "language": "en-GB",
            "browserName": "Chrome",
            "userAgent": "UA1",
            "referrer": "direct"
        })
    }

    #[test]
    fn test_parse_full_request() {
        let request = TelemetryRequest::from_json(&sample_body()).unwrap();

        assert_eq!(request.mouse_timestamps, vec![10, 300]);
        assert_eq!(request.average_mouse_movement(), 155.0);
        assert_eq!(request.screen_width, 1536.0);
        assert_eq!(request.language, "en-GB");
        assert_eq!(request.referrer, "direct");
    }

    #[test]
    fn test_optional_fields_default() {
        let request =
            TelemetryRequest::from_json(&json!({"mouseMovements": [{"timestamp": 1}]})).unwrap();

        let telemetry = request.to_telemetry();
        assert_eq!(telemetry.screen_width, 0.0);
        assert_eq!(telemetry.key_presses, 0.0);
        assert_eq!(telemetry.browser_name, "");
        assert_eq!(telemetry.language, "");
    }

    #[test]
    fn test_missing_mouse_movements_is_invalid() {
        let err = TelemetryRequest::from_json(&json!({"screenWidth": 100})).unwrap_err();
        assert_eq!(err, InputError::InvalidInput(NOT_A_LIST.to_string()));
        assert!(err.is_value_error());
    }

    #[test]
    fn test_non_list_mouse_movements_is_invalid() {
        let err =
            TelemetryRequest::from_json(&json!({"mouseMovements": {"timestamp": 1}})).unwrap_err();
        assert!(matches!(err, InputError::InvalidInput(_)));
    }

    #[test]
    fn test_empty_mouse_movements() {
        let err = TelemetryRequest::from_json(&json!({"mouseMovements": []})).unwrap_err();
        assert_eq!(err, InputError::EmptyInput);
    }

    #[test]
    fn test_timestamp_conversion() {
        let request = TelemetryRequest::from_json(&json!({
            "mouseMovements": [
                {"timestamp": "42"},
                {"timestamp": 7.9},
                {"timestamp": true},
                {}
            ]
        }))
        .unwrap();

        assert_eq!(request.mouse_timestamps, vec![42, 7, 1, 0]);
    }

    #[test]
    fn test_unconvertible_timestamp() {
        let err = TelemetryRequest::from_json(&json!({
            "mouseMovements": [{"timestamp": 1}, {"timestamp": "soon"}]
        }))
        .unwrap_err();
        assert_eq!(err, InputError::InvalidInput(NOT_INTEGERS.to_string()));

        let err = TelemetryRequest::from_json(&json!({"mouseMovements": [5]})).unwrap_err();
        assert!(matches!(err, InputError::InvalidInput(_)));
    }

    #[test]
    fn test_wrong_field_type() {
        let mut body = sample_body();
        body["screenWidth"] = json!("wide");

        let err = TelemetryRequest::from_json(&body).unwrap_err();
        assert_eq!(
            err,
            InputError::FieldType {
                field: "screenWidth".to_string(),
                expected: "a number",
                found: "string",
            }
        );
        assert!(!err.is_value_error());
    }

    #[test]
    fn test_body_must_be_object() {
        let err = TelemetryRequest::from_slice(b"[1, 2]").unwrap_err();
        assert_eq!(err, InputError::NotAnObject("array"));

        let err = TelemetryRequest::from_slice(b"{not json").unwrap_err();
        assert!(matches!(err, InputError::MalformedJson(_)));
    }

    #[test]
    fn test_to_row_counts_mouse_events() {
        let request = TelemetryRequest::from_json(&sample_body()).unwrap();
        let row = request.to_row();

        assert_eq!(row.mouse_movements, "2");
        assert_eq!(row.screen_width, "1536");
        assert_eq!(row.label, "");
    }
}
