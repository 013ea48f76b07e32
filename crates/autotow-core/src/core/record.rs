// crates/autotow-core/src/core/record.rs
// ============================================================================
// Module: AutoTow Experiment Records
// Description: Stored record model and the ingestion payload schema.
// Purpose: Turn loosely typed client JSON into a fully defaulted record.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Clients post free-form JSON. [`IngestPayload`] pins that down to named
//! optional fields: strings accept any JSON scalar, numbers accept JSON
//! numbers or numeric strings, and `logs` accepts anything and is flattened
//! to JSON text. Values that cannot be coerced are rejected. Both `snake_case`
//! keys and `camelCase` aliases are accepted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::de::Error as _;
use serde_json::Value;

use crate::core::identifiers::ExternalId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Status assigned when the client omits one.
pub const DEFAULT_STATUS: &str = "COMPLETED";

// ============================================================================
// SECTION: Stored Record
// ============================================================================

/// A persisted production-run record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentRecord {
    /// Store-assigned surrogate key.
    pub id: i64,
    /// Public identifier.
    pub external_id: ExternalId,
    /// Batch name.
    pub batch_id: Option<String>,
    /// Operator name.
    pub operator: Option<String>,
    /// Material code.
    pub material: Option<String>,
    /// Free-form production date.
    pub date: Option<String>,
    /// Average line speed (m/min).
    pub avg_speed: f64,
    /// Average temperature (°C).
    pub avg_temp: f64,
    /// Total produced length (m).
    pub total_length: f64,
    /// Run status.
    pub status: String,
    /// Opaque log blob as JSON text.
    pub logs: Option<String>,
    /// Receipt time in unix milliseconds.
    pub created_at_ms: i64,
}

/// A fully defaulted record ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExperiment {
    /// Public identifier (client-supplied or generated).
    pub external_id: ExternalId,
    /// Batch name.
    pub batch_id: Option<String>,
    /// Operator name.
    pub operator: Option<String>,
    /// Material code.
    pub material: Option<String>,
    /// Free-form production date.
    pub date: Option<String>,
    /// Average line speed.
    pub avg_speed: f64,
    /// Average temperature.
    pub avg_temp: f64,
    /// Total produced length.
    pub total_length: f64,
    /// Run status.
    pub status: String,
    /// Opaque log blob as JSON text.
    pub logs: Option<String>,
    /// Receipt time in unix milliseconds.
    pub created_at_ms: i64,
}

impl NewExperiment {
    /// Builds an insertable record from a parsed payload.
    #[must_use]
    pub fn from_payload(external_id: ExternalId, payload: IngestPayload, created_at_ms: i64) -> Self {
        Self {
            external_id,
            batch_id: payload.batch_id,
            operator: payload.operator,
            material: payload.material,
            date: payload.date,
            avg_speed: payload.avg_speed.unwrap_or(0.0),
            avg_temp: payload.avg_temp.unwrap_or(0.0),
            total_length: payload.total_length.unwrap_or(0.0),
            status: payload.status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            logs: payload.logs,
            created_at_ms,
        }
    }
}

// ============================================================================
// SECTION: Ingestion Payload
// ============================================================================

/// Upload payload schema.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IngestPayload {
    /// Optional client identifier.
    #[serde(default, alias = "externalId", alias = "external_id", deserialize_with = "lenient_string")]
    pub uuid: Option<String>,
    /// Batch name.
    #[serde(default, alias = "batchId", deserialize_with = "lenient_string")]
    pub batch_id: Option<String>,
    /// Operator name.
    #[serde(default, deserialize_with = "lenient_string")]
    pub operator: Option<String>,
    /// Material code.
    #[serde(default, deserialize_with = "lenient_string")]
    pub material: Option<String>,
    /// Free-form production date.
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    /// Average line speed.
    #[serde(default, alias = "avgSpeed", deserialize_with = "lenient_number")]
    pub avg_speed: Option<f64>,
    /// Average temperature.
    #[serde(default, alias = "avgTemp", deserialize_with = "lenient_number")]
    pub avg_temp: Option<f64>,
    /// Total produced length.
    #[serde(default, alias = "totalLength", deserialize_with = "lenient_number")]
    pub total_length: Option<f64>,
    /// Run status.
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    /// Arbitrary log data.
    #[serde(default, deserialize_with = "flatten_logs")]
    pub logs: Option<String>,
}

impl IngestPayload {
    /// Parses a payload from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns a message when the value is not an object or a field cannot be
    /// coerced to its declared type.
    pub fn from_value(value: Value) -> Result<Self, String> {
        if !value.is_object() {
            return Err("payload must be a JSON object".to_string());
        }
        serde_json::from_value(value).map_err(|err| err.to_string())
    }

    /// Parses a payload from raw request bytes.
    ///
    /// # Errors
    ///
    /// Returns a message when the bytes are not a JSON object or a field
    /// cannot be coerced to its declared type.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, String> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|err| format!("invalid json: {err}"))?;
        Self::from_value(value)
    }
}

// ============================================================================
// SECTION: Coercion
// ============================================================================

/// Accepts strings, numbers, and booleans as text; null as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(_) => Err(D::Error::custom("expected a string or scalar value")),
    }
}

/// Accepts finite JSON numbers or numeric strings; null as absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match parsed {
        Some(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(D::Error::custom("expected a finite number")),
    }
}

/// Flattens arbitrary log data to JSON text. Strings are kept verbatim.
fn flatten_logs<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(other) => serde_json::to_string(&other).map(Some).map_err(D::Error::custom),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
