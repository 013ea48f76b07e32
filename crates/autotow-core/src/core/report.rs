// crates/autotow-core/src/core/report.rs
// ============================================================================
// Module: AutoTow Report View
// Description: Fixed public projection of a stored record.
// Purpose: Decide exactly which record fields a public report may show.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Reports are public, so the view is an allow-list: it never carries logs,
//! the surrogate key, timestamps, or anything from the credential store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::core::record::DEFAULT_STATUS;
use crate::core::record::ExperimentRecord;

// ============================================================================
// SECTION: Report View
// ============================================================================

/// Color-coding hint for the report status box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTone {
    /// Status is `COMPLETED`.
    Success,
    /// Any other status.
    Attention,
}

/// Public report projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView {
    /// Public identifier.
    pub external_id: String,
    /// Batch name.
    pub batch_id: Option<String>,
    /// Operator name.
    pub operator: Option<String>,
    /// Material code.
    pub material: Option<String>,
    /// Free-form production date.
    pub date: Option<String>,
    /// Average speed (m/min).
    pub avg_speed: f64,
    /// Average temperature (°C).
    pub avg_temp: f64,
    /// Total length (m).
    pub total_length: f64,
    /// Run status.
    pub status: String,
    /// Derived color hint.
    pub status_tone: StatusTone,
}

impl From<&ExperimentRecord> for ReportView {
    fn from(record: &ExperimentRecord) -> Self {
        let status_tone =
            if record.status == DEFAULT_STATUS { StatusTone::Success } else { StatusTone::Attention };
        Self {
            external_id: record.external_id.as_str().to_string(),
            batch_id: record.batch_id.clone(),
            operator: record.operator.clone(),
            material: record.material.clone(),
            date: record.date.clone(),
            avg_speed: record.avg_speed,
            avg_temp: record.avg_temp,
            total_length: record.total_length,
            status: record.status.clone(),
            status_tone,
        }
    }
}
