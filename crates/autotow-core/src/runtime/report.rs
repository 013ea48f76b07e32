// crates/autotow-core/src/runtime/report.rs
// ============================================================================
// Module: AutoTow Report Renderer
// Description: Public report lookup by external identifier.
// Purpose: Project stored records into the fixed report view.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Report pages are public and keyed only by external identifier. Lookups
//! never reveal whether an identifier was malformed or simply unknown.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::core::ExternalId;
use crate::core::ReportView;
use crate::core::ServiceError;
use crate::interfaces::RecordStore;

// ============================================================================
// SECTION: Renderer
// ============================================================================

/// Read-only report lookup.
#[derive(Clone)]
pub struct ReportRenderer {
    /// Record persistence.
    records: Arc<dyn RecordStore>,
}

impl ReportRenderer {
    /// Builds a renderer over a record store.
    #[must_use]
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self {
            records,
        }
    }

    /// Renders the report for `external_id`.
    ///
    /// Identifiers that could never have been stored are reported as not
    /// found rather than invalid.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] when no record matches and
    /// [`ServiceError::Store`] on persistence failure.
    pub fn render_report(&self, external_id: &str) -> Result<ReportView, ServiceError> {
        let not_found = || ServiceError::NotFound(external_id.to_string());
        let id = ExternalId::parse(external_id).map_err(|_| not_found())?;
        let record = self.records.find_by_external_id(&id)?.ok_or_else(not_found)?;
        Ok(ReportView::from(&record))
    }
}
