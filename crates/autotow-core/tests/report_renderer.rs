// crates/autotow-core/tests/report_renderer.rs
// ============================================================================
// Module: Report Renderer Tests
// Description: Report projection and not-found behavior.
// Purpose: Ensure reports mirror stored values and expose nothing else.
// Dependencies: autotow-core, serde_json
// ============================================================================

//! ## Overview
//! Renders reports from an in-memory record store.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::float_cmp,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;

use autotow_core::InMemoryRecordStore;
use autotow_core::IngestStatus;
use autotow_core::IngestionService;
use autotow_core::RecordStore;
use autotow_core::ReportRenderer;
use autotow_core::ServiceError;
use autotow_core::StatusTone;
use serde_json::json;

#[test]
fn report_matches_stored_values() {
    let store = Arc::new(InMemoryRecordStore::new());
    let ingest = IngestionService::new(store.clone());
    let renderer = ReportRenderer::new(store);
    let payload = json!({
        "uuid": "r-1",
        "batch_id": "B7",
        "operator": "alice",
        "material": "PA6",
        "date": "2025-01-02",
        "avg_speed": 12.5,
        "avg_temp": 230.0,
        "total_length": 800.25,
        "status": "ABORTED",
        "logs": {"secret": "do-not-show"}
    });
    ingest.ingest_bytes(&serde_json::to_vec(&payload).unwrap()).unwrap();

    let view = renderer.render_report("r-1").unwrap();
    assert_eq!(view.external_id, "r-1");
    assert_eq!(view.batch_id.as_deref(), Some("B7"));
    assert_eq!(view.operator.as_deref(), Some("alice"));
    assert_eq!(view.material.as_deref(), Some("PA6"));
    assert_eq!(view.date.as_deref(), Some("2025-01-02"));
    assert_eq!(view.avg_speed, 12.5);
    assert_eq!(view.avg_temp, 230.0);
    assert_eq!(view.total_length, 800.25);
    assert_eq!(view.status, "ABORTED");
    assert_eq!(view.status_tone, StatusTone::Attention);

    let serialized = serde_json::to_string(&view).unwrap();
    assert!(!serialized.contains("do-not-show"));
    assert!(!serialized.contains("logs"));
    assert!(!serialized.contains("created_at"));
}

#[test]
fn unknown_or_unusable_ids_are_not_found() {
    let store = Arc::new(InMemoryRecordStore::new());
    let renderer = ReportRenderer::new(store);
    assert!(matches!(renderer.render_report("missing").unwrap_err(), ServiceError::NotFound(_)));
    assert!(matches!(renderer.render_report("").unwrap_err(), ServiceError::NotFound(_)));
    assert!(matches!(renderer.render_report("a b").unwrap_err(), ServiceError::NotFound(_)));
}

#[test]
fn end_to_end_generated_id_round_trip() {
    let store = Arc::new(InMemoryRecordStore::new());
    let ingest = IngestionService::new(store.clone());
    let renderer = ReportRenderer::new(store.clone());
    let mut payload = json!({
        "batchId": "B1",
        "operator": "alice",
        "material": "PA6",
        "totalLength": 120.5,
        "status": "COMPLETED"
    });

    let receipt = ingest.ingest_bytes(&serde_json::to_vec(&payload).unwrap()).unwrap();
    assert_eq!(receipt.status, IngestStatus::Created);

    let view = renderer.render_report(receipt.external_id.as_str()).unwrap();
    assert_eq!(view.total_length, 120.5);
    assert_eq!(view.status, "COMPLETED");
    assert_eq!(view.status_tone, StatusTone::Success);

    payload["uuid"] = json!(receipt.external_id.as_str());
    let again = ingest.ingest_bytes(&serde_json::to_vec(&payload).unwrap()).unwrap();
    assert_eq!(again.status, IngestStatus::Duplicate);
    assert_eq!(again.external_id, receipt.external_id);
    let matching = store
        .list_records()
        .unwrap()
        .into_iter()
        .filter(|record| record.external_id == receipt.external_id)
        .count();
    assert_eq!(matching, 1);
}
