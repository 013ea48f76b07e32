// crates/autotow-core/tests/ingestion.rs
// ============================================================================
// Module: Ingestion Service Tests
// Description: Idempotent upload behavior over the in-memory record store.
// Purpose: Ensure each external identifier is stored exactly once.
// Dependencies: autotow-core, serde_json
// ============================================================================

//! ## Overview
//! Exercises duplicate detection, id generation and regeneration, and payload
//! validation against [`InMemoryRecordStore`].

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;

use autotow_core::ExternalId;
use autotow_core::IdGenerator;
use autotow_core::InMemoryRecordStore;
use autotow_core::IngestStatus;
use autotow_core::IngestionService;
use autotow_core::MAX_ID_ATTEMPTS;
use autotow_core::RecordStore;
use autotow_core::ServiceError;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Hands out a fixed sequence of identifiers, repeating the last one.
struct ScriptedIds {
    ids: Mutex<Vec<&'static str>>,
}

impl ScriptedIds {
    fn new(ids: &[&'static str]) -> Self {
        let mut ids = ids.to_vec();
        ids.reverse();
        Self {
            ids: Mutex::new(ids),
        }
    }
}

impl IdGenerator for ScriptedIds {
    fn next_id(&self) -> ExternalId {
        let mut ids = self.ids.lock().unwrap();
        let next = if ids.len() > 1 { ids.pop().unwrap() } else { ids[0] };
        ExternalId::from_trusted(next)
    }
}

fn ingest_json(service: &IngestionService, value: &serde_json::Value) -> Result<autotow_core::IngestReceipt, ServiceError> {
    service.ingest_bytes(&serde_json::to_vec(value).unwrap())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn same_external_id_is_stored_once() {
    let store = InMemoryRecordStore::new();
    let service = IngestionService::new(Arc::new(store.clone()));
    let payload = json!({"uuid": "run-001", "batch_id": "B1", "total_length": 10.0});

    let first = ingest_json(&service, &payload).unwrap();
    assert_eq!(first.status, IngestStatus::Created);
    assert_eq!(first.external_id.as_str(), "run-001");

    let changed = json!({"uuid": "run-001", "batch_id": "B2", "total_length": 99.0});
    let second = ingest_json(&service, &changed).unwrap();
    assert_eq!(second.status, IngestStatus::Duplicate);
    assert_eq!(store.len().unwrap(), 1);

    let stored = store.find_by_external_id(&ExternalId::parse("run-001").unwrap()).unwrap().unwrap();
    assert_eq!(stored.batch_id.as_deref(), Some("B1"));
    assert_eq!(stored.total_length, 10.0);
}

#[test]
fn missing_or_blank_uuid_gets_an_eight_character_token() {
    let store = InMemoryRecordStore::new();
    let service = IngestionService::new(Arc::new(store.clone()));
    let mut seen = BTreeSet::new();
    for payload in [json!({}), json!({"uuid": ""}), json!({"uuid": "   "}), json!({"uuid": null})] {
        let receipt = ingest_json(&service, &payload).unwrap();
        assert_eq!(receipt.status, IngestStatus::Created);
        assert_eq!(receipt.external_id.as_str().len(), 8);
        assert!(receipt.external_id.as_str().chars().all(|ch| ch.is_ascii_hexdigit()));
        seen.insert(receipt.external_id);
    }
    assert_eq!(seen.len(), 4);
    assert_eq!(store.len().unwrap(), 4);
}

#[test]
fn generated_ids_do_not_collide_across_many_uploads() {
    let store = InMemoryRecordStore::new();
    let service = IngestionService::new(Arc::new(store.clone()));
    let mut seen = BTreeSet::new();
    for _ in 0..200 {
        let receipt = ingest_json(&service, &json!({"status": "OK"})).unwrap();
        assert!(seen.insert(receipt.external_id));
    }
    assert_eq!(store.len().unwrap(), 200);
}

#[test]
fn generated_id_collision_is_regenerated() {
    let store = InMemoryRecordStore::new();
    let ids = Arc::new(ScriptedIds::new(&["aaaaaaaa", "aaaaaaaa", "bbbbbbbb"]));
    let service = IngestionService::with_id_generator(Arc::new(store.clone()), ids);

    let first = ingest_json(&service, &json!({})).unwrap();
    assert_eq!(first.external_id.as_str(), "aaaaaaaa");
    let second = ingest_json(&service, &json!({})).unwrap();
    assert_eq!(second.status, IngestStatus::Created);
    assert_eq!(second.external_id.as_str(), "bbbbbbbb");
    assert_eq!(store.len().unwrap(), 2);
}

#[test]
fn exhausted_id_attempts_fail_without_writing() {
    let store = InMemoryRecordStore::new();
    let ids = Arc::new(ScriptedIds::new(&["cccccccc"]));
    let service = IngestionService::with_id_generator(Arc::new(store.clone()), ids);
    ingest_json(&service, &json!({})).unwrap();

    let err = ingest_json(&service, &json!({})).unwrap_err();
    assert!(matches!(err, ServiceError::Store(_)));
    assert!(err.to_string().contains(&MAX_ID_ATTEMPTS.to_string()));
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn malformed_payloads_are_validation_errors() {
    let store = InMemoryRecordStore::new();
    let service = IngestionService::new(Arc::new(store.clone()));
    for bytes in [&b"not json"[..], b"[1,2,3]", b"\"text\"", br#"{"avg_speed": "fast"}"#] {
        let err = service.ingest_bytes(bytes).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)), "{err}");
    }
    let err = ingest_json(&service, &json!({"uuid": "a/b"})).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert_eq!(store.len().unwrap(), 0);
}

#[test]
fn defaults_are_applied_to_stored_record() {
    let store = InMemoryRecordStore::new();
    let service = IngestionService::new(Arc::new(store.clone()));
    let receipt = ingest_json(&service, &json!({"uuid": "d-1", "operator": "alice"})).unwrap();
    let stored = store.find_by_external_id(&receipt.external_id).unwrap().unwrap();
    assert_eq!(stored.operator.as_deref(), Some("alice"));
    assert_eq!(stored.status, "COMPLETED");
    assert_eq!(stored.avg_speed, 0.0);
    assert_eq!(stored.avg_temp, 0.0);
    assert_eq!(stored.total_length, 0.0);
    assert!(stored.created_at_ms > 0);
}
