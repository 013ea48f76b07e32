// crates/autotow-core/src/runtime/ingest.rs
// ============================================================================
// Module: AutoTow Ingestion Service
// Description: Idempotent record upload with server-side id generation.
// Purpose: Persist each external identifier exactly once.
// Dependencies: crate::core, crate::interfaces, rand
// ============================================================================

//! ## Overview
//! Uploads are keyed by their external identifier. A known identifier is a
//! no-op that reports `duplicate`; an unknown one is inserted. When the
//! client omits the identifier the service generates an 8-character token
//! and regenerates on collision, up to [`MAX_ID_ATTEMPTS`] times.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use rand::RngCore;
use rand::rngs::OsRng;
use serde::Serialize;

use crate::core::ExternalId;
use crate::core::IngestPayload;
use crate::core::NewExperiment;
use crate::core::ServiceError;
use crate::interfaces::InsertOutcome;
use crate::interfaces::RecordStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum generated-id attempts before giving up.
pub const MAX_ID_ATTEMPTS: usize = 8;

// ============================================================================
// SECTION: Id Generation
// ============================================================================

/// Source of fresh external identifiers.
pub trait IdGenerator: Send + Sync {
    /// Returns a candidate identifier. Uniqueness is checked by the caller.
    fn next_id(&self) -> ExternalId;
}

/// Random 8-character lowercase hex tokens from the OS RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self) -> ExternalId {
        let mut bytes = [0u8; 4];
        OsRng.fill_bytes(&mut bytes);
        ExternalId::from_trusted(format!("{:08x}", u32::from_be_bytes(bytes)))
    }
}

// ============================================================================
// SECTION: Receipts
// ============================================================================

/// Ingestion outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    /// A new record was stored.
    Created,
    /// The identifier was already stored; nothing was written.
    Duplicate,
}

impl IngestStatus {
    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Duplicate => "duplicate",
        }
    }
}

/// Result of a successful ingestion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReceipt {
    /// Whether a row was written.
    pub status: IngestStatus,
    /// Identifier the record is stored under.
    pub external_id: ExternalId,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Idempotent upload service.
#[derive(Clone)]
pub struct IngestionService {
    /// Record persistence.
    records: Arc<dyn RecordStore>,
    /// Identifier source for uploads without one.
    ids: Arc<dyn IdGenerator>,
}

impl IngestionService {
    /// Builds a service that generates random identifiers.
    #[must_use]
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self::with_id_generator(records, Arc::new(RandomIdGenerator))
    }

    /// Builds a service with an explicit identifier source.
    #[must_use]
    pub fn with_id_generator(records: Arc<dyn RecordStore>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            records,
            ids,
        }
    }

    /// Ingests raw JSON request bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] for malformed payloads and
    /// [`ServiceError::Store`] for persistence failures.
    pub fn ingest_bytes(&self, bytes: &[u8]) -> Result<IngestReceipt, ServiceError> {
        let payload = IngestPayload::from_slice(bytes).map_err(ServiceError::Validation)?;
        self.ingest(payload)
    }

    /// Ingests a parsed payload.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] when the client identifier is
    /// unusable and [`ServiceError::Store`] for persistence failures.
    pub fn ingest(&self, mut payload: IngestPayload) -> Result<IngestReceipt, ServiceError> {
        let supplied = payload.uuid.take().filter(|raw| !raw.trim().is_empty());
        let created_at_ms = unix_millis();
        if let Some(raw) = supplied {
            let external_id = ExternalId::parse(&raw).map_err(|rejection| {
                ServiceError::Validation(format!("invalid uuid: {rejection}"))
            })?;
            let record = NewExperiment::from_payload(external_id.clone(), payload, created_at_ms);
            let status = match self.records.insert_if_absent(&record)? {
                InsertOutcome::Created => IngestStatus::Created,
                InsertOutcome::Duplicate => IngestStatus::Duplicate,
            };
            return Ok(IngestReceipt {
                status,
                external_id,
            });
        }

        let mut record = NewExperiment::from_payload(self.ids.next_id(), payload, created_at_ms);
        for _ in 0..MAX_ID_ATTEMPTS {
            if self.records.insert_if_absent(&record)? == InsertOutcome::Created {
                return Ok(IngestReceipt {
                    status: IngestStatus::Created,
                    external_id: record.external_id,
                });
            }
            record.external_id = self.ids.next_id();
        }
        Err(ServiceError::Store(StoreError::Store(format!(
            "could not allocate a unique id after {MAX_ID_ATTEMPTS} attempts"
        ))))
    }
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
