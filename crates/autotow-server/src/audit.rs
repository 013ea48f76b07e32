// crates/autotow-server/src/audit.rs
// ============================================================================
// Module: AutoTow Audit Logging
// Description: Structured audit events for HTTP request handling.
// Purpose: Emit redacted JSON-lines audit records without a logging framework.
// Dependencies: autotow-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Each state-changing or security-relevant request emits one [`AuditEvent`]
//! to an [`AuditSink`]. Events never carry passwords or session tokens.
//! Console statements are recorded as a SHA-256 digest unless raw text
//! logging is enabled in configuration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use autotow_core::Principal;
use autotow_core::Role;
use autotow_core::hashing::sha256_hex;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// Event identifier (`ingest`, `login`, `query`, ...).
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Outcome label.
    pub outcome: &'static str,
    /// Acting or targeted username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Role of the acting principal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Record identifier or account the action targeted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Statement classification for console events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement: Option<&'static str>,
    /// SHA-256 of the console statement text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_sha256: Option<String>,
    /// Raw console statement text, only when explicitly enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_text: Option<String>,
}

/// Inputs for building an [`AuditEvent`].
#[derive(Debug, Clone, Default)]
pub struct AuditEventParams {
    /// Outcome label.
    pub outcome: &'static str,
    /// Acting or targeted username.
    pub username: Option<String>,
    /// Role of the acting principal.
    pub role: Option<Role>,
    /// Record identifier or targeted account.
    pub subject: Option<String>,
    /// Statement classification.
    pub statement: Option<&'static str>,
    /// SHA-256 of the statement text.
    pub query_sha256: Option<String>,
    /// Raw statement text.
    pub query_text: Option<String>,
}

impl AuditEventParams {
    /// Starts params with an outcome label.
    #[must_use]
    pub fn outcome(outcome: &'static str) -> Self {
        Self {
            outcome,
            ..Self::default()
        }
    }

    /// Attaches the acting principal.
    #[must_use]
    pub fn with_principal(mut self, principal: &Principal) -> Self {
        self.username = Some(principal.username.as_str().to_string());
        self.role = Some(principal.role);
        self
    }

    /// Attaches the targeted record or account.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Attaches a console statement, hashed unless `include_text` is set.
    #[must_use]
    pub fn with_query(mut self, text: &str, include_text: bool) -> Self {
        self.query_sha256 = Some(sha256_hex(text.as_bytes()));
        if include_text {
            self.query_text = Some(text.to_string());
        }
        self
    }
}

impl AuditEvent {
    /// Builds an event stamped with the current time.
    #[must_use]
    pub fn new(event: &'static str, params: AuditEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            outcome: params.outcome,
            username: params.username,
            role: params.role,
            subject: params.subject,
            statement: params.statement,
            query_sha256: params.query_sha256,
            query_text: params.query_text,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for request events.
pub trait AuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &AuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Audit sink that drops all events.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted."
    )]

    use std::fs;

    use super::AuditEvent;
    use super::AuditEventParams;
    use super::AuditSink;
    use super::FileAuditSink;

    #[test]
    fn query_text_is_hashed_by_default() {
        let params = AuditEventParams::outcome("rows").with_query("SELECT 1", false);
        let event = AuditEvent::new("query", params);
        let payload = serde_json::to_string(&event).unwrap();
        assert!(!payload.contains("SELECT 1"));
        assert!(payload.contains("query_sha256"));
        assert!(!payload.contains("username"));
    }

    #[test]
    fn file_sink_appends_json_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = FileAuditSink::new(&path).unwrap();
        sink.record(&AuditEvent::new("startup", AuditEventParams::outcome("ready")));
        sink.record(&AuditEvent::new("logout", AuditEventParams::outcome("success")));
        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "startup");
        assert_eq!(first["outcome"], "ready");
    }
}
