// crates/autotow-server/src/lib.rs
// ============================================================================
// Module: AutoTow Server Library
// Description: HTTP boundary for the AutoTow production records service.
// Purpose: Expose the server entry point and audit sinks.
// Dependencies: crate::{audit, pages, server}
// ============================================================================

//! ## Overview
//! This crate wires the AutoTow core services onto an axum router: record
//! upload, login sessions, the dashboard and query console, public reports,
//! and the admin reset. Inputs are untrusted; every handler delegates to the
//! core for validation and authorization.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
mod pages;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditEvent;
pub use audit::AuditEventParams;
pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use server::AutotowServer;
pub use server::SESSION_COOKIE;
pub use server::ServerError;
