// crates/autotow-config/src/lib.rs
// ============================================================================
// Module: AutoTow Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for autotow.toml semantics.
// Dependencies: autotow-core, autotow-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `autotow-config` defines the configuration handed to the server and CLI.
//! Values come from `autotow.toml`, then `AUTOTOW_*` environment overrides,
//! and are validated fail-closed before any component is constructed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
