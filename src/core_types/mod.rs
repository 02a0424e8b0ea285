//! Core types for the error pipeline
//!
//! ## Organization
//! - `taxonomy` - Closed category/severity/UI-state enums and registry entries
//! - `structured` - The structured error record and raw failure input

pub mod structured;
pub mod taxonomy;

pub use structured::{metadata, AppResult, Failure, Metadata, StructuredError};
pub use taxonomy::{Category, RegistryEntry, Severity, UiState};
