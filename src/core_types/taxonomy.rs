//! Closed error taxonomy: categories, severities, and UI hints.
//!
//! Every registered error code maps onto exactly one [`Category`], one
//! [`Severity`], and one advisory [`UiState`]. These enums are closed: adding
//! a failure mode means adding a registry entry, never a new variant.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical grouping of error codes for classification and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// Connectivity problems: timeouts, offline, server failures.
    Network,
    /// Identity problems: missing session, forbidden access.
    Auth,
    /// User input that failed validation.
    Validation,
    /// Video SDK failures: connection, device permissions, tokens.
    Stream,
    /// Managed backend failures: mutations and queries.
    Data,
    /// Anything the classifier could not place.
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "NETWORK",
            Self::Auth => "AUTH",
            Self::Validation => "VALIDATION",
            Self::Stream => "STREAM",
            Self::Data => "DATA",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered severity levels: `Info < Warning < Error < Critical`.
///
/// Severity decides the log level, whether an error reaches the reporting
/// sink (only [`Severity::Critical`]), and the default presentation weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Expected condition, shown inline without blocking.
    Info,
    /// Unexpected but harmless, shown inline or as a toast.
    Warning,
    /// The action failed; blocking view per UI state.
    Error,
    /// The system cannot continue; reported to the sink.
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    /// Whether errors of this severity block user interaction.
    pub fn is_blocking(&self) -> bool {
        *self >= Self::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advisory hint for how a structured error should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiState {
    InlineInfo,
    InlineWarning,
    InlineError,
    Toast,
    Modal,
    FullPage,
}

impl UiState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InlineInfo => "inline_info",
            Self::InlineWarning => "inline_warning",
            Self::InlineError => "inline_error",
            Self::Toast => "toast",
            Self::Modal => "modal",
            Self::FullPage => "full_page",
        }
    }

    /// Inline and toast states leave the surrounding view interactive.
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            Self::InlineInfo | Self::InlineWarning | Self::InlineError | Self::Toast
        )
    }
}

impl fmt::Display for UiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable registry definition for one error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryEntry {
    pub category: Category,
    pub severity: Severity,
    /// Message safe to show to end users.
    pub user_message: &'static str,
    /// `true` when a retry or user action can plausibly resolve the failure.
    pub recoverable: bool,
    pub ui_state: UiState,
}
