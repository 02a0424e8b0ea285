//! Infrastructure error types.
//!
//! Application failures are described by
//! [`StructuredError`](crate::StructuredError). The types here cover the
//! error pipeline's own plumbing:
//! - [`ConfigError`] for invalid or unreadable configuration
//! - [`ReportError`] for reporting sinks that failed to deliver
//!
//! Like the structured errors they support, these are created through
//! constructor methods that log at the appropriate level.
//!
//! ```rust
//! use interview_resilience::ConfigError;
//!
//! let err = ConfigError::invalid_value("max_history_size", "must be at least 1");
//! assert!(err.to_string().contains("max_history_size"));
//! ```

use crate::logging::{log_error, log_warn};
use thiserror::Error;

/// Configuration could not be loaded or failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A setting is present but unusable.
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// Name of the offending setting.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An environment variable could not be parsed.
    #[error("Environment variable {variable} has unparseable value '{value}'")]
    UnparseableEnv {
        variable: String,
        value: String,
    },
}

impl ConfigError {
    /// Create an invalid value error (logs at ERROR level).
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let field = field.into();
        let reason = reason.into();
        log_error!(
            error_type = "invalid_config_value",
            field = %field,
            reason = %reason,
            "Resilience configuration validation failed"
        );
        Self::InvalidValue { field, reason }
    }

    pub fn unparseable_env(variable: impl Into<String>, value: impl Into<String>) -> Self {
        let variable = variable.into();
        let value = value.into();
        log_error!(
            error_type = "unparseable_env",
            variable = %variable,
            "Resilience configuration could not parse environment variable"
        );
        Self::UnparseableEnv { variable, value }
    }
}

/// A reporting sink failed to deliver a critical error.
///
/// Never propagated to callers of
/// [`ErrorHandler::handle`](crate::ErrorHandler::handle); the handler logs it
/// and moves on.
#[derive(Error, Debug)]
pub enum ReportError {
    /// The sink could not reach its destination.
    #[error("Report transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The destination answered with a non-success status.
    #[error("Report rejected with HTTP status {status}")]
    Rejected {
        status: u16,
    },

    /// Any other sink-specific failure.
    #[error("Report failed: {message}")]
    Failed {
        message: String,
    },
}

impl ReportError {
    pub fn rejected(status: u16) -> Self {
        log_warn!(
            error_type = "report_rejected",
            status = status,
            "Reporting endpoint rejected error report"
        );
        Self::Rejected { status }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "report_failed",
            reason = %message,
            "Reporting sink failed"
        );
        Self::Failed { message }
    }
}
