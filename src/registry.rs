//! Static error code registry.
//!
//! Single source of truth mapping error codes to their taxonomy definition.
//! Lookups never fail: unregistered codes resolve to [`codes::UNKNOWN_ERROR`].
//!
//! # Adding a failure mode
//!
//! Add a constant to [`codes`] and a row to the table below. No other code
//! path needs to change.
//!
//! ```rust
//! use interview_resilience::registry::{self, codes};
//! use interview_resilience::Severity;
//!
//! assert_eq!(registry::lookup(codes::STREAM_TOKEN_INVALID).severity, Severity::Critical);
//! assert_eq!(registry::lookup("NOT_A_REAL_CODE"), registry::lookup(codes::UNKNOWN_ERROR));
//! ```

use crate::core_types::{Category, RegistryEntry, Severity, UiState};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Registered error codes.
pub mod codes {
    pub const NETWORK_TIMEOUT: &str = "NETWORK_TIMEOUT";
    pub const NETWORK_OFFLINE: &str = "NETWORK_OFFLINE";
    pub const NETWORK_SERVER_ERROR: &str = "NETWORK_SERVER_ERROR";

    pub const AUTH_UNAUTHORIZED: &str = "AUTH_UNAUTHORIZED";
    pub const AUTH_FORBIDDEN: &str = "AUTH_FORBIDDEN";
    pub const AUTH_SESSION_EXPIRED: &str = "AUTH_SESSION_EXPIRED";

    pub const VALIDATION_REQUIRED_FIELD: &str = "VALIDATION_REQUIRED_FIELD";
    pub const VALIDATION_INVALID_FORMAT: &str = "VALIDATION_INVALID_FORMAT";

    pub const STREAM_CONNECTION_FAILED: &str = "STREAM_CONNECTION_FAILED";
    pub const STREAM_PERMISSION_DENIED: &str = "STREAM_PERMISSION_DENIED";
    pub const STREAM_TOKEN_INVALID: &str = "STREAM_TOKEN_INVALID";

    pub const DATA_MUTATION_FAILED: &str = "DATA_MUTATION_FAILED";
    pub const DATA_QUERY_FAILED: &str = "DATA_QUERY_FAILED";
    /// Backend-vendor spelling of [`DATA_MUTATION_FAILED`].
    pub const CONVEX_MUTATION_FAILED: &str = "CONVEX_MUTATION_FAILED";
    /// Backend-vendor spelling of [`DATA_QUERY_FAILED`].
    pub const CONVEX_QUERY_FAILED: &str = "CONVEX_QUERY_FAILED";

    pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";
}

/// Message returned by [`user_message_for`] for unregistered codes.
pub const GENERIC_USER_MESSAGE: &str = "An error occurred";

const UNKNOWN_ENTRY: RegistryEntry = RegistryEntry {
    category: Category::Unknown,
    severity: Severity::Error,
    user_message: "An unexpected error occurred. Please try again.",
    recoverable: true,
    ui_state: UiState::FullPage,
};

const DATA_MUTATION_ENTRY: RegistryEntry = RegistryEntry {
    category: Category::Data,
    severity: Severity::Error,
    user_message: "Failed to save changes. Please try again.",
    recoverable: true,
    ui_state: UiState::Toast,
};

const DATA_QUERY_ENTRY: RegistryEntry = RegistryEntry {
    category: Category::Data,
    severity: Severity::Error,
    user_message: "Failed to load data. Please refresh the page.",
    recoverable: true,
    ui_state: UiState::InlineError,
};

const ENTRIES: &[(&str, RegistryEntry)] = &[
    // Network
    (
        codes::NETWORK_TIMEOUT,
        RegistryEntry {
            category: Category::Network,
            severity: Severity::Warning,
            user_message: "The request took too long. Please try again.",
            recoverable: true,
            ui_state: UiState::InlineWarning,
        },
    ),
    (
        codes::NETWORK_OFFLINE,
        RegistryEntry {
            category: Category::Network,
            severity: Severity::Error,
            user_message: "You appear to be offline. Please check your connection.",
            recoverable: true,
            ui_state: UiState::FullPage,
        },
    ),
    (
        codes::NETWORK_SERVER_ERROR,
        RegistryEntry {
            category: Category::Network,
            severity: Severity::Error,
            user_message: "Server error. Our team has been notified.",
            recoverable: true,
            ui_state: UiState::FullPage,
        },
    ),
    // Auth
    (
        codes::AUTH_UNAUTHORIZED,
        RegistryEntry {
            category: Category::Auth,
            severity: Severity::Error,
            user_message: "Please sign in to continue.",
            recoverable: false,
            ui_state: UiState::FullPage,
        },
    ),
    (
        codes::AUTH_FORBIDDEN,
        RegistryEntry {
            category: Category::Auth,
            severity: Severity::Error,
            user_message: "You don't have permission to access this resource.",
            recoverable: false,
            ui_state: UiState::FullPage,
        },
    ),
    (
        codes::AUTH_SESSION_EXPIRED,
        RegistryEntry {
            category: Category::Auth,
            severity: Severity::Warning,
            user_message: "Your session has expired. Please sign in again.",
            recoverable: true,
            ui_state: UiState::Modal,
        },
    ),
    // Validation
    (
        codes::VALIDATION_REQUIRED_FIELD,
        RegistryEntry {
            category: Category::Validation,
            severity: Severity::Info,
            user_message: "Please fill in all required fields.",
            recoverable: true,
            ui_state: UiState::InlineInfo,
        },
    ),
    (
        codes::VALIDATION_INVALID_FORMAT,
        RegistryEntry {
            category: Category::Validation,
            severity: Severity::Info,
            user_message: "Please check the format of your input.",
            recoverable: true,
            ui_state: UiState::InlineInfo,
        },
    ),
    // Video SDK
    (
        codes::STREAM_CONNECTION_FAILED,
        RegistryEntry {
            category: Category::Stream,
            severity: Severity::Error,
            user_message: "Failed to connect to video service. Please try again.",
            recoverable: true,
            ui_state: UiState::FullPage,
        },
    ),
    (
        codes::STREAM_PERMISSION_DENIED,
        RegistryEntry {
            category: Category::Stream,
            severity: Severity::Error,
            user_message: "Camera/microphone access denied. Please enable permissions.",
            recoverable: false,
            ui_state: UiState::Modal,
        },
    ),
    (
        codes::STREAM_TOKEN_INVALID,
        RegistryEntry {
            category: Category::Stream,
            severity: Severity::Critical,
            user_message: "Video authentication failed. Please refresh the page.",
            recoverable: true,
            ui_state: UiState::FullPage,
        },
    ),
    // Managed backend
    (codes::DATA_MUTATION_FAILED, DATA_MUTATION_ENTRY),
    (codes::DATA_QUERY_FAILED, DATA_QUERY_ENTRY),
    (codes::CONVEX_MUTATION_FAILED, DATA_MUTATION_ENTRY),
    (codes::CONVEX_QUERY_FAILED, DATA_QUERY_ENTRY),
    // Fallback
    (codes::UNKNOWN_ERROR, UNKNOWN_ENTRY),
];

static REGISTRY: Lazy<HashMap<&'static str, RegistryEntry>> =
    Lazy::new(|| ENTRIES.iter().copied().collect());

/// Registry entry for `code`, if registered.
pub fn get(code: &str) -> Option<&'static RegistryEntry> {
    REGISTRY.get(code)
}

/// Registry entry for `code`, falling back to the `UNKNOWN_ERROR` entry.
pub fn lookup(code: &str) -> &'static RegistryEntry {
    get(code).unwrap_or(&UNKNOWN_ENTRY)
}

pub fn is_registered(code: &str) -> bool {
    REGISTRY.contains_key(code)
}

/// All registered codes, in declaration order.
pub fn registered_codes() -> impl Iterator<Item = &'static str> {
    ENTRIES.iter().map(|(code, _)| *code)
}

/// User-facing message for a bare code; unregistered codes get a generic text.
pub fn user_message_for(code: &str) -> &'static str {
    get(code)
        .map(|entry| entry.user_message)
        .unwrap_or(GENERIC_USER_MESSAGE)
}

/// UI state for a bare code; unregistered codes render full-page.
pub fn ui_state_for(code: &str) -> UiState {
    get(code)
        .map(|entry| entry.ui_state)
        .unwrap_or(UiState::FullPage)
}
