//! The normalized runtime error record and the raw failures it is built from.

use super::taxonomy::{Category, RegistryEntry, Severity, UiState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Free-form diagnostic context supplied by call sites (e.g. `interviewId`).
///
/// Must never contain secrets: metadata is logged, reported, and shown in
/// development details.
pub type Metadata = Map<String, Value>;

/// Build a [`Metadata`] bag from any JSON value.
///
/// Objects are used as-is; any other value is stored under `"value"`.
///
/// ```rust
/// use interview_resilience::metadata;
///
/// let meta = metadata(serde_json::json!({ "interviewId": "int_42" }));
/// assert_eq!(meta["interviewId"], "int_42");
/// ```
pub fn metadata(value: Value) -> Metadata {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

/// Result alias for operations normalized through the error pipeline.
pub type AppResult<T> = std::result::Result<T, StructuredError>;

/// Taxonomy-backed error record produced by the error factory.
///
/// Immutable once created and cheap to clone: the original cause is shared
/// behind an `Arc`. The cause is exposed through [`std::error::Error::source`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredError {
    code: String,
    category: Category,
    severity: Severity,
    message: String,
    user_message: String,
    #[serde(skip)]
    original_cause: Option<Arc<anyhow::Error>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Metadata>,
    timestamp: DateTime<Utc>,
    recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ui_state: Option<UiState>,
}

impl StructuredError {
    pub(crate) fn from_entry(
        code: &str,
        entry: &RegistryEntry,
        cause: Option<anyhow::Error>,
        metadata: Option<Metadata>,
    ) -> Self {
        let message = match &cause {
            Some(cause) => cause.to_string(),
            None => code.to_string(),
        };

        Self {
            code: code.to_string(),
            category: entry.category,
            severity: entry.severity,
            message,
            user_message: entry.user_message.to_string(),
            original_cause: cause.map(Arc::new),
            metadata,
            timestamp: Utc::now(),
            recoverable: entry.recoverable,
            ui_state: Some(entry.ui_state),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Technical message for logs: the cause's text, or the code itself.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn original_cause(&self) -> Option<&anyhow::Error> {
        self.original_cause.as_deref()
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }

    /// Recommended presentation, defaulting to a full-page view.
    pub fn ui_state(&self) -> UiState {
        self.ui_state.unwrap_or(UiState::FullPage)
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }

    /// Whether a retry control should be offered at all.
    pub fn should_show_retry(&self) -> bool {
        self.recoverable
    }

    /// One-line form used in log output: `[CATEGORY] CODE: message`.
    pub fn log_line(&self) -> String {
        format!("[{}] {}: {}", self.category, self.code, self.message)
    }

    /// Copy of this error with `extra` merged over its metadata.
    ///
    /// Used when a supervisor adds context (e.g. a component stack) after
    /// classification.
    pub fn with_metadata(mut self, extra: Metadata) -> Self {
        let mut merged = self.metadata.take().unwrap_or_default();
        merged.extend(extra);
        self.metadata = Some(merged);
        self
    }
}

impl fmt::Display for StructuredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.category, self.code, self.message)
    }
}

impl std::error::Error for StructuredError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.original_cause.as_ref().map(|cause| {
            let inner: &anyhow::Error = cause;
            let err: &(dyn std::error::Error + Send + Sync + 'static) = inner.as_ref();
            err as &(dyn std::error::Error + 'static)
        })
    }
}

/// Any failure that may reach the classifier.
///
/// Collaborators raise untyped, vendor-specific failures; this enum is the
/// single input shape the classifier understands.
#[derive(Debug)]
pub enum Failure {
    /// A real error value with a message the classifier can inspect.
    Error(anyhow::Error),
    /// A raw value that is not an error (never keyword-matched).
    Value(String),
    /// A failure that has already been normalized.
    Structured(StructuredError),
}

impl Failure {
    pub fn error(error: impl Into<anyhow::Error>) -> Self {
        Self::from(error.into())
    }

    pub fn value(value: impl fmt::Display) -> Self {
        Self::Value(value.to_string())
    }

    /// Convert a panic payload.
    ///
    /// String payloads (the `panic!("...")` forms) become errors carrying the
    /// panic message; anything else is an opaque value.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        if let Some(message) = payload.downcast_ref::<&str>() {
            Self::Error(anyhow::Error::msg(message.to_string()))
        } else if let Some(message) = payload.downcast_ref::<String>() {
            Self::Error(anyhow::Error::msg(message.clone()))
        } else {
            Self::Value("non-string panic payload".to_string())
        }
    }

    /// Message text the keyword rules run against, if any.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Error(error) => Some(error.to_string()),
            Self::Value(_) | Self::Structured(_) => None,
        }
    }
}

impl From<anyhow::Error> for Failure {
    /// Errors that already wrap a [`StructuredError`] are unwrapped so they
    /// keep their code instead of being re-classified by message text.
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<StructuredError>() {
            Ok(structured) => Self::Structured(structured),
            Err(error) => Self::Error(error),
        }
    }
}

impl From<StructuredError> for Failure {
    fn from(error: StructuredError) -> Self {
        Self::Structured(error)
    }
}
