//! # interview-resilience
//!
//! Error normalization and failure supervision for an interview scheduling
//! and video-call application.
//!
//! ## Key Features
//!
//! - **Closed Taxonomy**: Every failure maps onto a registered code with a
//!   category, severity, user-facing message, recoverability and UI state
//! - **Classification**: Failures of unknown shape are routed by an ordered
//!   keyword rule table
//! - **Central Handler**: Logging, an `on_error` hook, bounded history and
//!   reporting of critical errors
//! - **Failure Boundaries**: Supervised subtrees with fallback views, reset
//!   keys and capped exponential backoff retry
//! - **Global Listeners**: Last-resort capture of panics and failed detached
//!   tasks
//!
//! ## Example
//!
//! ```rust,no_run
//! use interview_resilience::{codes, BoundaryOptions, ErrorHandler, FailureBoundary, HandlerConfig};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let handler = Arc::new(ErrorHandler::new(
//!     HandlerConfig::default().with_on_error(|error| eprintln!("{}", error.user_message())),
//! ));
//! handler.attach_global_listeners();
//!
//! let boundary = FailureBoundary::new("MeetingRoom", Arc::clone(&handler), BoundaryOptions::default());
//! let rendered = boundary.render(|| Err::<(), _>(anyhow::anyhow!("video stream dropped")));
//!
//! if let Some(view) = rendered.failure_view() {
//!     println!("{view}");
//! }
//! assert_eq!(boundary.error().map(|e| e.code().to_string()).as_deref(), Some(codes::STREAM_CONNECTION_FAILED));
//! # }
//! ```

#![allow(clippy::missing_errors_doc)]

// Structured error record and taxonomy enums
pub mod core_types;

// Logging utilities (re-exports tracing with log_* naming) - internal only
pub(crate) mod logging;

pub mod boundary;
pub mod classifier;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod factory;
pub mod handler;
pub mod history;
pub mod listener;
pub mod presentation;
pub mod registry;
pub mod reporting;
pub mod retry;

#[cfg(test)]
pub mod tests;

pub use boundary::{BoundaryOptions, BoundaryState, FailureBoundary, Rendered, ResetKey};
pub use classifier::{ClassificationRule, Classifier};
pub use collaborators::{issue_video_token, TokenIssuer, UserIdentity};
pub use config::{HandlerSettings, PresentationSettings, ReportingSettings, ResilienceConfig};
pub use error::{ConfigError, ReportError};
pub use factory::build_error;
pub use handler::{ErrorHandler, ErrorHook, HandlerConfig};
pub use history::{ErrorHistory, DEFAULT_HISTORY_SIZE, MAX_HISTORY_SIZE};
pub use presentation::{DisplayOptions, FailureView, RetryButton, SeverityIcon};
pub use registry::codes;
pub use reporting::{report_fn, ReportReceipt, ReportSink, WebhookReportSink};
pub use retry::{BackoffPolicy, RetryTracker, DEFAULT_MAX_RETRIES};

pub use core_types::{
    metadata, AppResult, Category, Failure, Metadata, RegistryEntry, Severity, StructuredError,
    UiState,
};
