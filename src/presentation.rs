//! Failure presentation.
//!
//! Turns a [`StructuredError`] into a [`FailureView`]: a pure description of
//! what to show (icon, message, hint, actions, optional technical details).
//! Rendering it to a concrete surface is the caller's business; the
//! [`Display`](std::fmt::Display) impl gives a plain-text rendering.

use crate::config::PresentationSettings;
use crate::core_types::{Severity, StructuredError, UiState};
use crate::reporting::{report_issue, ReportReceipt};
use crate::retry::DEFAULT_MAX_RETRIES;

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

const HINT_CAN_RETRY: &str = "Please try again or refresh the page.";
const HINT_RETRIES_EXHAUSTED: &str = "Maximum retry attempts reached. Please refresh the page.";

/// Icon keyed by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityIcon {
    Info,
    AlertTriangle,
    AlertCircle,
    XCircle,
}

impl SeverityIcon {
    pub fn for_severity(severity: Severity) -> Self {
        match severity {
            Severity::Info => Self::Info,
            Severity::Warning => Self::AlertTriangle,
            Severity::Error => Self::AlertCircle,
            Severity::Critical => Self::XCircle,
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Info => "i",
            Self::AlertTriangle => "!",
            Self::AlertCircle => "x",
            Self::XCircle => "X",
        }
    }
}

/// Color family used for a severity.
pub fn severity_tone(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "blue",
        Severity::Warning => "yellow",
        Severity::Error => "red",
        Severity::Critical => "purple",
    }
}

/// Inputs that shape a view besides the error itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOptions {
    pub show_icon: bool,
    /// Whether the caller supplied a retry action at all
    pub retry_enabled: bool,
    pub retry_count: u32,
    pub max_retries: u32,
    pub show_report: bool,
    pub show_technical_details: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_icon: true,
            retry_enabled: false,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            show_report: false,
            show_technical_details: false,
        }
    }
}

impl DisplayOptions {
    pub fn from_settings(settings: &PresentationSettings) -> Self {
        Self {
            show_report: settings.show_report,
            show_technical_details: settings.show_technical_details,
            ..Self::default()
        }
    }

    fn can_retry(&self) -> bool {
        self.retry_enabled && self.retry_count < self.max_retries
    }
}

/// Development-only diagnostic panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalDetails {
    pub code: String,
    pub category: String,
    pub severity: String,
    /// Pretty-printed metadata, if the error carries any
    pub metadata: Option<String>,
}

/// What to show for one structured error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureView {
    pub icon: Option<SeverityIcon>,
    pub tone: &'static str,
    pub ui_state: UiState,
    pub message: String,
    /// Guidance shown under the message for recoverable errors
    pub hint: Option<String>,
    /// "Retry attempt n of m" once a retry has happened
    pub retry_indicator: Option<String>,
    pub retry_available: bool,
    pub report_available: bool,
    pub technical_details: Option<TechnicalDetails>,
}

impl FailureView {
    /// View for `error`, or `None` when there is nothing to show.
    pub fn render(error: Option<&StructuredError>, options: &DisplayOptions) -> Option<Self> {
        error.map(|error| Self::for_error(error, options))
    }

    pub fn for_error(error: &StructuredError, options: &DisplayOptions) -> Self {
        let can_retry = options.can_retry();

        let hint = error.is_recoverable().then(|| {
            if can_retry {
                HINT_CAN_RETRY.to_string()
            } else {
                HINT_RETRIES_EXHAUSTED.to_string()
            }
        });

        let retry_indicator = (options.retry_count > 0).then(|| {
            format!(
                "Retry attempt {} of {}",
                options.retry_count, options.max_retries
            )
        });

        let technical_details = options
            .show_technical_details
            .then(|| technical_details(error));

        Self {
            icon: options
                .show_icon
                .then(|| SeverityIcon::for_severity(error.severity())),
            tone: severity_tone(error.severity()),
            ui_state: error.ui_state(),
            message: error.user_message().to_string(),
            hint,
            retry_indicator,
            retry_available: error.is_recoverable() && can_retry,
            report_available: options.show_report && error.is_critical(),
            technical_details,
        }
    }
}

fn technical_details(error: &StructuredError) -> TechnicalDetails {
    let metadata = error.metadata().map(|metadata| {
        serde_json::to_string_pretty(metadata)
            .unwrap_or_else(|e| format!("<unserializable metadata: {e}>"))
    });

    TechnicalDetails {
        code: error.code().to_string(),
        category: error.category().to_string(),
        severity: error.severity().to_string(),
        metadata,
    }
}

impl fmt::Display for FailureView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.icon {
            Some(icon) => writeln!(f, "[{}] {}", icon.glyph(), self.message)?,
            None => writeln!(f, "{}", self.message)?,
        }
        if let Some(hint) = &self.hint {
            writeln!(f, "  {hint}")?;
        }
        if let Some(indicator) = &self.retry_indicator {
            writeln!(f, "  {indicator}")?;
        }

        let mut actions = Vec::new();
        if self.retry_available {
            actions.push("[Try Again]");
        }
        if self.report_available {
            actions.push("[Report Issue]");
        }
        if !actions.is_empty() {
            writeln!(f, "  {}", actions.join(" "))?;
        }

        if let Some(details) = &self.technical_details {
            writeln!(f, "  Technical Details")?;
            writeln!(f, "    Code: {}", details.code)?;
            writeln!(f, "    Category: {}", details.category)?;
            writeln!(f, "    Severity: {}", details.severity)?;
            if let Some(metadata) = &details.metadata {
                writeln!(f, "    Metadata: {metadata}")?;
            }
        }
        Ok(())
    }
}

/// Report action behind the "Report Issue" button.
///
/// Returns `None` when the view does not offer reporting.
pub fn press_report(view: &FailureView, error: &StructuredError) -> Option<ReportReceipt> {
    view.report_available.then(|| report_issue(error))
}

/// Retry control that disables itself while a retry is in flight.
#[derive(Debug, Default)]
pub struct RetryButton {
    in_flight: AtomicBool,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl RetryButton {
    pub fn is_disabled(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn label(&self) -> &'static str {
        if self.is_disabled() {
            "Retrying..."
        } else {
            "Try Again"
        }
    }

    /// Run `on_retry` unless a previous press is still in flight.
    ///
    /// Returns whether the callback ran.
    pub async fn press<F, Fut>(&self, on_retry: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return false;
        }
        let _in_flight = InFlight(&self.in_flight);
        on_retry().await;
        true
    }
}
