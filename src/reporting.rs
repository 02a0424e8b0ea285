//! Reporting sinks for critical errors.
//!
//! The handler forwards only [`Severity::Critical`](crate::Severity::Critical)
//! errors to a [`ReportSink`], on a spawned task. Sink failures are logged by
//! the handler and never reach the code that raised the error.
//!
//! Two implementations ship with the crate:
//! - [`FnReportSink`] adapts an async closure (see [`report_fn`])
//! - [`WebhookReportSink`] posts the error as JSON to an HTTP endpoint

use crate::core_types::StructuredError;
use crate::error::ReportError;
use crate::logging::{log_debug, log_info};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

/// External collaborator that receives critical errors for investigation.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn report(&self, error: StructuredError) -> Result<(), ReportError>;
}

/// [`ReportSink`] backed by an async closure.
pub struct FnReportSink<F> {
    f: F,
}

impl<F> fmt::Debug for FnReportSink<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnReportSink").finish_non_exhaustive()
    }
}

/// Wrap an async closure as a reporting sink.
///
/// ```rust
/// use interview_resilience::reporting::report_fn;
///
/// let sink = report_fn(|error| async move {
///     eprintln!("critical: {}", error.code());
///     Ok::<(), interview_resilience::ReportError>(())
/// });
/// # let _ = sink;
/// ```
pub fn report_fn<F, Fut>(f: F) -> FnReportSink<F>
where
    F: Fn(StructuredError) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ReportError>> + Send,
{
    FnReportSink { f }
}

#[async_trait]
impl<F, Fut> ReportSink for FnReportSink<F>
where
    F: Fn(StructuredError) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ReportError>> + Send,
{
    async fn report(&self, error: StructuredError) -> Result<(), ReportError> {
        (self.f)(error).await
    }
}

/// JSON body sent by [`WebhookReportSink`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport<'a> {
    #[serde(flatten)]
    pub error: &'a StructuredError,
    /// Display text of the original cause, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl<'a> ErrorReport<'a> {
    pub fn new(error: &'a StructuredError) -> Self {
        Self {
            error,
            cause: error.original_cause().map(|cause| format!("{cause:#}")),
        }
    }
}

/// Posts critical errors to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct WebhookReportSink {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookReportSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ReportSink for WebhookReportSink {
    async fn report(&self, error: StructuredError) -> Result<(), ReportError> {
        let body = ErrorReport::new(&error);
        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::rejected(status.as_u16()));
        }

        log_debug!(
            error_code = %error.code(),
            endpoint = %self.endpoint,
            "Critical error delivered to reporting endpoint"
        );
        Ok(())
    }
}

/// Acknowledgement for a user-triggered "report issue" action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportReceipt {
    pub id: Uuid,
}

/// User-triggered report action.
///
/// Records the report in the diagnostic log and returns a receipt the user
/// can quote; delivery to a sink is left to the handler's critical path.
pub fn report_issue(error: &StructuredError) -> ReportReceipt {
    let receipt = ReportReceipt { id: Uuid::new_v4() };
    log_info!(
        report_id = %receipt.id,
        error_code = %error.code(),
        category = %error.category(),
        severity = %error.severity(),
        "User reported error"
    );
    receipt
}
