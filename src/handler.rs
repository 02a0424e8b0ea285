//! Centralized error handling service.
//!
//! [`ErrorHandler`] is constructed once at process start and shared by
//! reference (usually an `Arc`) with every consumer. It owns:
//! - the configuration (logging toggle, history bound, hooks)
//! - the bounded error history
//! - the classifier used for failures of unknown shape
//!
//! Tests get isolation by constructing a fresh handler each.
//!
//! # Example
//!
//! ```rust,no_run
//! use interview_resilience::{codes, metadata, ErrorHandler, HandlerConfig};
//! use serde_json::json;
//!
//! # async fn example() {
//! let handler = ErrorHandler::new(HandlerConfig::default());
//!
//! let result: Result<(), _> = handler
//!     .wrap(
//!         || async { Err(anyhow::anyhow!("mutation rejected")) },
//!         codes::DATA_MUTATION_FAILED,
//!         Some(metadata(json!({ "interviewId": "int_42" }))),
//!     )
//!     .await;
//!
//! let error = result.unwrap_err();
//! println!("Tell user: {}", error.user_message());
//! # }
//! ```

use crate::classifier::Classifier;
use crate::config::ResilienceConfig;
use crate::core_types::{AppResult, Failure, Metadata, Severity, StructuredError};
use crate::error::ConfigError;
use crate::factory::build_error;
use crate::history::{ErrorHistory, DEFAULT_HISTORY_SIZE};
use crate::listener;
use crate::logging::{log_debug, log_error, log_warn};
use crate::reporting::ReportSink;

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Side effect invoked for every handled error (e.g. showing a toast).
pub type ErrorHook = Arc<dyn Fn(&StructuredError) + Send + Sync>;

/// Runtime configuration of the handler.
#[derive(Clone)]
pub struct HandlerConfig {
    /// Log handled errors to the diagnostic channel
    pub log_errors: bool,
    /// Bound on retained history
    pub max_history_size: usize,
    /// Invoked once per handled error
    pub on_error: Option<ErrorHook>,
    /// Receives critical errors only
    pub report_to_service: Option<Arc<dyn ReportSink>>,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            log_errors: true,
            max_history_size: DEFAULT_HISTORY_SIZE,
            on_error: None,
            report_to_service: None,
        }
    }
}

impl fmt::Debug for HandlerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerConfig")
            .field("log_errors", &self.log_errors)
            .field("max_history_size", &self.max_history_size)
            .field("on_error", &self.on_error.is_some())
            .field("report_to_service", &self.report_to_service.is_some())
            .finish()
    }
}

impl HandlerConfig {
    pub fn with_on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&StructuredError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    pub fn with_report_sink<S>(mut self, sink: S) -> Self
    where
        S: ReportSink + 'static,
    {
        self.report_to_service = Some(Arc::new(sink));
        self
    }
}

/// Process-wide error handling service.
pub struct ErrorHandler {
    config: RwLock<HandlerConfig>,
    history: ErrorHistory,
    classifier: Classifier,
    listeners_attached: AtomicBool,
    pending_reports: Mutex<Vec<JoinHandle<()>>>,
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandler")
            .field("config", &*self.config.read())
            .field("history_len", &self.history.len())
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new(HandlerConfig::default())
    }
}

impl Drop for ErrorHandler {
    fn drop(&mut self) {
        // Swapping panic hooks is not allowed while unwinding
        if !std::thread::panicking() {
            self.detach_global_listeners();
        }
    }
}

impl ErrorHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self::with_classifier(config, Classifier::default())
    }

    /// Handler using a custom keyword rule table.
    pub fn with_classifier(config: HandlerConfig, classifier: Classifier) -> Self {
        let history = ErrorHistory::with_capacity(config.max_history_size);
        Self {
            config: RwLock::new(config),
            history,
            classifier,
            listeners_attached: AtomicBool::new(false),
            pending_reports: Mutex::new(Vec::new()),
        }
    }

    /// Build a handler from loaded settings, wiring the webhook sink if one
    /// is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the settings fail validation or the
    /// reporting client cannot be built.
    pub fn from_config(settings: &ResilienceConfig) -> Result<Self, ConfigError> {
        let config = HandlerConfig::from_settings(settings)?;
        log_debug!(
            log_errors = config.log_errors,
            max_history_size = config.max_history_size,
            has_report_sink = config.report_to_service.is_some(),
            "Error handler configured"
        );
        Ok(Self::new(config))
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> HandlerConfig {
        self.config.read().clone()
    }

    /// Replace the configuration.
    ///
    /// Typically called once after the UI layer mounts to attach a toast
    /// hook. A smaller `max_history_size` evicts the oldest entries.
    pub fn configure(&self, config: HandlerConfig) {
        self.history.set_capacity(config.max_history_size);
        *self.config.write() = config;
    }

    /// Replace only the `on_error` hook.
    pub fn set_on_error<F>(&self, hook: F)
    where
        F: Fn(&StructuredError) + Send + Sync + 'static,
    {
        self.config.write().on_error = Some(Arc::new(hook));
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Create a structured error for `code` and record it in history.
    ///
    /// Never fails: unregistered codes take the `UNKNOWN_ERROR` definition.
    pub fn create_error(
        &self,
        code: &str,
        cause: Option<anyhow::Error>,
        metadata: Option<Metadata>,
    ) -> StructuredError {
        let error = build_error(code, cause, metadata);
        self.history.record(error.clone());
        error
    }

    /// Log, notify, and (for critical errors) report a structured error.
    ///
    /// Reporting happens on a spawned task; sink failures are logged and
    /// never reach the caller.
    pub fn handle(&self, error: &StructuredError) {
        let config = self.config();

        if config.log_errors {
            log_structured(error);
        }

        if let Some(hook) = &config.on_error {
            hook(error);
        }

        if error.is_critical() {
            if let Some(sink) = config.report_to_service {
                self.dispatch_report(sink, error.clone());
            }
        }
    }

    /// Run a fallible async operation, normalizing any failure.
    ///
    /// On failure the error becomes the cause of a structured error for
    /// `code`, is handled once, and is returned in place of the original.
    pub async fn wrap<T, E, F, Fut>(
        &self,
        operation: F,
        code: &str,
        metadata: Option<Metadata>,
    ) -> AppResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<anyhow::Error>,
    {
        match operation().await {
            Ok(value) => Ok(value),
            Err(error) => {
                let structured = self.create_error(code, Some(error.into()), metadata);
                self.handle(&structured);
                Err(structured)
            }
        }
    }

    /// Map a failure of unknown shape onto the taxonomy.
    pub fn categorize_error(&self, failure: impl Into<Failure>) -> StructuredError {
        self.categorize_error_with(failure, None)
    }

    /// Like [`categorize_error`](Self::categorize_error), attaching metadata
    /// to the created error.
    ///
    /// Already-structured failures are returned as they are, with `metadata`
    /// merged in; they were recorded when first created.
    pub fn categorize_error_with(
        &self,
        failure: impl Into<Failure>,
        metadata: Option<Metadata>,
    ) -> StructuredError {
        let failure = failure.into();
        let code = self.classifier.classify(&failure).to_string();

        match failure {
            Failure::Structured(error) => match metadata {
                Some(extra) => error.with_metadata(extra),
                None => error,
            },
            Failure::Error(cause) => self.create_error(&code, Some(cause), metadata),
            Failure::Value(_) => self.create_error(&code, None, metadata),
        }
    }

    /// Categorize and handle a failure in one step.
    pub fn handle_unknown(&self, failure: impl Into<Failure>) -> StructuredError {
        let error = self.categorize_error(failure);
        self.handle(&error);
        error
    }

    /// Route uncaught panics through the classifier and this handler.
    ///
    /// Idempotent. Any panic hook installed before the first attach is kept
    /// and receives panics again once no attached handler is alive.
    pub fn attach_global_listeners(self: &Arc<Self>) {
        if self.listeners_attached.swap(true, Ordering::SeqCst) {
            return;
        }
        listener::attach(self);
        log_debug!("Global failure listeners attached");
    }

    /// Stop receiving uncaught panics. Safe to call when never attached.
    ///
    /// Other attached handlers keep receiving them; the last one to detach
    /// restores the panic hook that was installed before the first attach.
    pub fn detach_global_listeners(&self) {
        if !self.listeners_attached.swap(false, Ordering::SeqCst) {
            return;
        }
        listener::detach(self);
        log_debug!("Global failure listeners detached");
    }

    pub fn global_listeners_attached(&self) -> bool {
        self.listeners_attached.load(Ordering::SeqCst)
    }

    /// Last-resort entry for failures nobody handled.
    ///
    /// With listeners attached the failure is categorized and handled;
    /// otherwise it is only written to the diagnostic log, like a runtime's
    /// default unhandled-rejection output.
    pub fn report_unhandled(&self, failure: impl Into<Failure>) -> Option<StructuredError> {
        let failure = failure.into();
        if self.global_listeners_attached() {
            return Some(self.handle_unknown(failure));
        }

        log_error!(failure = ?failure, "Unhandled failure in detached task");
        None
    }

    /// Spawn a detached task whose failure is routed to
    /// [`report_unhandled`](Self::report_unhandled).
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_guarded<F, E>(self: &Arc<Self>, task: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        let handler = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(error) = task.await {
                handler.report_unhandled(Failure::error(error));
            }
        })
    }

    /// Snapshot of retained errors, oldest first.
    pub fn history(&self) -> Vec<StructuredError> {
        self.history.snapshot()
    }

    pub fn clear_history(&self) {
        self.history.clear();
    }

    /// Wait for in-flight report deliveries to finish.
    pub async fn flush_reports(&self) {
        let tasks = std::mem::take(&mut *self.pending_reports.lock());
        for task in tasks {
            if let Err(join_error) = task.await {
                log_error!(
                    error = %join_error,
                    "Error reporting task terminated abnormally"
                );
            }
        }
    }

    fn dispatch_report(&self, sink: Arc<dyn ReportSink>, error: StructuredError) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log_warn!(
                error_code = %error.code(),
                "No async runtime available, critical error was not reported"
            );
            return;
        };

        let task = runtime.spawn(async move {
            let code = error.code().to_string();
            if let Err(report_error) = sink.report(error).await {
                log_error!(
                    error_code = %code,
                    error = %report_error,
                    "Failed to report error"
                );
            }
        });

        let mut pending = self.pending_reports.lock();
        pending.retain(|task| !task.is_finished());
        pending.push(task);
    }
}

fn log_structured(error: &StructuredError) {
    let metadata = error
        .metadata()
        .map(|metadata| serde_json::Value::Object(metadata.clone()).to_string());
    let cause = error.original_cause().map(|cause| format!("{cause:#}"));

    if error.severity() == Severity::Critical {
        log_error!(
            category = %error.category(),
            error_code = %error.code(),
            technical_message = %error.message(),
            user_message = %error.user_message(),
            severity = %error.severity(),
            recoverable = error.is_recoverable(),
            ui_state = %error.ui_state(),
            metadata = ?metadata,
            cause = ?cause,
            "Handled critical error"
        );
    } else {
        log_warn!(
            category = %error.category(),
            error_code = %error.code(),
            technical_message = %error.message(),
            user_message = %error.user_message(),
            severity = %error.severity(),
            recoverable = error.is_recoverable(),
            ui_state = %error.ui_state(),
            metadata = ?metadata,
            cause = ?cause,
            "Handled error"
        );
    }
}
