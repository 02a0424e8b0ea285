//! Failure boundary: supervises a subtree of work and swaps in a fallback
//! when it fails.
//!
//! State machine:
//!
//! ```text
//! Healthy --child fails--> Failed --handle_retry--> RetryPending --delay--> Healthy
//!            Failed --reset() / reset keys change--> Healthy (count cleared)
//! ```
//!
//! Recovery timers run on the tokio runtime and are aborted when the
//! boundary is reset, scheduled again, or dropped.

use crate::config::PresentationSettings;
use crate::core_types::{Failure, Metadata, StructuredError};
use crate::handler::{ErrorHandler, ErrorHook};
use crate::listener::{catch_supervised, Supervised};
use crate::logging::{log_debug, log_info, log_warn};
use crate::presentation::{DisplayOptions, FailureView};
use crate::retry::BackoffPolicy;

use futures_util::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Callback run whenever a boundary returns to the healthy state.
pub type ResetHook = Arc<dyn Fn() + Send + Sync>;

/// Value watched by a boundary; a change while failed resets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResetKey {
    Text(String),
    Number(i64),
}

impl From<&str> for ResetKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ResetKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ResetKey {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<u32> for ResetKey {
    fn from(value: u32) -> Self {
        Self::Number(i64::from(value))
    }
}

/// Construction options for a [`FailureBoundary`].
#[derive(Clone, Default)]
pub struct BoundaryOptions {
    pub policy: BackoffPolicy,
    /// Replaces the standard failure view when set
    pub fallback: Option<String>,
    pub on_error: Option<ErrorHook>,
    pub on_reset: Option<ResetHook>,
    pub presentation: PresentationSettings,
}

impl fmt::Debug for BoundaryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundaryOptions")
            .field("policy", &self.policy)
            .field("fallback", &self.fallback)
            .field("on_error", &self.on_error.is_some())
            .field("on_reset", &self.on_reset.is_some())
            .field("presentation", &self.presentation)
            .finish()
    }
}

impl BoundaryOptions {
    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    pub fn with_on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&StructuredError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    pub fn with_on_reset<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_reset = Some(Arc::new(hook));
        self
    }

    pub fn with_presentation(mut self, presentation: PresentationSettings) -> Self {
        self.presentation = presentation;
        self
    }
}

/// Observable boundary state.
#[derive(Debug, Clone, Default)]
pub struct BoundaryState {
    pub has_error: bool,
    pub error: Option<StructuredError>,
    pub retry_count: u32,
}

/// Outcome of rendering through a boundary.
#[derive(Debug)]
pub enum Rendered<T> {
    /// The supervised child produced its output
    Children(T),
    /// Caller-supplied fallback content
    Fallback(String),
    /// Standard failure view
    Failed(FailureView),
}

impl<T> Rendered<T> {
    pub fn is_children(&self) -> bool {
        matches!(self, Self::Children(_))
    }

    pub fn children(self) -> Option<T> {
        match self {
            Self::Children(value) => Some(value),
            Self::Fallback(_) | Self::Failed(_) => None,
        }
    }

    pub fn failure_view(&self) -> Option<&FailureView> {
        match self {
            Self::Failed(view) => Some(view),
            Self::Children(_) | Self::Fallback(_) => None,
        }
    }
}

struct BoundaryInner {
    path: Vec<String>,
    handler: Arc<ErrorHandler>,
    options: BoundaryOptions,
    state: Mutex<BoundaryState>,
    reset_keys: Mutex<Option<Vec<ResetKey>>>,
    pending_recovery: Mutex<Option<JoinHandle<()>>>,
}

/// Supervisor for one subtree of work.
pub struct FailureBoundary {
    inner: Arc<BoundaryInner>,
}

impl fmt::Debug for FailureBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureBoundary")
            .field("name", &self.name())
            .field("state", &*self.inner.state.lock())
            .field("retry_pending", &self.is_retry_pending())
            .finish()
    }
}

impl FailureBoundary {
    pub fn new(name: impl Into<String>, handler: Arc<ErrorHandler>, options: BoundaryOptions) -> Self {
        Self::with_path(vec![name.into()], handler, options)
    }

    fn with_path(path: Vec<String>, handler: Arc<ErrorHandler>, options: BoundaryOptions) -> Self {
        Self {
            inner: Arc::new(BoundaryInner {
                path,
                handler,
                options,
                state: Mutex::new(BoundaryState::default()),
                reset_keys: Mutex::new(None),
                pending_recovery: Mutex::new(None),
            }),
        }
    }

    /// Boundary for a subtree nested inside this one, sharing its handler.
    pub fn nested(&self, name: impl Into<String>, options: BoundaryOptions) -> Self {
        let mut path = self.inner.path.clone();
        path.push(name.into());
        Self::with_path(path, Arc::clone(&self.inner.handler), options)
    }

    pub fn name(&self) -> &str {
        self.inner.path.last().map(String::as_str).unwrap_or_default()
    }

    /// Component stack, innermost first.
    pub fn component_stack(&self) -> String {
        self.inner.component_stack()
    }

    pub fn state(&self) -> BoundaryState {
        self.inner.state.lock().clone()
    }

    pub fn has_error(&self) -> bool {
        self.inner.state.lock().has_error
    }

    pub fn error(&self) -> Option<StructuredError> {
        self.inner.state.lock().error.clone()
    }

    pub fn retry_count(&self) -> u32 {
        self.inner.state.lock().retry_count
    }

    pub fn max_retries(&self) -> u32 {
        self.inner.options.policy.max_retries
    }

    pub fn is_retry_pending(&self) -> bool {
        self.inner
            .pending_recovery
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Render `child` under supervision.
    ///
    /// While failed the child is not run and the fallback is returned.
    /// A returned error or a panic in the child moves the boundary to
    /// failed.
    pub fn render<T, F>(&self, child: F) -> Rendered<T>
    where
        F: FnOnce() -> anyhow::Result<T>,
    {
        if let Some(fallback) = self.fallback() {
            return fallback;
        }
        let outcome = catch_supervised(child);
        self.settle(outcome)
    }

    /// Apply `keys` (see [`update_reset_keys`](Self::update_reset_keys)),
    /// then [`render`](Self::render).
    pub fn render_with_keys<T, F>(&self, keys: &[ResetKey], child: F) -> Rendered<T>
    where
        F: FnOnce() -> anyhow::Result<T>,
    {
        self.update_reset_keys(keys);
        self.render(child)
    }

    /// Async form of [`render`](Self::render).
    pub async fn render_async<T, Fut>(&self, child: Fut) -> Rendered<T>
    where
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if let Some(fallback) = self.fallback() {
            return fallback;
        }
        let outcome = AssertUnwindSafe(Supervised::new(child))
            .catch_unwind()
            .await;
        self.settle(outcome)
    }

    /// Record the current reset keys.
    ///
    /// When failed and any key differs from the previous value at the same
    /// position, the boundary resets. Returns whether it did.
    pub fn update_reset_keys(&self, keys: &[ResetKey]) -> bool {
        let changed = {
            let mut previous = self.inner.reset_keys.lock();
            let changed = previous.as_ref().is_some_and(|previous| {
                keys.iter()
                    .enumerate()
                    .any(|(index, key)| previous.get(index) != Some(key))
            });
            *previous = Some(keys.to_vec());
            changed
        };

        if changed && self.has_error() {
            log_debug!(boundary = %self.name(), "Reset keys changed, resetting boundary");
            self.reset();
            return true;
        }
        false
    }

    /// Return to healthy, clearing the error and the retry count.
    pub fn reset(&self) {
        self.inner.cancel_pending_recovery();
        *self.inner.state.lock() = BoundaryState::default();
        log_debug!(boundary = %self.name(), "Boundary reset");
        self.inner.notify_reset();
    }

    /// Schedule recovery after the backoff delay for the current attempt.
    ///
    /// Returns `false` without doing anything when the boundary is healthy or
    /// the retry budget is spent. The retry count is kept across the recovery
    /// so the budget holds.
    pub fn handle_retry(&self) -> bool {
        let delay = {
            let mut state = self.inner.state.lock();
            if !state.has_error {
                log_debug!(boundary = %self.name(), "Retry requested while healthy, ignoring");
                return false;
            }
            if !self.inner.options.policy.can_retry(state.retry_count) {
                log_debug!(
                    boundary = %self.name(),
                    retry_count = state.retry_count,
                    "Retry budget exhausted"
                );
                return false;
            }
            let delay = self.inner.options.policy.delay_for(state.retry_count);
            state.retry_count += 1;
            delay
        };

        log_info!(
            boundary = %self.name(),
            attempt = self.retry_count(),
            max_retries = self.max_retries(),
            delay_ms = delay.as_millis() as u64,
            "Scheduling boundary recovery"
        );
        self.schedule_recovery(delay);
        true
    }

    /// View of the current failure, if any.
    pub fn view(&self) -> Option<FailureView> {
        let state = self.inner.state.lock();
        FailureView::render(state.error.as_ref(), &self.display_options(&state))
    }

    fn display_options(&self, state: &BoundaryState) -> DisplayOptions {
        DisplayOptions {
            retry_enabled: state
                .error
                .as_ref()
                .is_some_and(StructuredError::is_recoverable),
            retry_count: state.retry_count,
            max_retries: self.max_retries(),
            ..DisplayOptions::from_settings(&self.inner.options.presentation)
        }
    }

    fn fallback<T>(&self) -> Option<Rendered<T>> {
        let state = self.inner.state.lock();
        if !state.has_error {
            return None;
        }
        let error = state.error.as_ref()?;
        Some(self.failed_output(error, &state))
    }

    fn failed_output<T>(&self, error: &StructuredError, state: &BoundaryState) -> Rendered<T> {
        match &self.inner.options.fallback {
            Some(fallback) => Rendered::Fallback(fallback.clone()),
            None => Rendered::Failed(FailureView::for_error(error, &self.display_options(state))),
        }
    }

    fn settle<T>(&self, outcome: std::thread::Result<anyhow::Result<T>>) -> Rendered<T> {
        let failure = match outcome {
            Ok(Ok(value)) => {
                self.mark_recovered();
                return Rendered::Children(value);
            }
            Ok(Err(error)) => Failure::from(error),
            Err(payload) => Failure::from_panic(payload.as_ref()),
        };
        self.capture(failure)
    }

    fn mark_recovered(&self) {
        let mut state = self.inner.state.lock();
        if state.retry_count > 0 {
            log_debug!(
                boundary = %self.name(),
                retry_count = state.retry_count,
                "Child rendered after retry, clearing retry count"
            );
            state.retry_count = 0;
        }
    }

    fn capture<T>(&self, failure: Failure) -> Rendered<T> {
        let mut context = Metadata::new();
        context.insert(
            "componentStack".to_string(),
            Value::String(self.component_stack()),
        );

        let handler = &self.inner.handler;
        let error = handler.categorize_error_with(failure, Some(context));
        handler.handle(&error);

        let output = {
            let mut state = self.inner.state.lock();
            state.has_error = true;
            state.error = Some(error.clone());
            self.failed_output(&error, &state)
        };

        if let Some(on_error) = &self.inner.options.on_error {
            on_error(&error);
        }
        output
    }

    fn schedule_recovery(&self, delay: Duration) {
        self.inner.cancel_pending_recovery();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log_warn!(
                boundary = %self.name(),
                "No async runtime available, recovering without delay"
            );
            self.inner.recover();
            return;
        };

        let inner: Weak<BoundaryInner> = Arc::downgrade(&self.inner);
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = inner.upgrade() {
                inner.pending_recovery.lock().take();
                inner.recover();
            }
        });
        *self.inner.pending_recovery.lock() = Some(task);
    }
}

impl BoundaryInner {
    fn component_stack(&self) -> String {
        self.path
            .iter()
            .rev()
            .map(|name| format!("\n    in {name}"))
            .collect()
    }

    /// Clear the error but keep the retry count.
    fn recover(&self) {
        {
            let mut state = self.state.lock();
            state.has_error = false;
            state.error = None;
        }
        self.notify_reset();
    }

    fn notify_reset(&self) {
        if let Some(on_reset) = &self.options.on_reset {
            on_reset();
        }
    }

    fn cancel_pending_recovery(&self) {
        if let Some(task) = self.pending_recovery.lock().take() {
            task.abort();
        }
    }
}

impl Drop for FailureBoundary {
    fn drop(&mut self) {
        self.inner.cancel_pending_recovery();
    }
}
