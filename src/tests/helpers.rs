//! Test helper utilities shared across unit test modules.
//!
//! IMPORTANT: These helpers are test-only and should NEVER be used in production code.

// Allow dead code in test utilities - helpers are used across different test files
#![allow(dead_code)]

use crate::core_types::StructuredError;
use crate::error::ReportError;
use crate::handler::{ErrorHandler, HandlerConfig};
use crate::reporting::ReportSink;

use async_trait::async_trait;
use mockall::mock;
use parking_lot::Mutex;
use std::sync::Arc;

mock! {
    pub Sink {}

    #[async_trait]
    impl ReportSink for Sink {
        async fn report(&self, error: StructuredError) -> Result<(), ReportError>;
    }
}

/// Collects every error passed to an `on_error` style hook.
#[derive(Clone, Default)]
pub struct HookRecorder {
    seen: Arc<Mutex<Vec<StructuredError>>>,
}

impl HookRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hook(&self) -> impl Fn(&StructuredError) + Send + Sync + 'static {
        let seen = Arc::clone(&self.seen);
        move |error: &StructuredError| seen.lock().push(error.clone())
    }

    pub fn count(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn codes(&self) -> Vec<String> {
        self.seen
            .lock()
            .iter()
            .map(|error| error.code().to_string())
            .collect()
    }

    pub fn last(&self) -> Option<StructuredError> {
        self.seen.lock().last().cloned()
    }
}

/// Handler with logging disabled and no hooks.
pub fn quiet_config() -> HandlerConfig {
    HandlerConfig {
        log_errors: false,
        ..HandlerConfig::default()
    }
}

pub fn quiet_handler() -> ErrorHandler {
    ErrorHandler::new(quiet_config())
}

/// Shared handler whose `on_error` hook feeds `recorder`.
pub fn recording_handler(recorder: &HookRecorder) -> Arc<ErrorHandler> {
    Arc::new(ErrorHandler::new(
        quiet_config().with_on_error(recorder.hook()),
    ))
}
