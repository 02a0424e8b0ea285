//! Test helper utilities for interview-resilience integration tests
//!
//! This module provides reusable fixtures shared across integration test files.
//!
//! IMPORTANT: These helpers are test-only and should NEVER be used in production code.

// Allow dead code in test utilities - functions are used across different test files
#![allow(dead_code)]

use interview_resilience::{
    ErrorHandler, HandlerConfig, ReportingSettings, ResilienceConfig, StructuredError,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Collects errors seen by an `on_error` hook, like a toast layer would.
#[derive(Clone, Default)]
pub struct ToastLog {
    shown: Arc<Mutex<Vec<String>>>,
}

impl ToastLog {
    pub fn hook(&self) -> impl Fn(&StructuredError) + Send + Sync + 'static {
        let shown = Arc::clone(&self.shown);
        move |error: &StructuredError| {
            shown
                .lock()
                .expect("toast log lock")
                .push(error.code().to_string());
        }
    }

    pub fn codes(&self) -> Vec<String> {
        self.shown.lock().expect("toast log lock").clone()
    }
}

/// Handler with logging disabled and an `on_error` hook feeding `toasts`.
pub fn create_test_handler(toasts: &ToastLog) -> Arc<ErrorHandler> {
    let config = HandlerConfig {
        log_errors: false,
        ..HandlerConfig::default()
    }
    .with_on_error(toasts.hook());
    Arc::new(ErrorHandler::new(config))
}

/// Configuration posting critical errors to `endpoint`.
pub fn create_reporting_config(endpoint: &str) -> ResilienceConfig {
    ResilienceConfig {
        reporting: Some(ReportingSettings {
            endpoint: endpoint.to_string(),
            timeout: Duration::from_secs(2),
        }),
        ..ResilienceConfig::default()
    }
}
