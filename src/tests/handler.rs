use super::helpers::{quiet_config, quiet_handler, recording_handler, HookRecorder, MockSink};
use crate::config::{ReportingSettings, ResilienceConfig};
use crate::core_types::{metadata, Failure, Severity};
use crate::error::ReportError;
use crate::handler::{ErrorHandler, HandlerConfig};
use crate::registry::codes;
use anyhow::anyhow;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
mod tests {
    use super::*;

    // Unit Tests for ErrorHandler
    //
    // UNIT UNDER TEST: ErrorHandler (explicit process-wide service)
    //
    // BUSINESS RESPONSIBILITY:
    //   - Creates structured errors and keeps a bounded history
    //   - Logs, notifies the on_error hook and reports critical errors
    //   - Normalizes failed async operations through wrap()
    //   - Classifies failures of unknown shape
    //
    // TEST COVERAGE:
    //   - History bound and ordering
    //   - Reporting gating by severity
    //   - Wrapper re-throw shape and single handling
    //   - Configuration replacement and hook re-entrancy

    #[test]
    fn test_history_bound_keeps_most_recent_calls() {
        // Arrange
        let handler = ErrorHandler::new(HandlerConfig {
            max_history_size: 3,
            ..quiet_config()
        });

        // Act
        for n in 0..7 {
            handler.create_error(codes::NETWORK_TIMEOUT, None, Some(metadata(json!({ "n": n }))));
        }

        // Assert
        let history = handler.history();
        assert_eq!(history.len(), 3);
        let ns: Vec<i64> = history
            .iter()
            .filter_map(|error| error.metadata()?.get("n")?.as_i64())
            .collect();
        assert_eq!(ns, vec![4, 5, 6], "Most recent calls retained in call order");
    }

    #[test]
    fn test_create_error_records_history_and_clear_empties_it() {
        let handler = quiet_handler();

        handler.create_error(codes::AUTH_FORBIDDEN, None, None);
        assert_eq!(handler.history().len(), 1);

        handler.clear_history();
        assert!(handler.history().is_empty());
    }

    #[tokio::test]
    async fn test_only_critical_errors_reach_the_sink() {
        // Arrange
        let mut sink = MockSink::new();
        sink.expect_report()
            .withf(|error| error.code() == codes::STREAM_TOKEN_INVALID)
            .times(1)
            .returning(|_| Ok(()));
        let handler = ErrorHandler::new(quiet_config().with_report_sink(sink));

        // Act
        for code in [
            codes::VALIDATION_REQUIRED_FIELD,
            codes::NETWORK_TIMEOUT,
            codes::NETWORK_SERVER_ERROR,
            codes::STREAM_TOKEN_INVALID,
        ] {
            let error = handler.create_error(code, None, None);
            handler.handle(&error);
        }
        handler.flush_reports().await;

        // Assert: mock verifies exactly one critical report on drop
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        // Arrange
        let mut sink = MockSink::new();
        sink.expect_report()
            .times(1)
            .returning(|_| Err(ReportError::failed("collector unavailable")));
        let recorder = HookRecorder::new();
        let handler = ErrorHandler::new(
            quiet_config()
                .with_report_sink(sink)
                .with_on_error(recorder.hook()),
        );

        // Act
        let error = handler.create_error(codes::STREAM_TOKEN_INVALID, None, None);
        handler.handle(&error);
        handler.flush_reports().await;

        // Assert
        assert_eq!(recorder.count(), 1, "Hook still ran despite sink failure");
    }

    #[test]
    fn test_critical_error_without_runtime_is_not_reported() {
        // Arrange
        let mut sink = MockSink::new();
        sink.expect_report().times(0);
        let handler = ErrorHandler::new(quiet_config().with_report_sink(sink));

        // Act
        let error = handler.create_error(codes::STREAM_TOKEN_INVALID, None, None);
        handler.handle(&error);

        // Assert: no panic, mock verifies no report
        assert!(error.is_critical());
    }

    #[tokio::test]
    async fn test_wrap_returns_structured_error_and_handles_once() {
        // Arrange
        let recorder = HookRecorder::new();
        let handler = recording_handler(&recorder);

        // Act
        let result: Result<(), _> = handler
            .wrap(
                || async { Err(anyhow!("boom")) },
                codes::CONVEX_MUTATION_FAILED,
                None,
            )
            .await;

        // Assert
        let error = result.expect_err("wrapped operation fails");
        assert_eq!(error.code(), codes::CONVEX_MUTATION_FAILED);
        assert_eq!(
            error.original_cause().map(ToString::to_string).as_deref(),
            Some("boom")
        );
        assert_eq!(recorder.count(), 1, "handle invoked exactly once");
        assert_eq!(handler.history().len(), 1);
    }

    #[tokio::test]
    async fn test_wrap_passes_success_through_untouched() {
        let recorder = HookRecorder::new();
        let handler = recording_handler(&recorder);

        let result = handler
            .wrap(|| async { Ok::<_, anyhow::Error>(42) }, codes::DATA_QUERY_FAILED, None)
            .await;

        assert_eq!(result.ok(), Some(42));
        assert_eq!(recorder.count(), 0);
        assert!(handler.history().is_empty());
    }

    #[tokio::test]
    async fn test_wrap_accepts_std_errors() {
        let handler = quiet_handler();

        let result: Result<(), _> = handler
            .wrap(
                || async { Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out")) },
                codes::NETWORK_TIMEOUT,
                None,
            )
            .await;

        assert_eq!(result.map_err(|e| e.message().to_string()), Err("read timed out".to_string()));
    }

    #[tokio::test]
    async fn test_network_timeout_end_to_end() {
        // Arrange
        let mut sink = MockSink::new();
        sink.expect_report().times(0);
        let recorder = HookRecorder::new();
        let handler = ErrorHandler::new(
            quiet_config()
                .with_report_sink(sink)
                .with_on_error(recorder.hook()),
        );

        // Act
        let result: Result<Vec<String>, _> = handler
            .wrap(
                || async { Err(anyhow!("network timeout")) },
                codes::NETWORK_TIMEOUT,
                Some(metadata(json!({ "op": "fetchInterviews" }))),
            )
            .await;
        handler.flush_reports().await;

        // Assert
        let error = result.expect_err("operation rejected");
        assert_eq!(error.code(), codes::NETWORK_TIMEOUT);
        assert_eq!(error.severity(), Severity::Warning);
        assert!(error.is_recoverable());
        assert_eq!(
            error.metadata().cloned(),
            Some(metadata(json!({ "op": "fetchInterviews" })))
        );
        assert_eq!(handler.history().len(), 1);
        assert_eq!(recorder.count(), 1);
    }

    #[test]
    fn test_categorize_error_routes_by_keywords() {
        let handler = quiet_handler();

        assert_eq!(
            handler.categorize_error(anyhow!("Network request failed")).code(),
            codes::NETWORK_SERVER_ERROR
        );
        assert_eq!(
            handler.categorize_error(anyhow!("403 forbidden")).code(),
            codes::AUTH_FORBIDDEN
        );
        assert_eq!(
            handler.categorize_error(Failure::value("not an Error instance")).code(),
            codes::UNKNOWN_ERROR
        );
        assert_eq!(handler.history().len(), 3, "Each categorization is recorded");
    }

    #[test]
    fn test_categorize_structured_error_passes_through() {
        // Arrange
        let handler = quiet_handler();
        let original = handler.create_error(codes::AUTH_SESSION_EXPIRED, None, None);

        // Act
        let categorized = handler.categorize_error_with(
            original.clone(),
            Some(metadata(json!({ "componentStack": "in Room" }))),
        );

        // Assert
        assert_eq!(categorized.code(), codes::AUTH_SESSION_EXPIRED);
        assert_eq!(categorized.timestamp(), original.timestamp());
        assert_eq!(
            categorized.metadata().and_then(|m| m.get("componentStack")).cloned(),
            Some(json!("in Room"))
        );
        assert_eq!(handler.history().len(), 1, "No duplicate history entry");
    }

    #[test]
    fn test_handle_unknown_classifies_and_notifies() {
        let recorder = HookRecorder::new();
        let handler = recording_handler(&recorder);

        let error = handler.handle_unknown(anyhow!("Unauthorized"));

        assert_eq!(error.code(), codes::AUTH_UNAUTHORIZED);
        assert_eq!(recorder.codes(), vec![codes::AUTH_UNAUTHORIZED.to_string()]);
    }

    #[test]
    fn test_configure_replaces_hook_and_capacity() {
        // Arrange
        let handler = quiet_handler();
        for _ in 0..5 {
            handler.create_error(codes::NETWORK_OFFLINE, None, None);
        }
        let recorder = HookRecorder::new();

        // Act
        handler.configure(HandlerConfig {
            max_history_size: 2,
            ..quiet_config().with_on_error(recorder.hook())
        });
        let error = handler.create_error(codes::NETWORK_OFFLINE, None, None);
        handler.handle(&error);

        // Assert
        assert_eq!(handler.history().len(), 2);
        assert_eq!(handler.config().max_history_size, 2);
        assert_eq!(recorder.count(), 1);
    }

    #[test]
    fn test_hook_can_reenter_handler() {
        // Arrange
        let handler = Arc::new(quiet_handler());
        let weak = Arc::downgrade(&handler);
        handler.set_on_error(move |_| {
            if let Some(handler) = weak.upgrade() {
                let _ = handler.history();
                let _ = handler.config();
            }
        });

        // Act
        let error = handler.create_error(codes::DATA_QUERY_FAILED, None, None);
        handler.handle(&error);

        // Assert: reaching this point means no deadlock
        assert_eq!(handler.history().len(), 1);
    }

    #[test]
    fn test_from_config_wires_webhook_sink() {
        // Arrange
        let settings = ResilienceConfig {
            reporting: Some(ReportingSettings {
                endpoint: "http://127.0.0.1:9/report".to_string(),
                timeout: Duration::from_millis(250),
            }),
            ..ResilienceConfig::default()
        };

        // Act
        let handler = ErrorHandler::from_config(&settings).expect("valid settings");

        // Assert
        assert!(handler.config().report_to_service.is_some());
        assert!(handler.config().log_errors);
    }

    #[test]
    fn test_from_config_rejects_invalid_settings() {
        let mut settings = ResilienceConfig::default();
        settings.handler.max_history_size = 0;

        assert!(ErrorHandler::from_config(&settings).is_err());
    }
}
