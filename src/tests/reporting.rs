use crate::core_types::metadata;
use crate::error::ReportError;
use crate::factory::build_error;
use crate::handler::{ErrorHandler, HandlerConfig};
use crate::registry::codes;
use crate::reporting::{report_fn, report_issue, ErrorReport, ReportSink, WebhookReportSink};
use anyhow::anyhow;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closure_sink_receives_critical_errors() {
        // Arrange
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink_received = Arc::clone(&received);
        let sink = report_fn(move |error| {
            let received = Arc::clone(&sink_received);
            async move {
                received.lock().push(error.code().to_string());
                Ok::<(), ReportError>(())
            }
        });
        let handler = ErrorHandler::new(HandlerConfig {
            log_errors: false,
            ..HandlerConfig::default()
        }
        .with_report_sink(sink));

        // Act
        let critical = handler.create_error(codes::STREAM_TOKEN_INVALID, None, None);
        let regular = handler.create_error(codes::DATA_QUERY_FAILED, None, None);
        handler.handle(&critical);
        handler.handle(&regular);
        handler.flush_reports().await;

        // Assert
        assert_eq!(*received.lock(), vec![codes::STREAM_TOKEN_INVALID.to_string()]);
    }

    #[tokio::test]
    async fn test_closure_sink_propagates_its_error() {
        let sink = report_fn(|_| async { Err::<(), _>(ReportError::failed("disk full")) });

        let result = sink
            .report(build_error(codes::STREAM_TOKEN_INVALID, None, None))
            .await;

        assert!(matches!(result, Err(ReportError::Failed { .. })));
    }

    #[test]
    fn test_error_report_body_includes_cause_text() {
        // Arrange
        let error = build_error(
            codes::STREAM_TOKEN_INVALID,
            Some(anyhow!("signature mismatch").context("token rejected")),
            Some(metadata(json!({ "userId": "user_1" }))),
        );

        // Act
        let body = serde_json::to_value(ErrorReport::new(&error)).expect("report serializes");

        // Assert
        assert_eq!(body["code"], "STREAM_TOKEN_INVALID");
        assert_eq!(body["severity"], "critical");
        assert_eq!(body["metadata"]["userId"], "user_1");
        assert_eq!(body["cause"], "token rejected: signature mismatch");
    }

    #[test]
    fn test_report_issue_issues_unique_receipts() {
        let error = build_error(codes::STREAM_TOKEN_INVALID, None, None);

        let first = report_issue(&error);
        let second = report_issue(&error);

        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_webhook_sink_keeps_endpoint() {
        let sink = WebhookReportSink::new("https://errors.example.com/ingest", Duration::from_secs(1))
            .expect("client builds");

        assert_eq!(sink.endpoint(), "https://errors.example.com/ingest");
    }
}
