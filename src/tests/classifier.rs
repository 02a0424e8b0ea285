use crate::classifier::{ClassificationRule, Classifier};
use crate::core_types::Failure;
use crate::factory::build_error;
use crate::registry::codes;
use anyhow::anyhow;

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(message: &str) -> String {
        Classifier::default()
            .classify(&Failure::error(anyhow!("{message}")))
            .to_string()
    }

    // Unit Tests for Classifier
    //
    // UNIT UNDER TEST: Classifier (ordered keyword rule table)
    //
    // BUSINESS RESPONSIBILITY:
    //   - Maps untyped vendor failures onto registry codes
    //   - Case-insensitive substring matching, first rule wins
    //   - Anything without a message falls back to UNKNOWN_ERROR
    //
    // TEST COVERAGE:
    //   - Routing of each default rule
    //   - Rule precedence on messages matching several rules
    //   - Non-error inputs and custom rule tables

    #[test]
    fn test_network_keywords_route_to_server_error() {
        assert_eq!(classify("Network request failed"), codes::NETWORK_SERVER_ERROR);
        assert_eq!(classify("Failed to FETCH"), codes::NETWORK_SERVER_ERROR);
    }

    #[test]
    fn test_auth_keywords_route_to_auth_codes() {
        assert_eq!(classify("403 forbidden"), codes::AUTH_FORBIDDEN);
        assert_eq!(classify("Unauthorized"), codes::AUTH_UNAUTHORIZED);
        assert_eq!(classify("status 401"), codes::AUTH_UNAUTHORIZED);
    }

    #[test]
    fn test_vendor_keywords_route_to_stream_and_data() {
        assert_eq!(classify("Video call dropped"), codes::STREAM_CONNECTION_FAILED);
        assert_eq!(classify("stream client not ready"), codes::STREAM_CONNECTION_FAILED);
        assert_eq!(classify("[CONVEX M(interviews:create)] failed"), codes::DATA_MUTATION_FAILED);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        // "network" precedes "video" in the rule table
        assert_eq!(classify("video network unreachable"), codes::NETWORK_SERVER_ERROR);
        // "unauthorized" precedes "forbidden"
        assert_eq!(classify("forbidden: unauthorized"), codes::AUTH_UNAUTHORIZED);
    }

    #[test]
    fn test_unmatched_message_is_unknown() {
        assert_eq!(classify("something odd happened"), codes::UNKNOWN_ERROR);
    }

    #[test]
    fn test_non_error_value_is_unknown_even_with_keywords() {
        // Arrange
        let classifier = Classifier::default();
        let failure = Failure::value("network is down");

        // Act
        let code = classifier.classify(&failure);

        // Assert
        assert_eq!(code, codes::UNKNOWN_ERROR, "Raw values are never keyword-matched");
    }

    #[test]
    fn test_structured_failure_has_no_message() {
        let failure = Failure::from(build_error(codes::NETWORK_TIMEOUT, None, None));

        assert!(failure.message().is_none());
    }

    #[test]
    fn test_anyhow_wrapping_structured_error_is_unwrapped() {
        // Arrange
        let structured = build_error(codes::AUTH_SESSION_EXPIRED, None, None);

        // Act
        let failure = Failure::error(anyhow::Error::new(structured));

        // Assert
        match failure {
            Failure::Structured(error) => assert_eq!(error.code(), codes::AUTH_SESSION_EXPIRED),
            other => panic!("Expected structured failure, got {other:?}"),
        }
    }

    #[test]
    fn test_panic_payloads() {
        let from_str = Failure::from_panic(&"stream exploded");
        let from_string = Failure::from_panic(&String::from("403 forbidden"));
        let opaque = Failure::from_panic(&42_u32);

        assert_eq!(from_str.message().as_deref(), Some("stream exploded"));
        assert_eq!(from_string.message().as_deref(), Some("403 forbidden"));
        assert!(matches!(opaque, Failure::Value(_)));
    }

    #[test]
    fn test_custom_rules_replace_defaults() {
        // Arrange
        let rules = vec![
            ClassificationRule::keywords(["timed out", "deadline"], codes::NETWORK_TIMEOUT)
                .expect("valid rule"),
        ];
        let classifier = Classifier::new(rules);

        // Act & Assert
        assert_eq!(
            classifier.classify(&Failure::error(anyhow!("Deadline exceeded"))),
            codes::NETWORK_TIMEOUT
        );
        assert_eq!(
            classifier.classify(&Failure::error(anyhow!("network down"))),
            codes::UNKNOWN_ERROR,
            "Default rules are not consulted"
        );
    }

    #[test]
    fn test_keywords_match_literally() {
        let rule = ClassificationRule::keywords(["a.b", "(x)"], codes::UNKNOWN_ERROR)
            .expect("escaped keywords compile");

        assert!(rule.matches("found A.B here"));
        assert!(rule.matches("call (x) failed"));
        assert!(!rule.matches("aXb"), "Dot must not act as a wildcard");
        assert_eq!(rule.keyword_list(), ["a.b".to_string(), "(x)".to_string()]);
    }

    #[test]
    fn test_empty_rule_never_matches() {
        let rule = ClassificationRule::keywords(Vec::<String>::new(), codes::NETWORK_TIMEOUT)
            .expect("empty alternation compiles");

        assert!(!rule.matches("anything"));
    }

    #[test]
    fn test_default_rule_order() {
        let classifier = Classifier::default();
        let codes_in_order: Vec<&str> = classifier
            .rules()
            .iter()
            .map(ClassificationRule::code)
            .collect();

        assert_eq!(
            codes_in_order,
            vec![
                codes::NETWORK_SERVER_ERROR,
                codes::AUTH_UNAUTHORIZED,
                codes::AUTH_FORBIDDEN,
                codes::STREAM_CONNECTION_FAILED,
                codes::DATA_MUTATION_FAILED,
            ]
        );
    }
}
