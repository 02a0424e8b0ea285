//! Heuristic classification of arbitrary failures.
//!
//! Collaborators (video SDK, backend client, token issuer) fail with untyped,
//! vendor-specific errors. The classifier maps their message text onto a
//! registry code using an ordered, case-insensitive keyword rule table. The
//! first matching rule wins; no match means `UNKNOWN_ERROR`.
//!
//! Keyword matching is a heuristic. A validation message that happens to
//! contain "network" is classified as a network failure. Treat the default
//! rules as configuration and build a [`Classifier`] with your own rules when
//! they do not fit.

use crate::core_types::Failure;
use crate::logging::log_debug;
use crate::registry::codes;
use regex::{Regex, RegexBuilder};

/// One ordered classification rule: any keyword match maps to `code`.
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pattern: Regex,
    keywords: Vec<String>,
    code: String,
}

impl ClassificationRule {
    /// Rule matching any of `keywords` as a case-insensitive substring.
    ///
    /// Keywords are escaped, so they match literally.
    pub fn keywords<I, S>(keywords: I, code: impl Into<String>) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|keyword| keyword.as_ref().to_string())
            .collect();
        let alternation = keywords
            .iter()
            .map(|keyword| regex::escape(keyword))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = RegexBuilder::new(&alternation)
            .case_insensitive(true)
            .build()?;

        Ok(Self {
            pattern,
            keywords,
            code: code.into(),
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn keyword_list(&self) -> &[String] {
        &self.keywords
    }

    pub fn matches(&self, message: &str) -> bool {
        !self.keywords.is_empty() && self.pattern.is_match(message)
    }
}

/// Ordered keyword rule table.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<ClassificationRule>,
}

/// Default keyword table, in evaluation order.
const DEFAULT_RULES: &[(&[&str], &str)] = &[
    (&["fetch", "network"], codes::NETWORK_SERVER_ERROR),
    (&["unauthorized", "401"], codes::AUTH_UNAUTHORIZED),
    (&["forbidden", "403"], codes::AUTH_FORBIDDEN),
    (&["stream", "video"], codes::STREAM_CONNECTION_FAILED),
    (&["convex"], codes::DATA_MUTATION_FAILED),
];

impl Default for Classifier {
    fn default() -> Self {
        let rules = DEFAULT_RULES
            .iter()
            .filter_map(|(keywords, code)| {
                ClassificationRule::keywords(keywords.iter(), *code).ok()
            })
            .collect();
        Self { rules }
    }
}

impl Classifier {
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Registry code for a failure's message, or `UNKNOWN_ERROR`.
    ///
    /// Only [`Failure::Error`] carries a message; raw values never match.
    pub fn classify(&self, failure: &Failure) -> &str {
        let Some(message) = failure.message() else {
            return codes::UNKNOWN_ERROR;
        };

        match self.rules.iter().find(|rule| rule.matches(&message)) {
            Some(rule) => {
                log_debug!(
                    error_code = %rule.code(),
                    "Classified failure by keyword rule"
                );
                rule.code()
            }
            None => codes::UNKNOWN_ERROR,
        }
    }
}
