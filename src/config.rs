use crate::error::ConfigError;
use crate::handler::HandlerConfig;
use crate::history::{DEFAULT_HISTORY_SIZE, MAX_HISTORY_SIZE};
use crate::logging::log_debug;
use crate::reporting::WebhookReportSink;
use crate::retry::{duration_ms, BackoffPolicy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const ENV_LOG_ERRORS: &str = "RESILIENCE_LOG_ERRORS";
pub const ENV_MAX_HISTORY: &str = "RESILIENCE_MAX_HISTORY";
pub const ENV_REPORT_URL: &str = "RESILIENCE_REPORT_URL";
pub const ENV_REPORT_TIMEOUT_MS: &str = "RESILIENCE_REPORT_TIMEOUT_MS";
pub const ENV_DEV_MODE: &str = "RESILIENCE_DEV_MODE";

/// Serializable handler knobs (the hooks are attached in code).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerSettings {
    pub log_errors: bool,
    pub max_history_size: usize,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            log_errors: true,
            max_history_size: DEFAULT_HISTORY_SIZE,
        }
    }
}

/// Where critical errors are posted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportingSettings {
    pub endpoint: String,
    #[serde(with = "duration_ms", default = "default_report_timeout")]
    pub timeout: Duration,
}

fn default_report_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Presentation toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationSettings {
    /// Show the technical details panel (development builds only)
    pub show_technical_details: bool,
    /// Offer "report issue" on critical errors
    pub show_report: bool,
}

impl Default for PresentationSettings {
    fn default() -> Self {
        Self {
            show_technical_details: cfg!(debug_assertions),
            show_report: true,
        }
    }
}

/// Complete configuration of the error pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub handler: HandlerSettings,
    pub boundary: BackoffPolicy,
    pub reporting: Option<ReportingSettings>,
    pub presentation: PresentationSettings,
}

impl ResilienceConfig {
    /// Load configuration from environment variables over the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnparseableEnv`] if a variable is set to a value
    /// of the wrong shape, or any error from [`validate`](Self::validate).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(log_errors) = env_bool(ENV_LOG_ERRORS)? {
            config.handler.log_errors = log_errors;
        }
        if let Ok(raw) = std::env::var(ENV_MAX_HISTORY) {
            config.handler.max_history_size = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::unparseable_env(ENV_MAX_HISTORY, &raw))?;
        }
        if let Ok(endpoint) = std::env::var(ENV_REPORT_URL) {
            let timeout = match std::env::var(ENV_REPORT_TIMEOUT_MS) {
                Ok(raw) => Duration::from_millis(
                    raw.trim()
                        .parse()
                        .map_err(|_| ConfigError::unparseable_env(ENV_REPORT_TIMEOUT_MS, &raw))?,
                ),
                Err(_) => default_report_timeout(),
            };
            config.reporting = Some(ReportingSettings { endpoint, timeout });
        }
        if let Some(dev_mode) = env_bool(ENV_DEV_MODE)? {
            config.presentation.show_technical_details = dev_mode;
        }

        config.validate()?;

        log_debug!(
            log_errors = config.handler.log_errors,
            max_history_size = config.handler.max_history_size,
            has_reporting = config.reporting.is_some(),
            show_technical_details = config.presentation.show_technical_details,
            "Resilience configuration loaded from environment"
        );

        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if:
    /// - `handler.max_history_size` is zero or above [`MAX_HISTORY_SIZE`]
    /// - the backoff curve is degenerate (zero/negative multiplier, initial
    ///   delay above the cap)
    /// - the reporting endpoint is not an http(s) URL or its timeout is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.handler.max_history_size == 0 {
            return Err(ConfigError::invalid_value(
                "handler.max_history_size",
                "must be at least 1",
            ));
        }
        if self.handler.max_history_size > MAX_HISTORY_SIZE {
            return Err(ConfigError::invalid_value(
                "handler.max_history_size",
                format!("must not exceed {MAX_HISTORY_SIZE}"),
            ));
        }

        let backoff = &self.boundary;
        if !(backoff.backoff_multiplier.is_finite() && backoff.backoff_multiplier >= 1.0) {
            return Err(ConfigError::invalid_value(
                "boundary.backoff_multiplier",
                "must be a finite number >= 1.0",
            ));
        }
        if backoff.initial_delay > backoff.max_delay {
            return Err(ConfigError::invalid_value(
                "boundary.initial_delay",
                "must not exceed boundary.max_delay",
            ));
        }

        if let Some(reporting) = &self.reporting {
            let url = reqwest::Url::parse(&reporting.endpoint).map_err(|e| {
                ConfigError::invalid_value("reporting.endpoint", e.to_string())
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::invalid_value(
                    "reporting.endpoint",
                    format!("unsupported scheme '{}'", url.scheme()),
                ));
            }
            if reporting.timeout.is_zero() {
                return Err(ConfigError::invalid_value(
                    "reporting.timeout",
                    "must be greater than zero",
                ));
            }
        }

        Ok(())
    }
}

impl HandlerConfig {
    /// Handler configuration for validated settings, without hooks other than
    /// the configured webhook sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation fails or the HTTP client for the
    /// webhook sink cannot be built.
    pub fn from_settings(settings: &ResilienceConfig) -> Result<Self, ConfigError> {
        settings.validate()?;

        let report_to_service = match &settings.reporting {
            Some(reporting) => {
                let sink = WebhookReportSink::new(reporting.endpoint.clone(), reporting.timeout)
                    .map_err(|e| ConfigError::invalid_value("reporting", e.to_string()))?;
                Some(Arc::new(sink) as Arc<dyn crate::reporting::ReportSink>)
            }
            None => None,
        };

        Ok(Self {
            log_errors: settings.handler.log_errors,
            max_history_size: settings.handler.max_history_size,
            on_error: None,
            report_to_service,
        })
    }
}

fn env_bool(variable: &str) -> Result<Option<bool>, ConfigError> {
    let Ok(raw) = std::env::var(variable) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::unparseable_env(variable, raw)),
    }
}
