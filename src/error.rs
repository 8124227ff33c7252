use std::time::Duration;
use thiserror::Error;

/// Central error type for the Conduit pipeline
#[derive(Error, Debug)]
pub enum ConduitError {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Unknown {kind} type: {name} (registered: {registered})")]
    UnknownType {
        kind: &'static str,
        name: String,
        registered: String,
    },

    #[error("Invalid settings for {unit}: {reason}")]
    InvalidSettings { unit: String, reason: String },

    #[error("Missing required option for {unit}: {option}")]
    MissingOption { unit: String, option: String },

    #[error("Invalid data pattern: {0}")]
    InvalidDataPattern(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ============================================================================
    // Evaluation Errors
    // ============================================================================
    #[error("Processor {unit} failed: {reason}")]
    ProcessorFailed { unit: String, reason: String },

    // ============================================================================
    // Delivery Errors
    // ============================================================================
    #[error("Sink {sink} delivery failed: {reason}")]
    DeliveryFailed { sink: String, reason: String },

    // ============================================================================
    // Run Errors
    // ============================================================================
    #[error("Deadline of {0:?} elapsed before the run completed")]
    DeadlineExceeded(Duration),

    #[error("Signal already raised: {0}")]
    SignalAlreadyRaised(&'static str),

    #[error("Queue closed: {0}")]
    QueueClosed(&'static str),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Stage aborted: {0}")]
    StageAborted(String),

    // ============================================================================
    // Generic/System Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    GenericError(String),
}

impl ConduitError {
    /// Whether this error was raised while building or validating configuration
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ConduitError::UnknownType { .. }
                | ConduitError::InvalidSettings { .. }
                | ConduitError::MissingOption { .. }
                | ConduitError::InvalidDataPattern(_)
                | ConduitError::ConfigError(_)
        )
    }

    pub(crate) fn invalid_settings(unit: impl Into<String>, reason: impl ToString) -> Self {
        ConduitError::InvalidSettings {
            unit: unit.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn missing_option(unit: impl Into<String>, option: impl Into<String>) -> Self {
        ConduitError::MissingOption {
            unit: unit.into(),
            option: option.into(),
        }
    }

    pub(crate) fn processor_failed(unit: impl Into<String>, reason: impl ToString) -> Self {
        ConduitError::ProcessorFailed {
            unit: unit.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn delivery_failed(sink: impl Into<String>, reason: impl ToString) -> Self {
        ConduitError::DeliveryFailed {
            sink: sink.into(),
            reason: reason.to_string(),
        }
    }
}

// Automatic conversion from String (for ad-hoc messages)
impl From<String> for ConduitError {
    fn from(err: String) -> Self {
        ConduitError::GenericError(err)
    }
}

// Automatic conversion from &str
impl From<&str> for ConduitError {
    fn from(err: &str) -> Self {
        ConduitError::GenericError(err.to_string())
    }
}

// Helper type alias for Results
pub type ConduitResult<T> = Result<T, ConduitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConduitError::UnknownType {
            kind: "processor",
            name: "frobnicate".to_string(),
            registered: "copy, math".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown processor type: frobnicate (registered: copy, math)"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ConduitError = io_err.into();
        assert!(matches!(err, ConduitError::Io(_)));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_configuration_grouping() {
        assert!(ConduitError::missing_option("math", "operation").is_configuration());
        assert!(ConduitError::InvalidDataPattern("a.b".into()).is_configuration());
        assert!(!ConduitError::processor_failed("math", "division by zero").is_configuration());
        assert!(!ConduitError::Cancelled.is_configuration());
    }

    #[test]
    fn test_deadline_message() {
        let err = ConduitError::DeadlineExceeded(Duration::from_millis(50));
        assert!(err.to_string().contains("50ms"));
    }
}
