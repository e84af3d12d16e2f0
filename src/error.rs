//! Error handling for the posture monitor
//!
//! This module defines custom error types and a Result alias for use
//! throughout the application.

use thiserror::Error;

/// Main error type for posture monitor operations
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Errors raised while establishing or operating a sensor link
    #[error("Connection error: {0}")]
    Connection(String),

    /// Errors from the Bluetooth LE stack
    #[error("Bluetooth error: {0}")]
    Ble(#[from] btleplug::Error),

    /// Errors from the relay WebSocket link
    #[error("Relay error: {0}")]
    Relay(#[from] tokio_tungstenite::tungstenite::Error),

    /// A guarded session transition was attempted from the wrong phase
    #[error("Invalid transition: {action} is not allowed while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
    },

    /// The classifier was invoked without a captured baseline
    #[error("Baseline required: calibrate before requesting feedback")]
    BaselineRequired,

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<MonitorError>,
    },
}

impl MonitorError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        MonitorError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for posture monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MonitorError::Connection("scan timed out".to_string());
        assert_eq!(err.to_string(), "Connection error: scan timed out");
    }

    #[test]
    fn test_error_with_context() {
        let err = MonitorError::Connection("refused".to_string());
        let with_ctx = err.with_context("Failed to reach relay");
        assert!(with_ctx.to_string().contains("Failed to reach relay"));
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = MonitorError::InvalidTransition {
            action: "startMeasurement",
            phase: "Idle",
        };
        assert!(err.to_string().contains("startMeasurement"));
        assert!(err.to_string().contains("Idle"));
    }
}
