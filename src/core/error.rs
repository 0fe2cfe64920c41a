//! Error types for the glt library.

use thiserror::Error;

/// Result type alias using glt's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building analytics.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (snapshot input or report output).
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The fetcher could not materialize data a project cannot be analyzed without.
    #[error("Project {project} failed during {stage}: {message}")]
    ProjectFetch {
        project: String,
        stage: String,
        message: String,
    },

    /// Timestamp could not be parsed.
    #[error("Invalid timestamp {value:?}: {message}")]
    Timestamp { value: String, message: String },

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Threshold violation (for CI/CD integration).
    #[error("Threshold violation: {message}")]
    ThresholdViolation { message: String, score: f64 },
}

impl Error {
    /// Create a new config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a project fetch error.
    pub fn project_fetch(
        project: impl Into<String>,
        stage: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ProjectFetch {
            project: project.into(),
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create a timestamp parse error.
    pub fn timestamp(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Timestamp {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Create a threshold violation error.
    pub fn threshold_violation(message: impl Into<String>, score: f64) -> Self {
        Self::ThresholdViolation {
            message: message.into(),
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("analysis.days must be positive");
        assert_eq!(
            err.to_string(),
            "Configuration error: analysis.days must be positive"
        );

        let err = Error::project_fetch("billing", "branches", "503 Service Unavailable");
        assert_eq!(
            err.to_string(),
            "Project billing failed during branches: 503 Service Unavailable"
        );
    }

    #[test]
    fn test_timestamp_error_quotes_value() {
        let err = Error::timestamp("yesterday", "premature end of input");
        assert_eq!(
            err.to_string(),
            "Invalid timestamp \"yesterday\": premature end of input"
        );
    }

    #[test]
    fn test_threshold_violation() {
        let err = Error::threshold_violation("Score below minimum", 45.0);
        match err {
            Error::ThresholdViolation { message, score } => {
                assert_eq!(message, "Score below minimum");
                assert!((score - 45.0).abs() < f64::EPSILON);
            }
            _ => panic!("Expected ThresholdViolation"),
        }
    }
}
