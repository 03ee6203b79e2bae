//! Error types for product compositing operations

use thiserror::Error;

/// Result type alias for product studio operations
pub type Result<T> = std::result::Result<T, StudioError>;

/// Failure classes reported by external collaborators
///
/// The orchestrator matches on these instead of inspecting error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    /// The call did not complete within the configured timeout
    Timeout,
    /// Connection, DNS or transport failure
    Network,
    /// The service answered with a non-success HTTP status
    Status(u16),
    /// The service answered but the payload could not be used
    InvalidResponse,
}

impl std::fmt::Display for UpstreamErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out"),
            Self::Network => write!(f, "network failure"),
            Self::Status(code) => write!(f, "HTTP status {}", code),
            Self::InvalidResponse => write!(f, "invalid response"),
        }
    }
}

/// Error returned by a background remover or generator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct UpstreamError {
    /// What went wrong
    pub kind: UpstreamErrorKind,
    /// Service-specific detail
    pub message: String,
}

impl UpstreamError {
    pub fn new<S: Into<String>>(kind: UpstreamErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::new(UpstreamErrorKind::Timeout, message)
    }

    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::new(UpstreamErrorKind::Network, message)
    }

    pub fn invalid_response<S: Into<String>>(message: S) -> Self {
        Self::new(UpstreamErrorKind::InvalidResponse, message)
    }

    #[must_use]
    pub fn status(code: u16) -> Self {
        Self::new(UpstreamErrorKind::Status(code), "service rejected the request")
    }

    /// Whether the failure was a timeout rather than a completed call
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.kind == UpstreamErrorKind::Timeout
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(error.to_string())
        } else if let Some(status) = error.status() {
            Self::new(UpstreamErrorKind::Status(status.as_u16()), error.to_string())
        } else if error.is_decode() {
            Self::invalid_response(error.to_string())
        } else {
            Self::network(error.to_string())
        }
    }
}

/// External service a pipeline run depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamService {
    /// Background removal (alpha matte extraction)
    BackgroundRemoval,
    /// AI background generation
    BackgroundGeneration,
}

impl std::fmt::Display for UpstreamService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BackgroundRemoval => write!(f, "background removal"),
            Self::BackgroundGeneration => write!(f, "background generation"),
        }
    }
}

/// Comprehensive error types for product compositing operations
#[derive(Error, Debug)]
pub enum StudioError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Input violates a precondition (empty alpha matte, bad parameter, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Background removal or generation failed or timed out
    #[error("{service} unavailable: {source}")]
    UpstreamUnavailable {
        service: UpstreamService,
        #[source]
        source: UpstreamError,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Image processing failures
    #[error("Processing error: {0}")]
    Processing(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StudioError {
    /// Create a new invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Wrap a collaborator failure with the service it came from
    #[must_use]
    pub fn upstream(service: UpstreamService, source: UpstreamError) -> Self {
        Self::UpstreamUnavailable { service, source }
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create parameter error with valid range
    pub fn parameter_out_of_range<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::InvalidInput(format!(
            "{} out of range: {} (valid range: {})",
            parameter, value, valid_range
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// The collaborator failure kind, if this error came from one
    #[must_use]
    pub fn upstream_kind(&self) -> Option<UpstreamErrorKind> {
        match self {
            Self::UpstreamUnavailable { source, .. } => Some(source.kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = StudioError::invalid_input("empty alpha matte");
        assert!(matches!(err, StudioError::InvalidInput(_)));

        let err = StudioError::invalid_config("bad timeout");
        assert!(matches!(err, StudioError::InvalidConfig(_)));
    }

    #[test]
    fn test_error_display() {
        let err = StudioError::invalid_input("cutout is fully transparent");
        assert_eq!(err.to_string(), "Invalid input: cutout is fully transparent");
    }

    #[test]
    fn test_upstream_error_display_and_kind() {
        let err = StudioError::upstream(
            UpstreamService::BackgroundGeneration,
            UpstreamError::timeout("no answer after 120s"),
        );
        assert_eq!(
            err.to_string(),
            "background generation unavailable: timed out: no answer after 120s"
        );
        assert_eq!(err.upstream_kind(), Some(UpstreamErrorKind::Timeout));

        let err = StudioError::upstream(
            UpstreamService::BackgroundRemoval,
            UpstreamError::status(503),
        );
        assert!(err.to_string().contains("HTTP status 503"));
        assert_eq!(err.upstream_kind(), Some(UpstreamErrorKind::Status(503)));

        assert_eq!(StudioError::internal("x").upstream_kind(), None);
    }

    #[test]
    fn test_timeout_is_distinct() {
        assert!(UpstreamError::timeout("slow").is_timeout());
        assert!(!UpstreamError::network("refused").is_timeout());
        assert!(!UpstreamError::invalid_response("empty body").is_timeout());
    }

    #[test]
    fn test_enhanced_error_context() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = StudioError::file_io_error("write composite", Path::new("/out/product.png"), &io_error);
        let error_string = err.to_string();
        assert!(error_string.contains("write composite"));
        assert!(error_string.contains("/out/product.png"));

        let err = StudioError::parameter_out_of_range("shadow opacity", 150, "0-100");
        let error_string = err.to_string();
        assert!(error_string.contains("shadow opacity"));
        assert!(error_string.contains("150"));
        assert!(error_string.contains("0-100"));

        let err = StudioError::config_value_error("brightness", 9.0, "0.0-4.0", Some(1.05));
        let error_string = err.to_string();
        assert!(error_string.contains("brightness"));
        assert!(error_string.contains("Recommended: 1.05"));
    }
}
