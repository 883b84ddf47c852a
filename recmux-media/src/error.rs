//! Media error types and handling
//!
//! Errors produced by the container writer, the disk sink and the muxer.
//! The muxer itself swallows these on the live path and only logs them;
//! they surface to callers of the lower-level components.

use recmux_core::CoreError;
use thiserror::Error;

/// Main error type for media operations
#[derive(Error, Debug)]
pub enum MediaError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Container serialization failed
    #[error("Container error: {reason}")]
    Container {
        /// Failure reason
        reason: String,
    },

    /// Block written to a track writer that was already closed
    #[error("Track {track} is closed")]
    TrackClosed {
        /// Track number
        track: u64,
    },

    /// Invalid state for operation
    #[error("Invalid state: {message}")]
    InvalidState {
        /// State error message
        message: String,
    },

    /// Invalid configuration provided
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// Pipeline error from a downstream element
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias for media operations
pub type MediaResult<T> = Result<T, MediaError>;

impl MediaError {
    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            MediaError::Io { .. } => true,
            MediaError::Core(_) => true,
            MediaError::Container { .. } => false,
            MediaError::TrackClosed { .. } => false,
            MediaError::InvalidState { .. } => false,
            MediaError::InvalidConfiguration { .. } => false,
        }
    }

    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            MediaError::Io { .. } => ErrorCategory::System,
            MediaError::Container { .. } => ErrorCategory::Format,
            MediaError::TrackClosed { .. } => ErrorCategory::State,
            MediaError::InvalidState { .. } => ErrorCategory::State,
            MediaError::InvalidConfiguration { .. } => ErrorCategory::Configuration,
            MediaError::Core(_) => ErrorCategory::Pipeline,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// System-level errors (I/O, permissions, etc.)
    System,
    /// Configuration and parameter errors
    Configuration,
    /// Container format errors
    Format,
    /// State management errors
    State,
    /// Downstream pipeline errors
    Pipeline,
}

impl From<MediaError> for CoreError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Core(inner) => inner,
            MediaError::Io { source } => CoreError::Io { source },
            other => CoreError::InvalidData {
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let io_error = MediaError::Io {
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        assert_eq!(io_error.category(), ErrorCategory::System);
        assert!(io_error.is_recoverable());

        let closed = MediaError::TrackClosed { track: 2 };
        assert_eq!(closed.category(), ErrorCategory::State);
        assert!(!closed.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let error = MediaError::Container {
            reason: "no tracks declared".to_string(),
        };
        assert_eq!(error.to_string(), "Container error: no tracks declared");
    }

    #[test]
    fn test_into_core_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let core: CoreError = MediaError::from(io_error).into();
        assert!(matches!(core, CoreError::Io { .. }));

        let core: CoreError = MediaError::TrackClosed { track: 1 }.into();
        assert_eq!(core.error_code(), "INVALID_DATA");
    }
}
