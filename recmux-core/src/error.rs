//! Error types for recmux pipeline plumbing

use thiserror::Error;

/// Main error type for pipeline element operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// Element no longer accepts samples
    #[error("Element {element} is closed")]
    ElementClosed {
        /// Element that rejected the sample
        element: String,
    },

    /// A downstream element failed to accept a sample
    #[error("Downstream element {element} failed: {reason}")]
    Downstream {
        /// Downstream element id
        element: String,
        /// Reason reported by the element
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Invalid data error
    #[error("Invalid data: {reason}")]
    InvalidData {
        /// Reason for invalid data
        reason: String,
    },
}

impl CoreError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> String {
        match self {
            CoreError::ElementClosed { .. } => "ELEMENT_CLOSED".to_string(),
            CoreError::Downstream { .. } => "DOWNSTREAM_FAILED".to_string(),
            CoreError::Io { .. } => "IO_ERROR".to_string(),
            CoreError::InvalidData { .. } => "INVALID_DATA".to_string(),
        }
    }
}

/// Result type alias for pipeline operations
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let closed = CoreError::ElementClosed {
            element: "filewriter".to_string(),
        };
        assert_eq!(closed.error_code(), "ELEMENT_CLOSED");
        assert_eq!(closed.to_string(), "Element filewriter is closed");

        let io: CoreError =
            std::io::Error::new(std::io::ErrorKind::WriteZero, "disk full").into();
        assert_eq!(io.error_code(), "IO_ERROR");
    }
}
