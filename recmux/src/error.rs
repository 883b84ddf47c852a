//! Top-level error type

use recmux_media::MediaError;
use recmux_signaling::SignalingError;
use thiserror::Error;

/// Errors raised while setting up or running recmux
#[derive(Error, Debug)]
pub enum RecmuxError {
    /// Configuration could not be loaded
    #[error("Invalid configuration: {reason}")]
    Config {
        /// Reason for the failure
        reason: String,
    },

    /// Log filter could not be parsed
    #[error("Logging setup failed: {reason}")]
    Logging {
        /// Reason for the failure
        reason: String,
    },

    /// Control plane error
    #[error(transparent)]
    Signaling(#[from] SignalingError),

    /// Media pipeline error
    #[error(transparent)]
    Media(#[from] MediaError),
}

/// Result type alias for top-level operations
pub type RecmuxResult<T> = Result<T, RecmuxError>;

impl RecmuxError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> String {
        match self {
            RecmuxError::Config { .. } => "CONFIG_ERROR".to_string(),
            RecmuxError::Logging { .. } => "LOGGING_ERROR".to_string(),
            RecmuxError::Signaling(e) => e.error_code(),
            RecmuxError::Media(_) => "MEDIA_ERROR".to_string(),
        }
    }
}
