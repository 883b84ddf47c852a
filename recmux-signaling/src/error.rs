//! Error types for the recmux control plane

use recmux_media::MediaError;
use thiserror::Error;

/// Main error type for control requests
#[derive(Error, Debug)]
pub enum SignalingError {
    /// A recording is already running for this track
    #[error("Recording already active: {key}")]
    RecordingAlreadyActive {
        /// Recording key, as `sfu/session/track`
        key: String,
    },

    /// No recording is running for this track
    #[error("Recording not found: {key}")]
    RecordingNotFound {
        /// Recording key, as `sfu/session/track`
        key: String,
    },

    /// No factory is registered for the requested element
    #[error("Unknown element: {element_id}")]
    UnknownElement {
        /// Requested element id
        element_id: String,
    },

    /// A factory could not build an element from its config
    #[error("Element {element_id} failed to start: {reason}")]
    ElementFailed {
        /// Requested element id
        element_id: String,
        /// Reason reported by the factory
        reason: String,
    },

    /// Control message could not be parsed
    #[error("Invalid message: {message}")]
    InvalidMessage {
        /// Invalid message content
        message: String,
        /// Parsing error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Control server failed to bind
    #[error("Failed to start control server on {address}")]
    ServerStartFailed {
        /// Address that failed to bind
        address: std::net::SocketAddr,
        /// Underlying error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Muxer or file error while starting a recording
    #[error(transparent)]
    Media(#[from] MediaError),
}

/// Result type alias for control operations
pub type SignalingResult<T> = Result<T, SignalingError>;

impl SignalingError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> String {
        match self {
            SignalingError::RecordingAlreadyActive { .. } => "RECORDING_ALREADY_ACTIVE".to_string(),
            SignalingError::RecordingNotFound { .. } => "RECORDING_NOT_FOUND".to_string(),
            SignalingError::UnknownElement { .. } => "UNKNOWN_ELEMENT".to_string(),
            SignalingError::ElementFailed { .. } => "ELEMENT_FAILED".to_string(),
            SignalingError::InvalidMessage { .. } => "INVALID_MESSAGE".to_string(),
            SignalingError::ServerStartFailed { .. } => "SERVER_START_FAILED".to_string(),
            SignalingError::Media(_) => "MEDIA_ERROR".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = SignalingError::RecordingNotFound {
            key: "sfu-1/session-1/track-1".to_string(),
        };
        assert_eq!(err.error_code(), "RECORDING_NOT_FOUND");
        assert_eq!(err.to_string(), "Recording not found: sfu-1/session-1/track-1");

        let media: SignalingError = MediaError::InvalidState {
            message: "closed".to_string(),
        }
        .into();
        assert_eq!(media.error_code(), "MEDIA_ERROR");
        assert_eq!(media.to_string(), "Invalid state: closed");
    }

    #[test]
    fn test_invalid_message_keeps_source() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = SignalingError::InvalidMessage {
            message: "{".to_string(),
            source: source.into(),
        };
        assert!(std::error::Error::source(&err).is_some());
    }
}
