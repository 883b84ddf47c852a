//! Control protocol messages
//!
//! Requests arrive as JSON text frames of the form
//! `{"request_id": "...", "request": {"StartRecording": {...}}}` and each is
//! answered with a [`ControlReply`] on the same connection.

use recmux_media::MuxerConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one recorded track
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordingKey {
    /// Forwarding unit the track belongs to
    pub sfu_id: String,
    /// Session id
    pub session_id: String,
    /// Track id within the session
    pub track_id: String,
}

impl RecordingKey {
    /// Build a key from its parts
    pub fn new(
        sfu_id: impl Into<String>,
        session_id: impl Into<String>,
        track_id: impl Into<String>,
    ) -> Self {
        Self {
            sfu_id: sfu_id.into(),
            session_id: session_id.into(),
            track_id: track_id.into(),
        }
    }
}

impl fmt::Display for RecordingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.sfu_id, self.session_id, self.track_id)
    }
}

/// Output container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RecordingFormat {
    /// WebM with Opus audio and VP8 video
    #[default]
    Webm,
}

/// Audio recording mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AudioMode {
    /// No audio track
    Off,
    /// Single-channel audio track
    Mono,
    /// Two-channel audio track
    #[default]
    Stereo,
}

/// Video recording mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum VideoMode {
    /// No video track
    Off,
    /// VP8 video track
    #[default]
    On,
}

/// Parameters of a recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Container format
    #[serde(default)]
    pub format: RecordingFormat,
    /// Output file path
    pub destination_path: String,
    /// Audio track mode
    #[serde(default)]
    pub audio_mode: AudioMode,
    /// Video track mode
    #[serde(default)]
    pub video_mode: VideoMode,
    /// Write buffer capacity, 0 for the server default
    #[serde(default)]
    pub buffer_size_bytes: u64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            format: RecordingFormat::Webm,
            destination_path: "recording.webm".to_string(),
            audio_mode: AudioMode::Stereo,
            video_mode: VideoMode::On,
            buffer_size_bytes: 0,
        }
    }
}

impl RecordingConfig {
    /// Muxer track configuration for these modes
    pub fn muxer_config(&self) -> MuxerConfig {
        MuxerConfig {
            audio_enabled: self.audio_mode != AudioMode::Off,
            video_enabled: self.video_mode == VideoMode::On,
            audio_channels: if self.audio_mode == AudioMode::Mono { 1 } else { 2 },
        }
    }
}

/// Commands accepted by the control server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlCommand {
    /// Start a generic pipeline element
    StartElement {
        /// Forwarding unit id
        sfu_id: String,
        /// Pipeline the element joins
        pipeline_id: String,
        /// Session id
        session_id: String,
        /// Track id
        track_id: String,
        /// Registered element type
        element_id: String,
        /// Opaque element configuration
        config: Vec<u8>,
    },
    /// Start recording a track
    StartRecording {
        /// Forwarding unit id
        sfu_id: String,
        /// Session id
        session_id: String,
        /// Track id
        track_id: String,
        /// Recording parameters
        config: RecordingConfig,
    },
    /// Stop recording a track
    StopRecording {
        /// Forwarding unit id
        sfu_id: String,
        /// Session id
        session_id: String,
        /// Track id
        track_id: String,
    },
}

impl ControlCommand {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            ControlCommand::StartElement { .. } => "StartElement",
            ControlCommand::StartRecording { .. } => "StartRecording",
            ControlCommand::StopRecording { .. } => "StopRecording",
        }
    }
}

/// Control request envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRequest {
    /// Caller-chosen id echoed in the reply
    pub request_id: String,
    /// Command to run
    pub request: ControlCommand,
}

/// Reply sent for every received frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlReply {
    /// Request received and dispatched
    Ack {
        /// Id of the acknowledged request
        request_id: String,
    },
    /// Frame could not be parsed
    Error {
        /// Error message
        error: String,
        /// Error code for programmatic handling
        error_code: String,
    },
}
