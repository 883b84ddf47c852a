//! Sample representation passed between pipeline elements

use bytes::Bytes;

/// Payload carried by a sample, tagged by media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamplePayload {
    /// Encoded VP8 frame
    Video(Bytes),
    /// Encoded Opus packet
    Audio(Bytes),
    /// Opaque bytes, e.g. serialized container output
    Binary(Bytes),
    /// Any media type this pipeline does not interpret
    Other {
        /// Upstream type tag
        kind: u32,
        /// Raw payload
        data: Bytes,
    },
}

/// Media type of a sample, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleKind {
    /// VP8 video
    Video,
    /// Opus audio
    Audio,
    /// Opaque binary data
    Binary,
    /// Uninterpreted type tag
    Other(u32),
}

/// A unit of media forwarded through the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Capture-clock timestamp (90 kHz for video, 48 kHz for audio), wraps at 2^32
    pub timestamp: u32,
    /// Tagged payload
    pub payload: SamplePayload,
}

impl Sample {
    /// Create a video sample
    pub fn video(timestamp: u32, data: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            payload: SamplePayload::Video(data.into()),
        }
    }

    /// Create an audio sample
    pub fn audio(timestamp: u32, data: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            payload: SamplePayload::Audio(data.into()),
        }
    }

    /// Create a binary sample. Binary samples carry no meaningful timestamp.
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self {
            timestamp: 0,
            payload: SamplePayload::Binary(data.into()),
        }
    }

    /// Media type of this sample
    pub fn kind(&self) -> SampleKind {
        match &self.payload {
            SamplePayload::Video(_) => SampleKind::Video,
            SamplePayload::Audio(_) => SampleKind::Audio,
            SamplePayload::Binary(_) => SampleKind::Binary,
            SamplePayload::Other { kind, .. } => SampleKind::Other(*kind),
        }
    }

    /// Payload bytes regardless of media type
    pub fn data(&self) -> &Bytes {
        match &self.payload {
            SamplePayload::Video(data)
            | SamplePayload::Audio(data)
            | SamplePayload::Binary(data)
            | SamplePayload::Other { data, .. } => data,
        }
    }
}
