//! # recmux media
//!
//! WebM recording for recmux: VP8 header inspection, per-track timestamp
//! rebasing, a streaming EBML/WebM container writer, the [`WebmMuxer`]
//! element that ties them together, and a [`FileWriter`] disk sink.

#![warn(clippy::all)]

pub mod container;
pub mod disk;
pub mod error;
pub mod muxer;
pub mod sample_writer;
pub mod timestamp;
pub mod vp8;

// Re-export main types
pub use container::{BlockWriter, ContainerSink, ContainerWriter, TrackEntry, WriterOptions};
pub use disk::{FileWriter, DEFAULT_BUFFER_SIZE};
pub use error::{ErrorCategory, MediaError, MediaResult};
pub use muxer::{MuxerConfig, MuxerStats, WebmMuxer};
pub use sample_writer::SampleWriter;
pub use timestamp::{TrackClock, AUDIO_CLOCK_DIVISOR, VIDEO_CLOCK_DIVISOR};
pub use vp8::FrameGeometry;
