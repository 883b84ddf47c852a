//! WebM container serialization
//!
//! A minimal Matroska/WebM writer: a fixed track table is declared when the
//! container is opened, then each track receives timestamped SimpleBlocks
//! through its own [`BlockWriter`].

pub mod ebml;
pub mod track;
pub mod writer;

pub use track::{
    AudioSettings, SegmentInfo, TrackEntry, TrackSettings, VideoSettings, CODEC_OPUS, CODEC_VP8,
};
pub use writer::{
    BlockWriter, ContainerSink, ContainerWriter, WriterOptions, MAX_CLUSTER_DURATION_MS,
};
