//! Streaming WebM block writer
//!
//! Output layout:
//!
//! ```text
//! EBML header (DocType "webm")
//! Segment (unknown size)
//! ├── SeekHead -> Info, Tracks
//! ├── Info
//! ├── Tracks
//! └── Cluster... (Timecode + SimpleBlocks)
//! ```
//!
//! The header is emitted when the container is opened. Clusters are written
//! with an unknown size and every SimpleBlock goes to the sink as soon as it
//! is appended, so a failed write loses exactly that block.

use super::ebml;
use super::track::{SegmentInfo, TrackEntry};
use crate::error::{MediaError, MediaResult};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;

/// Clusters are cut at the next video keyframe once they span this long
pub const MAX_CLUSTER_DURATION_MS: i64 = 5_000;

/// Byte sink that receives the serialized container
pub trait ContainerSink: io::Write + Send {
    /// Release the sink once the container is complete
    fn close(&mut self) -> io::Result<()>;
}

/// Options applied when opening a container
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Segment info element
    pub info: SegmentInfo,
    /// Emit a SeekHead pointing at Info and Tracks
    pub seek_head: bool,
    /// Cluster length after which a video keyframe starts a new cluster
    pub max_cluster_duration_ms: i64,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            info: SegmentInfo::default(),
            seek_head: true,
            max_cluster_duration_ms: MAX_CLUSTER_DURATION_MS,
        }
    }
}

struct SharedState {
    sink: Box<dyn ContainerSink>,
    cluster_timecode: Option<i64>,
    open_tracks: usize,
    max_cluster_duration_ms: i64,
}

impl SharedState {
    fn needs_new_cluster(&self, timestamp_ms: i64, video_keyframe: bool) -> bool {
        let Some(timecode) = self.cluster_timecode else {
            return true;
        };
        let delta = timestamp_ms - timecode;
        delta < i64::from(i16::MIN)
            || delta > i64::from(i16::MAX)
            || (video_keyframe && delta >= self.max_cluster_duration_ms)
    }

    /// Emit an unknown-size Cluster header. On failure no cluster is open,
    /// so the next block retries.
    fn start_cluster(&mut self, timestamp_ms: i64) -> MediaResult<()> {
        self.cluster_timecode = None;

        let mut header = Vec::with_capacity(4 + ebml::UNKNOWN_SIZE.len() + 10);
        ebml::write_id(&mut header, ebml::CLUSTER);
        header.extend_from_slice(&ebml::UNKNOWN_SIZE);
        ebml::write_uint(&mut header, ebml::CLUSTER_TIMECODE, timestamp_ms.max(0) as u64);
        self.sink.write_all(&header)?;

        self.cluster_timecode = Some(timestamp_ms);
        Ok(())
    }

    fn append_block(
        &mut self,
        track_number: u64,
        keyframe: bool,
        video: bool,
        timestamp_ms: i64,
        payload: &[u8],
    ) -> MediaResult<()> {
        if self.needs_new_cluster(timestamp_ms, video && keyframe) {
            self.start_cluster(timestamp_ms)?;
        }

        let Some(timecode) = self.cluster_timecode else {
            return Err(MediaError::InvalidState {
                message: "no open cluster".to_string(),
            });
        };

        // Fits: needs_new_cluster guarantees an i16 delta
        let relative = (timestamp_ms - timecode) as i16;
        let mut block = Vec::with_capacity(payload.len() + 4);
        ebml::write_vint(&mut block, track_number);
        block.extend_from_slice(&relative.to_be_bytes());
        block.push(if keyframe { 0x80 } else { 0x00 });
        block.extend_from_slice(payload);

        let mut out = Vec::with_capacity(block.len() + 9);
        ebml::write_master(&mut out, ebml::SIMPLE_BLOCK, &block);
        self.sink.write_all(&out)?;
        Ok(())
    }

    fn finish(&mut self) -> MediaResult<()> {
        let synced = self.sink.flush();
        let closed = self.sink.close();
        synced?;
        closed?;
        Ok(())
    }
}

/// Opens containers over a byte sink
pub struct ContainerWriter;

impl ContainerWriter {
    /// Write the container header and return one block writer per track, in table order.
    ///
    /// The sink is closed when the last returned writer is closed.
    pub fn open<S>(
        mut sink: S,
        tracks: &[TrackEntry],
        options: WriterOptions,
    ) -> MediaResult<Vec<BlockWriter>>
    where
        S: ContainerSink + 'static,
    {
        if tracks.is_empty() {
            return Err(MediaError::Container {
                reason: "at least one track is required".to_string(),
            });
        }

        let header = encode_header(tracks, &options);
        sink.write_all(&header)?;

        tracing::debug!(
            "Container opened: {} track(s), {} header bytes",
            tracks.len(),
            header.len()
        );

        let shared = Arc::new(Mutex::new(SharedState {
            sink: Box::new(sink),
            cluster_timecode: None,
            open_tracks: tracks.len(),
            max_cluster_duration_ms: options.max_cluster_duration_ms,
        }));

        Ok(tracks
            .iter()
            .map(|track| BlockWriter {
                shared: Arc::clone(&shared),
                track_number: track.number,
                video: track.is_video(),
                closed: false,
            })
            .collect())
    }
}

fn encode_header(tracks: &[TrackEntry], options: &WriterOptions) -> Vec<u8> {
    let mut ebml_header = Vec::new();
    ebml::write_uint(&mut ebml_header, ebml::EBML_VERSION, 1);
    ebml::write_uint(&mut ebml_header, ebml::EBML_READ_VERSION, 1);
    ebml::write_uint(&mut ebml_header, ebml::EBML_MAX_ID_LENGTH, 4);
    ebml::write_uint(&mut ebml_header, ebml::EBML_MAX_SIZE_LENGTH, 8);
    ebml::write_string(&mut ebml_header, ebml::EBML_DOC_TYPE, "webm");
    ebml::write_uint(&mut ebml_header, ebml::EBML_DOC_TYPE_VERSION, 4);
    ebml::write_uint(&mut ebml_header, ebml::EBML_DOC_TYPE_READ_VERSION, 2);

    let mut info = Vec::new();
    options.info.encode(&mut info);

    let mut track_entries = Vec::new();
    for track in tracks {
        track.encode(&mut track_entries);
    }
    let mut tracks_element = Vec::new();
    ebml::write_master(&mut tracks_element, ebml::TRACKS, &track_entries);

    let seek_head = if options.seek_head {
        // Positions are fixed-width, so the SeekHead length does not depend on them
        let len = encode_seek_head(0, 0).len() as u64;
        encode_seek_head(len, len + info.len() as u64)
    } else {
        Vec::new()
    };

    let mut out = Vec::new();
    ebml::write_master(&mut out, ebml::EBML_HEADER, &ebml_header);
    ebml::write_id(&mut out, ebml::SEGMENT);
    out.extend_from_slice(&ebml::UNKNOWN_SIZE);
    out.extend_from_slice(&seek_head);
    out.extend_from_slice(&info);
    out.extend_from_slice(&tracks_element);
    out
}

/// Positions are relative to the first byte of Segment data
fn encode_seek_head(info_position: u64, tracks_position: u64) -> Vec<u8> {
    let mut entries = Vec::new();
    for (id, position) in [(ebml::INFO, info_position), (ebml::TRACKS, tracks_position)] {
        let mut id_bytes = Vec::new();
        ebml::write_id(&mut id_bytes, id);

        let mut seek = Vec::new();
        ebml::write_master(&mut seek, ebml::SEEK_ID, &id_bytes);
        ebml::write_uint_fixed(&mut seek, ebml::SEEK_POSITION, position);
        ebml::write_master(&mut entries, ebml::SEEK, &seek);
    }

    let mut out = Vec::new();
    ebml::write_master(&mut out, ebml::SEEK_HEAD, &entries);
    out
}

/// Writes blocks for a single track of an open container
pub struct BlockWriter {
    shared: Arc<Mutex<SharedState>>,
    track_number: u64,
    video: bool,
    closed: bool,
}

impl BlockWriter {
    /// Track number this writer targets
    pub fn track_number(&self) -> u64 {
        self.track_number
    }

    /// Whether `close` has been called on this writer
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Append one frame. Returns the number of payload bytes accepted.
    pub fn write(
        &mut self,
        keyframe: bool,
        timestamp_ms: i64,
        payload: &[u8],
    ) -> MediaResult<usize> {
        if self.closed {
            return Err(MediaError::TrackClosed {
                track: self.track_number,
            });
        }

        self.shared.lock().append_block(
            self.track_number,
            keyframe,
            self.video,
            timestamp_ms,
            payload,
        )?;
        Ok(payload.len())
    }

    /// Close this track. Closing the last open track finalizes the container.
    pub fn close(&mut self) -> MediaResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut shared = self.shared.lock();
        shared.open_tracks = shared.open_tracks.saturating_sub(1);
        if shared.open_tracks == 0 {
            tracing::debug!("Last track closed, finalizing container");
            shared.finish()?;
        }
        Ok(())
    }
}

impl Drop for BlockWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!("Track {} close on drop failed: {}", self.track_number, e);
        }
    }
}

impl std::fmt::Debug for BlockWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockWriter")
            .field("track_number", &self.track_number)
            .field("video", &self.video)
            .field("closed", &self.closed)
            .finish()
    }
}
