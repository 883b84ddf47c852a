//! WebM track muxer
//!
//! [`WebmMuxer`] receives Opus and VP8 samples from an upstream node and
//! interleaves them into a single WebM stream. The container is opened lazily:
//! audio-only recordings start on the first audio sample, anything with video
//! waits for a keyframe so the track table can carry the frame dimensions.
//!
//! The serialized stream leaves through an embedded [`SampleWriter`], so any
//! element attached to the muxer receives the container bytes as binary
//! samples.
//!
//! Downstream I/O failures are logged and swallowed. A broken recording must
//! never stall live media delivery.

use crate::container::{
    AudioSettings, BlockWriter, ContainerWriter, TrackEntry, TrackSettings, VideoSettings,
    WriterOptions, CODEC_OPUS, CODEC_VP8,
};
use crate::error::MediaResult;
use crate::sample_writer::SampleWriter;
use crate::timestamp::TrackClock;
use crate::vp8::{self, FrameGeometry};
use parking_lot::Mutex;
use recmux_core::{CoreError, CoreResult, Element, Sample, SamplePayload};
use std::sync::Arc;

const AUDIO_TRACK_UID: u64 = 12345;
const VIDEO_TRACK_UID: u64 = 67890;
const FRAME_DURATION_NS: u64 = 20_000_000;
const OPUS_SAMPLE_RATE: f64 = 48_000.0;

/// Which tracks a muxer records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxerConfig {
    /// Record the Opus track
    pub audio_enabled: bool,
    /// Record the VP8 track
    pub video_enabled: bool,
    /// Channel count declared for the audio track
    pub audio_channels: u8,
}

impl Default for MuxerConfig {
    fn default() -> Self {
        Self {
            audio_enabled: true,
            video_enabled: true,
            audio_channels: 2,
        }
    }
}

impl MuxerConfig {
    /// Audio track only
    pub fn audio_only() -> Self {
        Self {
            video_enabled: false,
            ..Self::default()
        }
    }

    /// Video track only
    pub fn video_only() -> Self {
        Self {
            audio_enabled: false,
            ..Self::default()
        }
    }
}

/// Counters reported when a muxer closes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MuxerStats {
    /// Blocks accepted on the audio track
    pub audio_blocks: u64,
    /// Blocks accepted on the video track
    pub video_blocks: u64,
    /// Samples dropped before the container opened or for a bad header
    pub dropped_samples: u64,
    /// Block writes that failed downstream
    pub write_errors: u64,
}

enum MuxerPhase {
    Uninitialized,
    Recording {
        audio: Option<BlockWriter>,
        video: Option<BlockWriter>,
    },
    Closed,
}

struct MuxerState {
    phase: MuxerPhase,
    audio_clock: TrackClock,
    video_clock: TrackClock,
    geometry: Option<FrameGeometry>,
    last_keyframe_geometry: Option<FrameGeometry>,
    initialized: bool,
    stats: MuxerStats,
}

/// Interleaves Opus and VP8 samples into a WebM byte stream
pub struct WebmMuxer {
    id: String,
    config: MuxerConfig,
    sink: SampleWriter,
    state: Mutex<MuxerState>,
}

impl WebmMuxer {
    /// Create a muxer. `None` records both tracks with stereo audio.
    pub fn new(config: Option<MuxerConfig>) -> Self {
        Self::with_id("webm", config)
    }

    /// Create a muxer with an explicit element id
    pub fn with_id(id: impl Into<String>, config: Option<MuxerConfig>) -> Self {
        let id = id.into();
        Self {
            sink: SampleWriter::new(format!("{id}:out")),
            id,
            config: config.unwrap_or_default(),
            state: Mutex::new(MuxerState {
                phase: MuxerPhase::Uninitialized,
                audio_clock: TrackClock::audio(),
                video_clock: TrackClock::video(),
                geometry: None,
                last_keyframe_geometry: None,
                initialized: false,
                stats: MuxerStats::default(),
            }),
        }
    }

    /// Track configuration
    pub fn config(&self) -> MuxerConfig {
        self.config
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        matches!(self.state.lock().phase, MuxerPhase::Closed)
    }

    /// Whether the container has been opened (stays true after close)
    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Geometry declared on the video track, once known
    pub fn geometry(&self) -> Option<FrameGeometry> {
        self.state.lock().geometry
    }

    /// Snapshot of the block counters
    pub fn stats(&self) -> MuxerStats {
        self.state.lock().stats
    }

    /// Attach a consumer of the serialized container
    pub fn attach(&self, child: Arc<dyn Element>) {
        self.sink.attach(child);
    }

    /// Route one sample to its track.
    ///
    /// Samples for disabled tracks or of other kinds are ignored. Container
    /// I/O errors are logged and never returned.
    pub fn write_sample(&self, sample: &Sample) -> MediaResult<()> {
        let mut state = self.state.lock();
        if matches!(state.phase, MuxerPhase::Closed) {
            return Ok(());
        }

        match &sample.payload {
            SamplePayload::Video(data) if self.config.video_enabled => {
                self.push_video(&mut state, sample.timestamp, data);
            }
            SamplePayload::Audio(data) if self.config.audio_enabled => {
                self.push_audio(&mut state, sample.timestamp, data);
            }
            _ => {}
        }
        Ok(())
    }

    fn push_video(&self, state: &mut MuxerState, timestamp: u32, payload: &[u8]) {
        let Some(keyframe) = vp8::is_keyframe(payload) else {
            tracing::debug!("{}: empty video payload dropped", self.id);
            state.stats.dropped_samples += 1;
            return;
        };

        if keyframe {
            let Some(geometry) = vp8::keyframe_geometry(payload) else {
                tracing::debug!(
                    "{}: keyframe of {} bytes too short for a header, dropped",
                    self.id,
                    payload.len()
                );
                state.stats.dropped_samples += 1;
                return;
            };

            if matches!(state.phase, MuxerPhase::Uninitialized) {
                self.initialize(state, Some(geometry));
            } else if state.last_keyframe_geometry != Some(geometry) {
                if let Some(declared) = state.geometry {
                    tracing::warn!(
                        "{}: resolution changed from {} to {}, keeping declared track geometry",
                        self.id,
                        declared,
                        geometry
                    );
                }
            }
            state.last_keyframe_geometry = Some(geometry);
        }

        let MuxerPhase::Recording {
            video: Some(writer),
            ..
        } = &mut state.phase
        else {
            state.stats.dropped_samples += 1;
            return;
        };

        let timestamp_ms = state.video_clock.rebase(timestamp);
        match writer.write(keyframe, timestamp_ms, payload) {
            Ok(_) => state.stats.video_blocks += 1,
            Err(e) => {
                state.stats.write_errors += 1;
                tracing::error!("{}: video block write failed: {}", self.id, e);
            }
        }
    }

    fn push_audio(&self, state: &mut MuxerState, timestamp: u32, payload: &[u8]) {
        if matches!(state.phase, MuxerPhase::Uninitialized) && !self.config.video_enabled {
            self.initialize(state, None);
        }

        let MuxerPhase::Recording {
            audio: Some(writer),
            ..
        } = &mut state.phase
        else {
            state.stats.dropped_samples += 1;
            return;
        };

        let timestamp_ms = state.audio_clock.rebase(timestamp);
        match writer.write(true, timestamp_ms, payload) {
            Ok(_) => state.stats.audio_blocks += 1,
            Err(e) => {
                state.stats.write_errors += 1;
                tracing::error!("{}: audio block write failed: {}", self.id, e);
            }
        }
    }

    fn initialize(&self, state: &mut MuxerState, geometry: Option<FrameGeometry>) {
        if !matches!(state.phase, MuxerPhase::Uninitialized) {
            return;
        }

        let tracks = self.track_table(geometry);
        state.initialized = true;
        if self.config.video_enabled {
            state.geometry = geometry;
        }

        let opened = ContainerWriter::open(self.sink.clone(), &tracks, WriterOptions::default());
        let writers = match opened {
            Ok(writers) => writers,
            Err(e) => {
                tracing::error!("{}: failed to open WebM container: {}", self.id, e);
                state.phase = MuxerPhase::Recording {
                    audio: None,
                    video: None,
                };
                return;
            }
        };

        let mut writers = writers.into_iter();
        let audio = if self.config.audio_enabled {
            writers.next()
        } else {
            None
        };
        let video = if self.config.video_enabled {
            writers.next()
        } else {
            None
        };
        state.phase = MuxerPhase::Recording { audio, video };

        match (self.config.audio_enabled, state.geometry) {
            (true, Some(geometry)) => {
                tracing::info!("WebM muxer {} started with audio and video {}", self.id, geometry)
            }
            (false, Some(geometry)) => {
                tracing::info!("WebM muxer {} started with video {}", self.id, geometry)
            }
            _ => tracing::info!("WebM muxer {} started with audio only", self.id),
        }
    }

    fn track_table(&self, geometry: Option<FrameGeometry>) -> Vec<TrackEntry> {
        let mut tracks = Vec::with_capacity(2);

        if self.config.audio_enabled {
            tracks.push(TrackEntry {
                name: "Audio".to_string(),
                number: 1,
                uid: AUDIO_TRACK_UID,
                codec_id: CODEC_OPUS.to_string(),
                default_duration_ns: FRAME_DURATION_NS,
                settings: TrackSettings::Audio(AudioSettings {
                    sampling_frequency: OPUS_SAMPLE_RATE,
                    channels: self.config.audio_channels,
                }),
            });
        }

        if self.config.video_enabled {
            let geometry = geometry.unwrap_or(FrameGeometry {
                width: 0,
                height: 0,
            });
            tracks.push(TrackEntry {
                name: "Video".to_string(),
                number: tracks.len() as u64 + 1,
                uid: VIDEO_TRACK_UID,
                codec_id: CODEC_VP8.to_string(),
                default_duration_ns: FRAME_DURATION_NS,
                settings: TrackSettings::Video(VideoSettings {
                    pixel_width: geometry.width,
                    pixel_height: geometry.height,
                }),
            });
        }

        tracks
    }

    /// Finalize the container and terminate downstream consumers.
    ///
    /// Safe to call repeatedly and concurrently with `write_sample`.
    pub fn close(&self) {
        let mut state = self.state.lock();
        let phase = std::mem::replace(&mut state.phase, MuxerPhase::Closed);

        let writers = match phase {
            MuxerPhase::Closed => return,
            MuxerPhase::Uninitialized => Vec::new(),
            MuxerPhase::Recording { audio, video } => {
                audio.into_iter().chain(video).collect::<Vec<_>>()
            }
        };

        if writers.is_empty() {
            // The container never took ownership of the sink
            if let Err(e) = self.sink.close() {
                tracing::error!("{}: failed to close output: {}", self.id, e);
            }
        } else {
            for mut writer in writers {
                if let Err(e) = writer.close() {
                    tracing::error!(
                        "{}: failed to close track {}: {}",
                        self.id,
                        writer.track_number(),
                        e
                    );
                }
            }
        }

        tracing::info!(
            "WebM muxer {} closed: {} audio blocks, {} video blocks, {} dropped",
            self.id,
            state.stats.audio_blocks,
            state.stats.video_blocks,
            state.stats.dropped_samples
        );
    }
}

impl Element for WebmMuxer {
    fn id(&self) -> &str {
        &self.id
    }

    fn write(&self, sample: &Sample) -> CoreResult<()> {
        self.write_sample(sample).map_err(CoreError::from)
    }

    fn attach(&self, child: Arc<dyn Element>) {
        WebmMuxer::attach(self, child);
    }

    fn close(&self) {
        WebmMuxer::close(self);
    }
}

impl std::fmt::Debug for WebmMuxer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebmMuxer")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish()
    }
}
