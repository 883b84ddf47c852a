//! Track table and segment info declared when a container is opened

use super::ebml;
use chrono::{DateTime, Utc};

/// Matroska codec id for Opus audio
pub const CODEC_OPUS: &str = "A_OPUS";

/// Matroska codec id for VP8 video
pub const CODEC_VP8: &str = "V_VP8";

/// Matroska track type values
const TRACK_TYPE_VIDEO: u64 = 1;
const TRACK_TYPE_AUDIO: u64 = 2;

/// Audio track parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioSettings {
    /// Sampling frequency in Hz
    pub sampling_frequency: f64,
    /// Channel count
    pub channels: u8,
}

/// Video track parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoSettings {
    /// Width in pixels
    pub pixel_width: u32,
    /// Height in pixels
    pub pixel_height: u32,
}

/// Media-specific part of a track entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackSettings {
    /// Audio track
    Audio(AudioSettings),
    /// Video track
    Video(VideoSettings),
}

/// One declared track
#[derive(Debug, Clone, PartialEq)]
pub struct TrackEntry {
    /// Human readable name
    pub name: String,
    /// 1-based track number referenced by blocks
    pub number: u64,
    /// Track UID
    pub uid: u64,
    /// Matroska codec id
    pub codec_id: String,
    /// Nominal frame duration in nanoseconds
    pub default_duration_ns: u64,
    /// Audio or video parameters
    pub settings: TrackSettings,
}

impl TrackEntry {
    /// Whether blocks on this track are video frames
    pub fn is_video(&self) -> bool {
        matches!(self.settings, TrackSettings::Video(_))
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        let mut entry = Vec::new();
        ebml::write_string(&mut entry, ebml::TRACK_NAME, &self.name);
        ebml::write_uint(&mut entry, ebml::TRACK_NUMBER, self.number);
        ebml::write_uint(&mut entry, ebml::TRACK_UID, self.uid);
        ebml::write_string(&mut entry, ebml::CODEC_ID, &self.codec_id);

        match self.settings {
            TrackSettings::Audio(audio) => {
                ebml::write_uint(&mut entry, ebml::TRACK_TYPE, TRACK_TYPE_AUDIO);
                ebml::write_uint(&mut entry, ebml::DEFAULT_DURATION, self.default_duration_ns);
                let mut settings = Vec::new();
                ebml::write_float(
                    &mut settings,
                    ebml::SAMPLING_FREQUENCY,
                    audio.sampling_frequency,
                );
                ebml::write_uint(&mut settings, ebml::CHANNELS, u64::from(audio.channels));
                ebml::write_master(&mut entry, ebml::AUDIO, &settings);
            }
            TrackSettings::Video(video) => {
                ebml::write_uint(&mut entry, ebml::TRACK_TYPE, TRACK_TYPE_VIDEO);
                ebml::write_uint(&mut entry, ebml::DEFAULT_DURATION, self.default_duration_ns);
                let mut settings = Vec::new();
                ebml::write_uint(&mut settings, ebml::PIXEL_WIDTH, u64::from(video.pixel_width));
                ebml::write_uint(&mut settings, ebml::PIXEL_HEIGHT, u64::from(video.pixel_height));
                ebml::write_master(&mut entry, ebml::VIDEO, &settings);
            }
        }

        ebml::write_master(buf, ebml::TRACK_ENTRY, &entry);
    }
}

/// Segment info written ahead of the track table
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentInfo {
    /// Nanoseconds per block timestamp unit
    pub timecode_scale_ns: u64,
    /// Library that produced the stream
    pub muxing_app: String,
    /// Application that produced the stream
    pub writing_app: String,
    /// Recording start time
    pub date_utc: DateTime<Utc>,
}

impl Default for SegmentInfo {
    fn default() -> Self {
        Self {
            timecode_scale_ns: 1_000_000,
            muxing_app: concat!("recmux-media ", env!("CARGO_PKG_VERSION")).to_string(),
            writing_app: "recmux".to_string(),
            date_utc: Utc::now(),
        }
    }
}

impl SegmentInfo {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        let mut info = Vec::new();
        ebml::write_uint(&mut info, ebml::TIMECODE_SCALE, self.timecode_scale_ns);
        ebml::write_string(&mut info, ebml::MUXING_APP, &self.muxing_app);
        ebml::write_string(&mut info, ebml::WRITING_APP, &self.writing_app);
        ebml::write_date(&mut info, ebml::DATE_UTC, self.date_utc);
        ebml::write_master(buf, ebml::INFO, &info);
    }
}
