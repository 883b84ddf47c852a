//! EBML element encoding
//!
//! Every element is written as `ID | VINT size | payload`. IDs are stored
//! with their length marker bits already set, so they are emitted verbatim.

use chrono::{DateTime, Utc};

// EBML header
pub const EBML_HEADER: u32 = 0x1A45_DFA3;
pub const EBML_VERSION: u32 = 0x4286;
pub const EBML_READ_VERSION: u32 = 0x42F7;
pub const EBML_MAX_ID_LENGTH: u32 = 0x42F2;
pub const EBML_MAX_SIZE_LENGTH: u32 = 0x42F3;
pub const EBML_DOC_TYPE: u32 = 0x4282;
pub const EBML_DOC_TYPE_VERSION: u32 = 0x4287;
pub const EBML_DOC_TYPE_READ_VERSION: u32 = 0x4285;

// Segment and top-level children
pub const SEGMENT: u32 = 0x1853_8067;
pub const SEEK_HEAD: u32 = 0x114D_9B74;
pub const SEEK: u32 = 0x4DBB;
pub const SEEK_ID: u32 = 0x53AB;
pub const SEEK_POSITION: u32 = 0x53AC;
pub const INFO: u32 = 0x1549_A966;
pub const TRACKS: u32 = 0x1654_AE6B;
pub const CLUSTER: u32 = 0x1F43_B675;

// Info
pub const TIMECODE_SCALE: u32 = 0x2A_D7B1;
pub const MUXING_APP: u32 = 0x4D80;
pub const WRITING_APP: u32 = 0x5741;
pub const DATE_UTC: u32 = 0x4461;

// Tracks
pub const TRACK_ENTRY: u32 = 0xAE;
pub const TRACK_NUMBER: u32 = 0xD7;
pub const TRACK_UID: u32 = 0x73C5;
pub const TRACK_TYPE: u32 = 0x83;
pub const TRACK_NAME: u32 = 0x536E;
pub const CODEC_ID: u32 = 0x86;
pub const DEFAULT_DURATION: u32 = 0x23_E383;
pub const VIDEO: u32 = 0xE0;
pub const PIXEL_WIDTH: u32 = 0xB0;
pub const PIXEL_HEIGHT: u32 = 0xBA;
pub const AUDIO: u32 = 0xE1;
pub const SAMPLING_FREQUENCY: u32 = 0xB5;
pub const CHANNELS: u32 = 0x9F;

// Cluster
pub const CLUSTER_TIMECODE: u32 = 0xE7;
pub const SIMPLE_BLOCK: u32 = 0xA3;

/// Size marker for a master element whose length is not known up front
pub const UNKNOWN_SIZE: [u8; 8] = [0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];

/// 2001-01-01T00:00:00 UTC as a Unix timestamp
const EBML_EPOCH_UNIX_SECS: i64 = 978_307_200;

/// Largest value a VINT can carry in 8 bytes (all-ones is reserved)
const VINT_MAX: u64 = (1 << 56) - 2;

/// Append an element ID
pub fn write_id(buf: &mut Vec<u8>, id: u32) {
    let bytes = id.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count().min(3);
    buf.extend_from_slice(&bytes[skip..]);
}

/// Append a VINT using the shortest encoding that holds `value`
pub fn write_vint(buf: &mut Vec<u8>, value: u64) {
    let value = value.min(VINT_MAX);
    let mut len = 1usize;
    // A length-n VINT holds 7n bits; the all-ones pattern means "unknown"
    while len < 8 && value >= (1u64 << (7 * len)) - 1 {
        len += 1;
    }
    let marked = value | (1u64 << (7 * len));
    buf.extend_from_slice(&marked.to_be_bytes()[8 - len..]);
}

/// Append an element header followed by its payload
pub fn write_master(buf: &mut Vec<u8>, id: u32, payload: &[u8]) {
    write_id(buf, id);
    write_vint(buf, payload.len() as u64);
    buf.extend_from_slice(payload);
}

/// Append an unsigned integer element using the minimal number of bytes
pub fn write_uint(buf: &mut Vec<u8>, id: u32, value: u64) {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count().min(7);
    write_master(buf, id, &bytes[skip..]);
}

/// Append an unsigned integer element with a fixed 8-byte payload
pub fn write_uint_fixed(buf: &mut Vec<u8>, id: u32, value: u64) {
    write_master(buf, id, &value.to_be_bytes());
}

/// Append a 64-bit float element
pub fn write_float(buf: &mut Vec<u8>, id: u32, value: f64) {
    write_master(buf, id, &value.to_be_bytes());
}

/// Append a string element
pub fn write_string(buf: &mut Vec<u8>, id: u32, value: &str) {
    write_master(buf, id, value.as_bytes());
}

/// Append a date element: signed nanoseconds since 2001-01-01T00:00:00 UTC
pub fn write_date(buf: &mut Vec<u8>, id: u32, value: DateTime<Utc>) {
    let nanos = value
        .timestamp_nanos_opt()
        .map(|n| n - EBML_EPOCH_UNIX_SECS * 1_000_000_000)
        .unwrap_or(0);
    write_master(buf, id, &nanos.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn vint(value: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        write_vint(&mut buf, value);
        buf
    }

    #[test]
    fn test_vint_encoding() {
        assert_eq!(vint(0), vec![0x80]);
        assert_eq!(vint(1), vec![0x81]);
        assert_eq!(vint(126), vec![0xFE]);
        // 127 would be the reserved all-ones pattern in one byte
        assert_eq!(vint(127), vec![0x40, 0x7F]);
        assert_eq!(vint(0x3FFE), vec![0x7F, 0xFE]);
        assert_eq!(vint(0x3FFF), vec![0x20, 0x3F, 0xFF]);
    }

    #[test]
    fn test_id_encoding() {
        let mut buf = Vec::new();
        write_id(&mut buf, SIMPLE_BLOCK);
        write_id(&mut buf, SEEK);
        write_id(&mut buf, TIMECODE_SCALE);
        write_id(&mut buf, EBML_HEADER);
        assert_eq!(
            buf,
            vec![0xA3, 0x4D, 0xBB, 0x2A, 0xD7, 0xB1, 0x1A, 0x45, 0xDF, 0xA3]
        );
    }

    #[test]
    fn test_uint_is_minimal() {
        let mut buf = Vec::new();
        write_uint(&mut buf, TRACK_NUMBER, 0);
        assert_eq!(buf, vec![0xD7, 0x81, 0x00]);

        buf.clear();
        write_uint(&mut buf, TRACK_UID, 67890);
        assert_eq!(buf, vec![0x73, 0xC5, 0x83, 0x01, 0x09, 0x32]);
    }

    #[test]
    fn test_fixed_uint_width() {
        let mut buf = Vec::new();
        write_uint_fixed(&mut buf, SEEK_POSITION, 5);
        assert_eq!(buf.len(), 2 + 1 + 8);
        assert_eq!(buf[2], 0x88);
    }

    #[test]
    fn test_date_epoch_is_zero() {
        let mut buf = Vec::new();
        let epoch = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
        write_date(&mut buf, DATE_UTC, epoch);
        assert_eq!(buf, vec![0x44, 0x61, 0x88, 0, 0, 0, 0, 0, 0, 0, 0]);
    }
}
