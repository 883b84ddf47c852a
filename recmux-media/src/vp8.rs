//! VP8 frame header inspection
//!
//! Only the two facts the muxer needs are read: whether a frame is a
//! keyframe, and the frame dimensions carried by keyframes.
//!
//! Keyframe layout (RFC 6386, section 9.1):
//!
//! ```text
//! byte 0..3   frame tag, bit 0 of byte 0 is the inverse keyframe flag
//! byte 3..6   start code 9d 01 2a
//! byte 6..8   width  (14 bits) | horizontal scale (2 bits), little-endian
//! byte 8..10  height (14 bits) | vertical scale (2 bits), little-endian
//! ```

/// Bytes a keyframe must carry before its dimensions can be read
pub const KEYFRAME_HEADER_LEN: usize = 10;

const DIMENSION_OFFSET: usize = 6;
const DIMENSION_MASK: u32 = 0x3FFF;

/// Frame dimensions in pixels, each at most 16383
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameGeometry {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl std::fmt::Display for FrameGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Returns `Some(true)` for a keyframe, `None` for an empty payload.
pub fn is_keyframe(payload: &[u8]) -> Option<bool> {
    payload.first().map(|tag| tag & 0x01 == 0)
}

/// Read the frame dimensions from a keyframe payload.
///
/// Returns `None` when the payload is too short to hold them.
/// The caller is expected to have checked [`is_keyframe`] first; interframes
/// carry no dimensions and the bytes at these offsets are compressed data.
pub fn keyframe_geometry(payload: &[u8]) -> Option<FrameGeometry> {
    let word = payload.get(DIMENSION_OFFSET..KEYFRAME_HEADER_LEN)?;
    let raw = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);

    Some(FrameGeometry {
        width: raw & DIMENSION_MASK,
        height: (raw >> 16) & DIMENSION_MASK,
    })
}
