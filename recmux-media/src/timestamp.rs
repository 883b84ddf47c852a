//! Per-track timestamp rebasing
//!
//! Audio and video arrive on independent capture clocks. Each track keeps
//! the first raw timestamp it wrote and maps later timestamps onto the
//! container's millisecond timeline relative to that base.

/// Video capture clock (90 kHz) ticks per container millisecond
pub const VIDEO_CLOCK_DIVISOR: u32 = 90;

/// Opus capture clock (48 kHz) ticks per container millisecond
pub const AUDIO_CLOCK_DIVISOR: u32 = 48;

/// Rebasing state for one track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackClock {
    base: Option<u32>,
    divisor: u32,
}

impl TrackClock {
    /// Create a clock that divides elapsed ticks by `divisor`.
    ///
    /// A zero divisor is treated as 1.
    pub fn new(divisor: u32) -> Self {
        Self {
            base: None,
            divisor: divisor.max(1),
        }
    }

    /// Clock for a 90 kHz video track
    pub fn video() -> Self {
        Self::new(VIDEO_CLOCK_DIVISOR)
    }

    /// Clock for a 48 kHz audio track
    pub fn audio() -> Self {
        Self::new(AUDIO_CLOCK_DIVISOR)
    }

    /// Base timestamp, once the first sample has been seen
    pub fn base(&self) -> Option<u32> {
        self.base
    }

    /// Ticks per output unit
    pub fn divisor(&self) -> u32 {
        self.divisor
    }

    /// Map a raw capture timestamp onto the track timeline.
    ///
    /// The first call fixes the base and returns 0. Elapsed ticks use
    /// wrapping subtraction so a capture clock rolling over 2^32 keeps
    /// counting forward.
    pub fn rebase(&mut self, raw: u32) -> i64 {
        let base = *self.base.get_or_insert(raw);
        i64::from(raw.wrapping_sub(base) / self.divisor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_is_zero() {
        let mut clock = TrackClock::video();
        assert_eq!(clock.base(), None);
        assert_eq!(clock.rebase(3_000_000), 0);
        assert_eq!(clock.base(), Some(3_000_000));
    }

    #[test]
    fn test_video_rebase_floors() {
        let mut clock = TrackClock::video();
        clock.rebase(1_000);
        assert_eq!(clock.rebase(1_000 + 90), 1);
        assert_eq!(clock.rebase(1_000 + 179), 1);
        assert_eq!(clock.rebase(1_000 + 3_000), 33);
        assert_eq!(clock.rebase(1_000 + 90_000), 1_000);
    }

    #[test]
    fn test_audio_rebase() {
        let mut clock = TrackClock::audio();
        clock.rebase(48_000);
        assert_eq!(clock.rebase(48_000 + 960), 20);
        assert_eq!(clock.rebase(48_000 + 47), 0);
        assert_eq!(clock.rebase(96_000), 1_000);
    }

    #[test]
    fn test_zero_is_a_valid_base() {
        let mut clock = TrackClock::audio();
        assert_eq!(clock.rebase(0), 0);
        assert_eq!(clock.base(), Some(0));
        assert_eq!(clock.rebase(480), 10);
    }

    #[test]
    fn test_wraparound_keeps_counting() {
        let mut clock = TrackClock::video();
        clock.rebase(u32::MAX - 89);
        // 90 ticks later the raw clock has wrapped to 0
        assert_eq!(clock.rebase(0), 1);
    }

    #[test]
    fn test_zero_divisor_is_clamped() {
        let clock = TrackClock::new(0);
        assert_eq!(clock.divisor(), 1);
    }
}
