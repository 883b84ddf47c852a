//! Record To File Demo
//!
//! Feeds synthetic VP8 and Opus samples into a recording and writes a WebM
//! file. Pass an output path as the first argument, or the file lands in the
//! system temp directory.

use anyhow::Context;
use recmux::{Recmux, RecordingConfig, RecordingKey, Sample};
use tracing::info;

const FRAME_INTERVAL_90KHZ: u32 = 3000; // 30 fps
const PACKET_INTERVAL_48KHZ: u32 = 960; // 20 ms Opus packets

fn synthetic_keyframe(width: u16, height: u16) -> Vec<u8> {
    let mut frame = vec![0x50, 0x42, 0x00, 0x9D, 0x01, 0x2A];
    frame.extend_from_slice(&width.to_le_bytes());
    frame.extend_from_slice(&height.to_le_bytes());
    frame.resize(2048, 0x00);
    frame
}

fn synthetic_interframe() -> Vec<u8> {
    let mut frame = vec![0x31, 0x10, 0x00];
    frame.resize(256, 0x00);
    frame
}

fn main() -> anyhow::Result<()> {
    let recmux = Recmux::init()?;

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| {
            std::env::temp_dir()
                .join("recmux-demo.webm")
                .to_string_lossy()
                .into_owned()
        });

    let key = RecordingKey::new("demo-sfu", "demo-session", "camera");
    let muxer = recmux
        .registry()
        .start_recording(
            key.clone(),
            RecordingConfig {
                destination_path: path.clone(),
                ..Default::default()
            },
        )
        .context("failed to start recording")?;

    info!("🎬 Recording 10 seconds of synthetic media to {}", path);

    // 10 s of video with a keyframe every 2 s, audio packets in between
    let mut audio_ts = 0u32;
    for frame in 0..300u32 {
        let payload = if frame % 60 == 0 {
            synthetic_keyframe(1280, 720)
        } else {
            synthetic_interframe()
        };
        let video_ts = frame * FRAME_INTERVAL_90KHZ;
        muxer.write_sample(&Sample::video(video_ts, payload))?;

        // Keep audio at or behind the video clock
        while u64::from(audio_ts) * 90 <= u64::from(video_ts) * 48 {
            muxer.write_sample(&Sample::audio(audio_ts, vec![0xFC, 0xFF, 0xFE]))?;
            audio_ts += PACKET_INTERVAL_48KHZ;
        }
    }

    let stats = muxer.stats();
    let summary = recmux
        .registry()
        .stop_recording(&key)
        .context("failed to stop recording")?;

    info!("✅ Recording finished");
    info!("   File: {}", summary.path.display());
    info!("   Size: {} bytes", summary.bytes_written);
    info!(
        "   Blocks: {} audio, {} video",
        stats.audio_blocks, stats.video_blocks
    );
    Ok(())
}
