//! Integration tests for the recmux entry point

use recmux::*;
use std::path::PathBuf;

fn temp_destination(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("recmux-facade-{}", uuid::Uuid::new_v4()))
        .join(name)
}

fn vp8_keyframe(width: u16, height: u16) -> Vec<u8> {
    let mut frame = vec![0x50, 0x42, 0x00, 0x9D, 0x01, 0x2A];
    frame.extend_from_slice(&width.to_le_bytes());
    frame.extend_from_slice(&height.to_le_bytes());
    frame.extend_from_slice(&[0u8; 64]);
    frame
}

#[test]
fn test_init_is_repeatable() {
    let first = Recmux::init().unwrap();
    let second = Recmux::init().unwrap();
    assert_eq!(first.config(), second.config());
    assert!(!init_logging("info").unwrap());
}

#[test]
fn test_init_rejects_invalid_config() {
    let config = GlobalConfig {
        default_buffer_size: 0,
        ..Default::default()
    };
    assert!(matches!(Recmux::init_with(config), Err(RecmuxError::Config { .. })));
}

#[test]
fn test_control_server_uses_configured_address() {
    let config = GlobalConfig::from_json_str(r#"{"control_bind_addr": "127.0.0.1:7444"}"#).unwrap();
    let recmux = Recmux::init_with(config).unwrap();
    assert_eq!(recmux.control_server().bind_addr.port(), 7444);
}

#[test]
fn test_audio_video_recording_end_to_end() {
    let recmux = Recmux::init().unwrap();
    let path = temp_destination("av.webm");
    let key = RecordingKey::new("sfu-1", "session-1", "av");

    let muxer = recmux
        .registry()
        .start_recording(
            key.clone(),
            RecordingConfig {
                destination_path: path.to_string_lossy().into_owned(),
                buffer_size_bytes: 8 * 1024,
                ..Default::default()
            },
        )
        .unwrap();

    muxer.write_sample(&Sample::video(0, vp8_keyframe(1280, 720))).unwrap();
    for i in 1..50u32 {
        muxer.write_sample(&Sample::audio(i * 960, vec![0xFC; 40])).unwrap();
        muxer
            .write_sample(&Sample::video(i * 3000, vec![0x31, 0x00, 0x00, 0x42]))
            .unwrap();
    }
    assert_eq!(
        muxer.geometry(),
        Some(FrameGeometry {
            width: 1280,
            height: 720
        })
    );

    let summary = recmux.registry().stop_recording(&key).unwrap();
    assert_eq!(summary.path, path);

    let data = std::fs::read(&path).unwrap();
    assert_eq!(data.len() as u64, summary.bytes_written);
    assert!(data.windows(6).any(|w| w == b"A_OPUS"));
    assert!(data.windows(5).any(|w| w == b"V_VP8"));

    let stats = muxer.stats();
    assert_eq!(stats.video_blocks, 50);
    assert_eq!(stats.audio_blocks, 49);
}

#[test]
fn test_shutdown_closes_recordings() {
    let recmux = Recmux::init().unwrap();
    let key = RecordingKey::new("sfu-1", "session-2", "audio");
    let muxer = recmux
        .registry()
        .start_recording(
            key.clone(),
            RecordingConfig {
                destination_path: temp_destination("a.webm").to_string_lossy().into_owned(),
                audio_mode: AudioMode::Stereo,
                video_mode: VideoMode::Off,
                ..Default::default()
            },
        )
        .unwrap();

    recmux.shutdown();
    assert!(muxer.is_closed());
    assert!(recmux.registry().recording(&key).is_none());
}

#[test]
fn test_registry_serves_as_control_handler() {
    let recmux = Recmux::init().unwrap();
    let registry = recmux.registry().clone();
    let handler: &dyn ControlHandler = &*registry;
    let key = RecordingKey::new("sfu-1", "session-3", "video");
    let path = temp_destination("v.webm");

    tokio_test::block_on(handler.start_recording(
        key.clone(),
        RecordingConfig {
            destination_path: path.to_string_lossy().into_owned(),
            audio_mode: AudioMode::Off,
            video_mode: VideoMode::On,
            ..Default::default()
        },
    ))
    .unwrap();

    let muxer = recmux.registry().recording(&key).unwrap();
    assert!(!muxer.config().audio_enabled);
    muxer.write_sample(&Sample::video(0, vp8_keyframe(320, 240))).unwrap();

    tokio_test::block_on(handler.stop_recording(key.clone())).unwrap();
    assert!(muxer.is_closed());

    let data = std::fs::read(&path).unwrap();
    assert!(data.windows(5).any(|w| w == b"V_VP8"));
    assert!(!data.windows(6).any(|w| w == b"A_OPUS"));
}
