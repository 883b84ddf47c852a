//! Control Server Demo
//!
//! Runs the WebSocket control server until Ctrl-C. Recordings are started
//! with JSON requests such as:
//!
//! ```json
//! {"request_id": "1", "request": {"StartRecording": {
//!     "sfu_id": "sfu-1", "session_id": "s1", "track_id": "t1",
//!     "config": {"destination_path": "/tmp/s1.webm",
//!                "audio_mode": "Stereo", "video_mode": "On"}}}}
//! ```

use recmux::{ControlCommand, ControlRequest, GlobalConfig, Recmux, RecordingConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::var("RECMUX_CONFIG") {
        Ok(json) => GlobalConfig::from_json_str(&json)?,
        Err(_) => GlobalConfig::default(),
    };
    let recmux = Recmux::init_with(config)?;

    let example = ControlRequest {
        request_id: "1".to_string(),
        request: ControlCommand::StartRecording {
            sfu_id: "sfu-1".to_string(),
            session_id: "s1".to_string(),
            track_id: "t1".to_string(),
            config: RecordingConfig {
                destination_path: "/tmp/s1.webm".to_string(),
                ..Default::default()
            },
        },
    };
    info!(
        "🚀 Control server on ws://{}",
        recmux.config().control_bind_addr
    );
    info!("📝 Example request: {}", serde_json::to_string(&example)?);

    recmux.run().await?;
    info!("👋 Control server stopped");
    Ok(())
}
