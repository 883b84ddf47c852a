//! # recmux - live WebM recording
//!
//! recmux records live Opus audio and VP8 video into WebM files. A
//! [`WebmMuxer`] sits in a media pipeline as an ordinary element: it
//! declares its tracks from the first keyframe, rebases each track's capture
//! clock onto a shared millisecond timeline and streams the container to an
//! attached [`FileWriter`]. Recordings are started and stopped remotely
//! through a WebSocket control server.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recmux::{Recmux, RecordingConfig, RecordingKey, Sample};
//!
//! # fn main() -> Result<(), recmux::RecmuxError> {
//! let recmux = Recmux::init()?;
//! let key = RecordingKey::new("sfu-1", "session-1", "track-1");
//! let muxer = recmux.registry().start_recording(
//!     key.clone(),
//!     RecordingConfig {
//!         destination_path: "/tmp/session-1.webm".to_string(),
//!         ..Default::default()
//!     },
//! )?;
//!
//! muxer.write_sample(&Sample::audio(0, vec![0xFC, 0xFF, 0xFE]))?;
//! recmux.registry().stop_recording(&key)?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use recmux_core::{CoreError, CoreResult, Element, Node, Sample, SampleKind, SamplePayload};

pub use recmux_media::{
    FileWriter, FrameGeometry, MediaError, MediaResult, MuxerConfig, MuxerStats, SampleWriter,
    WebmMuxer,
};

pub use recmux_signaling::{
    AudioMode, ControlCommand, ControlHandler, ControlReply, ControlRequest, ControlServer,
    ElementFactory, ElementKey, RecordingConfig, RecordingFormat, RecordingKey,
    RecordingRegistry, RecordingSummary, SignalingError, VideoMode,
};

// Public API modules
pub mod config;
pub mod error;
pub mod logging;

// Re-export main API types
pub use config::GlobalConfig;
pub use error::{RecmuxError, RecmuxResult};
pub use logging::init_logging;

use std::sync::Arc;

/// Main entry point for recmux
#[derive(Debug, Clone)]
pub struct Recmux {
    inner: Arc<RecmuxInner>,
}

#[derive(Debug)]
struct RecmuxInner {
    config: GlobalConfig,
    registry: Arc<RecordingRegistry>,
}

impl Recmux {
    /// Initialize recmux with default settings
    pub fn init() -> RecmuxResult<Self> {
        Self::init_with(GlobalConfig::default())
    }

    /// Initialize with custom global configuration
    pub fn init_with(config: GlobalConfig) -> RecmuxResult<Self> {
        config.validate()?;
        logging::init_logging(&config.log_filter)?;

        let registry = Arc::new(RecordingRegistry::with_default_buffer_size(
            config.default_buffer_size,
        ));
        tracing::info!(
            "recmux initialised (control {}, buffer {} bytes)",
            config.control_bind_addr,
            config.default_buffer_size
        );

        Ok(Self {
            inner: Arc::new(RecmuxInner { config, registry }),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &GlobalConfig {
        &self.inner.config
    }

    /// Registry owning every recording
    pub fn registry(&self) -> &Arc<RecordingRegistry> {
        &self.inner.registry
    }

    /// Control server bound to the configured address and dispatching to the registry
    pub fn control_server(&self) -> ControlServer {
        ControlServer::new(
            self.inner.config.control_bind_addr,
            self.inner.registry.clone(),
        )
    }

    /// Serve control requests until Ctrl-C, then close every recording
    pub async fn run(&self) -> RecmuxResult<()> {
        let server = self.control_server();

        let result = tokio::select! {
            result = server.start() => result.map_err(RecmuxError::from),
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::error!("Failed to listen for shutdown signal: {}", e);
                }
                tracing::info!("Shutdown requested");
                Ok(())
            }
        };

        self.shutdown();
        result
    }

    /// Close every active recording
    pub fn shutdown(&self) {
        self.inner.registry.shutdown();
    }
}
