//! # recmux signaling
//!
//! Control plane for recmux. A WebSocket [`ControlServer`] receives JSON
//! requests to start pipeline elements and to start or stop recordings, and
//! dispatches them to a [`ControlHandler`], by default the
//! [`RecordingRegistry`].

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;

// Re-export main types
pub use error::{SignalingError, SignalingResult};
pub use protocol::{
    AudioMode, ControlCommand, ControlReply, ControlRequest, RecordingConfig, RecordingFormat,
    RecordingKey, VideoMode,
};
pub use registry::{ElementFactory, ElementKey, RecordingRegistry, RecordingSummary};
pub use server::{ControlHandler, ControlServer};
