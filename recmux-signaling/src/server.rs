//! Control server implementation
//!
//! Accepts WebSocket connections and dispatches JSON control requests to a
//! [`ControlHandler`]. Every parsed request is acknowledged, including ones
//! whose handler failed; the failure is logged on this side only.

use crate::error::{SignalingError, SignalingResult};
use crate::protocol::{ControlCommand, ControlReply, ControlRequest, RecordingConfig, RecordingKey};
use crate::registry::ElementKey;
use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use uuid::Uuid;

/// Receives dispatched control commands
#[async_trait]
pub trait ControlHandler: Send + Sync {
    /// Start a pipeline element
    async fn start_element(&self, key: ElementKey, config: Vec<u8>) -> SignalingResult<()>;

    /// Start recording a track
    async fn start_recording(
        &self,
        key: RecordingKey,
        config: RecordingConfig,
    ) -> SignalingResult<()>;

    /// Stop recording a track
    async fn stop_recording(&self, key: RecordingKey) -> SignalingResult<()>;
}

/// Write half of a WebSocket connection
type ReplySink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// WebSocket control server
#[derive(Clone)]
pub struct ControlServer {
    /// Address the server binds to
    pub bind_addr: SocketAddr,
    handler: Arc<dyn ControlHandler>,
    connections: Arc<DashMap<String, SocketAddr>>,
}

impl ControlServer {
    /// Create a server that dispatches to `handler`
    pub fn new(bind_addr: SocketAddr, handler: Arc<dyn ControlHandler>) -> Self {
        Self {
            bind_addr,
            handler,
            connections: Arc::new(DashMap::new()),
        }
    }

    /// Bind and serve until the task is dropped
    pub async fn start(&self) -> SignalingResult<()> {
        let listener = TcpListener::bind(self.bind_addr).await.map_err(|e| {
            SignalingError::ServerStartFailed {
                address: self.bind_addr,
                source: e.into(),
            }
        })?;

        self.serve(listener).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> SignalingResult<()> {
        let local_addr = listener.local_addr().unwrap_or(self.bind_addr);
        tracing::info!("Control server listening on {}", local_addr);

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    tracing::debug!("New connection from {}", addr);
                    let server = self.clone();
                    tokio::spawn(async move {
                        server.handle_connection(stream, addr).await;
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept connection: {}", e);
                }
            }
        }
    }

    /// Number of open control connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Handle incoming WebSocket connection
    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                tracing::error!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let connection_id = Uuid::new_v4().to_string();
        tracing::debug!("WebSocket connection established: {} ({})", connection_id, addr);
        self.connections.insert(connection_id.clone(), addr);

        let (mut sink, mut stream) = ws_stream.split();
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    let reply = self.handle_text(&text).await;
                    if !Self::send_reply(&connection_id, &mut sink, &reply).await {
                        break;
                    }
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!("Connection {} closed", connection_id);
                    break;
                }
                Ok(_) => {
                    // Binary, Ping and Pong frames carry no requests
                }
                Err(e) => {
                    tracing::error!("WebSocket error on connection {}: {}", connection_id, e);
                    break;
                }
            }
        }

        self.connections.remove(&connection_id);
        tracing::debug!("Connection {} cleaned up", connection_id);
    }

    /// Parse one text frame, dispatch it and build the reply
    pub async fn handle_text(&self, text: &str) -> ControlReply {
        let request = match serde_json::from_str::<ControlRequest>(text) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Invalid message format: {}", e);
                let error = SignalingError::InvalidMessage {
                    message: text.to_string(),
                    source: e.into(),
                };
                return ControlReply::Error {
                    error: error.to_string(),
                    error_code: error.error_code(),
                };
            }
        };

        let ControlRequest {
            request_id,
            request,
        } = request;
        let name = request.name();
        tracing::debug!("Control request {}: {}", request_id, name);

        if let Err(e) = self.dispatch(request).await {
            tracing::error!("Control request {} ({}) failed: {}", request_id, name, e);
        }

        ControlReply::Ack { request_id }
    }

    async fn dispatch(&self, command: ControlCommand) -> SignalingResult<()> {
        match command {
            ControlCommand::StartElement {
                sfu_id,
                pipeline_id,
                session_id,
                track_id,
                element_id,
                config,
            } => {
                let key = ElementKey {
                    sfu_id,
                    pipeline_id,
                    session_id,
                    track_id,
                    element_id,
                };
                self.handler.start_element(key, config).await
            }
            ControlCommand::StartRecording {
                sfu_id,
                session_id,
                track_id,
                config,
            } => {
                let key = RecordingKey::new(sfu_id, session_id, track_id);
                self.handler.start_recording(key, config).await
            }
            ControlCommand::StopRecording {
                sfu_id,
                session_id,
                track_id,
            } => {
                let key = RecordingKey::new(sfu_id, session_id, track_id);
                self.handler.stop_recording(key).await
            }
        }
    }

    /// Send a reply; returns false once the connection is unusable
    async fn send_reply(connection_id: &str, sink: &mut ReplySink, reply: &ControlReply) -> bool {
        let message = match serde_json::to_string(reply) {
            Ok(json) => Message::Text(json),
            Err(e) => {
                tracing::error!("Failed to serialize reply: {}", e);
                return true;
            }
        };

        if let Err(e) = sink.send(message).await {
            tracing::error!("Failed to send reply to {}: {}", connection_id, e);
            return false;
        }
        true
    }
}

impl std::fmt::Debug for ControlServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlServer")
            .field("bind_addr", &self.bind_addr)
            .field("connections", &self.connections.len())
            .finish()
    }
}
