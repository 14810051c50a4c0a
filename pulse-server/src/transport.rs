//! Websocket adapter for broadcast sessions.

use axum::extract::ws::{Message, WebSocket};
use pulse::{Transport, TransportError};

/// Sends broadcast frames as websocket text messages.
///
/// Incoming messages are never read; the session only writes, and a write
/// error is how a closed connection is noticed.
pub struct WsTransport {
    socket: WebSocket,
}

impl WsTransport {
    /// Wraps an upgraded socket.
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

impl Transport for WsTransport {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.socket
            .send(Message::Text(frame))
            .await
            .map_err(|e| TransportError::Send {
                reason: e.to_string(),
            })
    }
}
