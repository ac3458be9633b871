use super::{ConnectionId, RoomRegistry};
use codespace_core::ServerEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Represents a connected client and its outbound event queue
pub struct ClientConnection {
    id: ConnectionId,
    registry: Arc<RoomRegistry>,
    rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl ClientConnection {
    pub(super) fn new(
        id: ConnectionId,
        rx: mpsc::UnboundedReceiver<ServerEvent>,
        registry: Arc<RoomRegistry>,
    ) -> Self {
        Self { id, registry, rx }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// The space this connection has joined, if any
    pub fn space_name(&self) -> Option<String> {
        self.registry.room_of(&self.id)
    }

    /// Receive the next event queued for this connection
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        self.rx.recv().await
    }

    /// Take a queued event without waiting
    pub fn try_recv(&mut self) -> Option<ServerEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for ClientConnection {
    fn drop(&mut self) {
        self.registry.leave(&self.id);
        debug!("Client disconnected: connection={}", self.id);
    }
}
