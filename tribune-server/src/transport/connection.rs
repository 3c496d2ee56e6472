use tokio::sync::mpsc;
use tracing::debug;
use tribune_core::{ConnectionId, ServerEvent};

/// Outbound half of one client connection.
///
/// Each connection owns an independent unbounded queue, so a slow socket
/// never holds up delivery to the rest of the room. Once the session drops
/// its receiver the handle reports itself closed and presence stops
/// counting it.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, outbound: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self { id, outbound }
    }

    /// Fresh handle plus the receiver the socket writer drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(ConnectionId::new(), tx), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    /// Fire-and-forget. Returns false when the connection is already gone.
    pub fn send(&self, event: ServerEvent) -> bool {
        if self.outbound.send(event).is_err() {
            debug!("Dropping event for closed connection {}", self.id);
            return false;
        }
        true
    }
}
