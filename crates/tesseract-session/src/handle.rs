//! Handles to a connection's outbound queue.

use tesseract_protocol::ServerEvent;
use tesseract_transport::ConnectionId;
use tokio::sync::mpsc;

/// Something the connection task should do on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Send this event to the client.
    Event(ServerEvent),
    /// Close the connection. Anything queued before this is sent first.
    Close,
}

/// A cloneable handle for talking to one connection from anywhere.
///
/// The connection's own task owns the socket and drains the receiving end
/// of the queue. Everything else (the registry in particular) goes through
/// this handle, so emitting or disconnecting never blocks on the peer.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<Outbound>,
}

impl SessionHandle {
    /// Creates a handle for connection `id` and the receiver its task
    /// should drain.
    pub fn channel(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { id, sender }, receiver)
    }

    /// The connection this handle points at.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues `event` for the client. Returns `false` if the connection's
    /// task is already gone.
    pub fn emit(&self, event: ServerEvent) -> bool {
        self.sender.send(Outbound::Event(event)).is_ok()
    }

    /// Asks the connection's task to close the connection.
    pub fn disconnect(&self) -> bool {
        self.sender.send(Outbound::Close).is_ok()
    }
}
