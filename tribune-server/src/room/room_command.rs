use crate::error::{RoomError, RoomResult};
use crate::room::membership::Admission;
use crate::transport::ConnectionHandle;
use serde_json::Value;
use tokio::sync::oneshot;
use tribune_core::{
    ChatMessage, ConnectionId, PeerInfo, PresentParticipant, RoomSummary, SignalKind,
    TurnSnapshot, UserId,
};

/// Floor operations a participant can ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnAction {
    RequestSpeak,
    CancelRequest,
    Release,
    Grant(UserId),
    Revoke,
    Next,
}

/// What a successful join hands back to the joining connection.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub history: Vec<ChatMessage>,
    pub peers: Vec<PeerInfo>,
    pub room: RoomSummary,
}

/// Debug view of a live room.
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub generation: u64,
    pub present: Vec<PresentParticipant>,
    pub turn: Option<TurnSnapshot>,
    pub history_len: usize,
}

/// Why the debate service is shutting a room down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closure {
    Closed,
    Deleted,
}

pub type Reply<T> = oneshot::Sender<RoomResult<T>>;

/// Everything that can mutate a room. Inbound client events and timer
/// firings share this one queue, so the room applies them strictly in order.
#[derive(Debug)]
pub enum RoomCommand {
    /// Membership already checked; apply it.
    Join {
        admission: Admission,
        connection: ConnectionHandle,
        reply: Reply<JoinOutcome>,
    },

    /// One connection leaves explicitly.
    Leave {
        user_id: UserId,
        connection: ConnectionId,
    },

    /// The socket went away.
    Disconnect {
        user_id: UserId,
        connection: ConnectionId,
    },

    Typing {
        user_id: UserId,
        typing: bool,
    },

    SendMessage {
        user_id: UserId,
        content: String,
        reply: Reply<ChatMessage>,
    },

    Turn {
        user_id: UserId,
        action: TurnAction,
        reply: Reply<()>,
    },

    Signal {
        from: UserId,
        to: UserId,
        kind: SignalKind,
        payload: Value,
        reply: Reply<()>,
    },

    /// Armed by the room itself when a turn-based speaker takes the floor.
    TurnDeadline { epoch: u64 },

    /// Armed by the room itself when the last participant left.
    GraceExpired { token: u64 },

    /// The debate record was closed or deleted upstream.
    Close { closure: Closure },

    Inspect {
        reply: oneshot::Sender<RoomSnapshot>,
    },
}

impl RoomCommand {
    /// Answer a command that will never be processed.
    pub fn reject(self, err: fn() -> RoomError) {
        match self {
            RoomCommand::Join { reply, .. } => {
                let _ = reply.send(Err(err()));
            }
            RoomCommand::SendMessage { reply, .. } => {
                let _ = reply.send(Err(err()));
            }
            RoomCommand::Turn { reply, .. } | RoomCommand::Signal { reply, .. } => {
                let _ = reply.send(Err(err()));
            }
            _ => {}
        }
    }
}
