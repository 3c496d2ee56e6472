use crate::model::message::ChatMessage;
use crate::model::peer::UserId;
use crate::model::room::{DebateFormat, DebateMode, DebateParticipant, DebateStatus, Role, RoomId};
use crate::model::signaling::IceServerConfig;
use crate::model::turn::TurnSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A client request. `ack` is echoed back in the matching [`ServerEvent::Ack`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
    pub event: ClientEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", content = "d", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinRoom {
        room_id: RoomId,
    },
    LeaveRoom {
        room_id: RoomId,
    },
    Typing {
        room_id: RoomId,
        typing: bool,
    },
    SendMessage {
        room_id: RoomId,
        content: String,
    },
    RequestSpeak {
        room_id: RoomId,
    },
    CancelRequest {
        room_id: RoomId,
    },
    ReleaseTurn {
        room_id: RoomId,
    },
    ModeratorGrant {
        room_id: RoomId,
        target: UserId,
    },
    ModeratorRevoke {
        room_id: RoomId,
    },
    ModeratorNext {
        room_id: RoomId,
    },
    JoinVoiceRoom {
        room_id: RoomId,
    },
    LeaveVoiceRoom {
        room_id: RoomId,
    },
    SendOffer {
        room_id: RoomId,
        target: UserId,
        description: Value,
    },
    SendAnswer {
        room_id: RoomId,
        target: UserId,
        description: Value,
    },
    SendIce {
        room_id: RoomId,
        target: UserId,
        candidate: Value,
    },
}

impl ClientEvent {
    pub fn room_id(&self) -> &RoomId {
        match self {
            ClientEvent::JoinRoom { room_id }
            | ClientEvent::LeaveRoom { room_id }
            | ClientEvent::Typing { room_id, .. }
            | ClientEvent::SendMessage { room_id, .. }
            | ClientEvent::RequestSpeak { room_id }
            | ClientEvent::CancelRequest { room_id }
            | ClientEvent::ReleaseTurn { room_id }
            | ClientEvent::ModeratorGrant { room_id, .. }
            | ClientEvent::ModeratorRevoke { room_id }
            | ClientEvent::ModeratorNext { room_id }
            | ClientEvent::JoinVoiceRoom { room_id }
            | ClientEvent::LeaveVoiceRoom { room_id }
            | ClientEvent::SendOffer { room_id, .. }
            | ClientEvent::SendAnswer { room_id, .. }
            | ClientEvent::SendIce { room_id, .. } => room_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", content = "d", rename_all = "snake_case")]
pub enum ServerEvent {
    Ack(AckPayload),
    Message {
        room_id: RoomId,
        message: ChatMessage,
    },
    Typing {
        room_id: RoomId,
        user_id: UserId,
        typing: bool,
    },
    System {
        room_id: RoomId,
        notice: SystemNotice,
    },
    TurnState {
        room_id: RoomId,
        state: TurnSnapshot,
    },
    QueueUpdated {
        room_id: RoomId,
        queue: Vec<UserId>,
    },
    ParticipantsUpdate(ParticipantsUpdate),
    PeerJoined {
        room_id: RoomId,
        peer: PeerInfo,
    },
    PeerLeft {
        room_id: RoomId,
        user_id: UserId,
    },
    Offer {
        room_id: RoomId,
        from: UserId,
        description: Value,
    },
    Answer {
        room_id: RoomId,
        from: UserId,
        description: Value,
    },
    Ice {
        room_id: RoomId,
        from: UserId,
        candidate: Value,
    },
    DebateDeleted {
        room_id: RoomId,
    },
    DebateClosed {
        room_id: RoomId,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SystemNotice {
    UserJoined { user_id: UserId, display_name: String },
    UserLeft { user_id: UserId },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantsUpdate {
    pub room_id: RoomId,
    pub participants: Vec<PresentParticipant>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresentParticipant {
    pub user_id: UserId,
    pub display_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeerInfo {
    pub user_id: UserId,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    NotFound,
    InvalidState,
    TurnViolation,
    PeerUnreachable,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AckPayload {
    pub ack: u64,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl AckPayload {
    pub fn success(ack: u64, data: Option<Value>) -> Self {
        Self {
            ack,
            ok: true,
            data,
            error: None,
        }
    }

    pub fn failure(ack: u64, error: ErrorBody) -> Self {
        Self {
            ack,
            ok: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Snapshot of a room handed to a joiner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomSummary {
    pub id: RoomId,
    pub title: String,
    pub format: DebateFormat,
    pub mode: DebateMode,
    pub status: DebateStatus,
    pub debate_participants: Vec<DebateParticipant>,
    pub present: Vec<PresentParticipant>,
    pub turn: Option<TurnSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextJoinAck {
    pub history: Vec<ChatMessage>,
    pub room: RoomSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoiceJoinAck {
    pub peers: Vec<PeerInfo>,
    pub ice_servers: Vec<IceServerConfig>,
    pub room: RoomSummary,
}
