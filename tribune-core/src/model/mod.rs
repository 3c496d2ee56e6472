mod message;
mod peer;
mod protocol;
mod room;
mod signaling;
mod turn;

pub use message::ChatMessage;
pub use peer::{ConnectionId, Identity, UserId};
pub use protocol::{
    AckPayload, ClientEvent, ClientFrame, ErrorBody, ErrorKind, ParticipantsUpdate, PeerInfo,
    PresentParticipant, RoomSummary, ServerEvent, SystemNotice, TextJoinAck, VoiceJoinAck,
};
pub use room::{
    ChannelKind, DebateFormat, DebateMode, DebateParticipant, DebateRecord, DebateStatus, Role,
    RoomId,
};
pub use signaling::{IceServerConfig, SignalKind};
pub use turn::TurnSnapshot;
