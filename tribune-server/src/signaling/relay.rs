use crate::error::{RoomError, RoomResult};
use crate::room::PresenceRegistry;
use serde_json::Value;
use tracing::debug;
use tribune_core::{DebateFormat, RoomId, ServerEvent, SignalKind, UserId};

/// Addressed forwarding of negotiation envelopes inside a voice room.
///
/// Holds no per-pair state. Ordering for a (from, to) pair comes from the
/// room processing commands one at a time and each connection draining a
/// single FIFO queue.
#[derive(Debug, Default)]
pub struct SignalingRelay {
    delivered: u64,
    dropped: u64,
}

impl SignalingRelay {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn relay(
        &mut self,
        room_id: &RoomId,
        format: DebateFormat,
        presence: &PresenceRegistry,
        from: &UserId,
        to: &UserId,
        kind: SignalKind,
        payload: Value,
    ) -> RoomResult<()> {
        if format != DebateFormat::Voice {
            return Err(RoomError::FormatMismatch);
        }
        if !presence.contains(from) {
            return Err(RoomError::NotPresent);
        }

        let Some(target) = presence.route(to) else {
            self.dropped += 1;
            debug!("Dropping {:?} from {} to absent peer {}", kind, from, to);
            return Err(RoomError::PeerUnreachable(to.clone()));
        };

        let room_id = room_id.clone();
        let from = from.clone();
        let event = match kind {
            SignalKind::Offer => ServerEvent::Offer {
                room_id,
                from,
                description: payload,
            },
            SignalKind::Answer => ServerEvent::Answer {
                room_id,
                from,
                description: payload,
            },
            SignalKind::Ice => ServerEvent::Ice {
                room_id,
                from,
                candidate: payload,
            },
        };

        if !target.send(event) {
            self.dropped += 1;
            return Err(RoomError::PeerUnreachable(to.clone()));
        }
        self.delivered += 1;
        Ok(())
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
