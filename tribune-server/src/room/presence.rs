use crate::transport::ConnectionHandle;
use tribune_core::{ConnectionId, Identity, PeerInfo, PresentParticipant, Role, ServerEvent, UserId};

#[derive(Debug)]
pub struct Participant {
    pub identity: Identity,
    pub role: Role,
    handles: Vec<ConnectionHandle>,
}

impl Participant {
    fn live_handles(&self) -> impl Iterator<Item = &ConnectionHandle> {
        self.handles.iter().filter(|h| !h.is_closed())
    }

    fn is_live(&self) -> bool {
        self.live_handles().next().is_some()
    }

    /// Most recently registered live handle; used for addressed delivery.
    fn latest(&self) -> Option<&ConnectionHandle> {
        self.handles.iter().rev().find(|h| !h.is_closed())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unregistered {
    pub participant_removed: bool,
    pub remaining: usize,
}

/// Who is in the room and how to reach them. Kept in join order.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    participants: Vec<Participant>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when `identity` was not present before.
    pub fn register(&mut self, identity: Identity, role: Role, handle: ConnectionHandle) -> bool {
        if let Some(existing) = self
            .participants
            .iter_mut()
            .find(|p| p.identity.user_id == identity.user_id)
        {
            let was_live = existing.is_live();
            existing.handles.retain(|h| h.id() != handle.id() && !h.is_closed());
            existing.handles.push(handle);
            existing.identity.display_name = identity.display_name;
            existing.role = role;
            return !was_live;
        }

        self.participants.push(Participant {
            identity,
            role,
            handles: vec![handle],
        });
        true
    }

    pub fn unregister(&mut self, user_id: &UserId, connection: ConnectionId) -> Unregistered {
        let mut participant_removed = false;

        if let Some(idx) = self
            .participants
            .iter()
            .position(|p| &p.identity.user_id == user_id)
        {
            let participant = &mut self.participants[idx];
            participant
                .handles
                .retain(|h| h.id() != connection && !h.is_closed());

            if participant.handles.is_empty() {
                self.participants.remove(idx);
                participant_removed = true;
            }
        }

        Unregistered {
            participant_removed,
            remaining: self.count(),
        }
    }

    /// Drops every handle whose connection has gone away and returns the
    /// participants that no longer have any.
    pub fn prune_closed(&mut self) -> Vec<Identity> {
        let mut gone = Vec::new();
        self.participants.retain_mut(|p| {
            p.handles.retain(|h| !h.is_closed());
            if p.handles.is_empty() {
                gone.push(p.identity.clone());
                return false;
            }
            true
        });
        gone
    }

    pub fn count(&self) -> usize {
        self.participants.iter().filter(|p| p.is_live()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.get(user_id).is_some()
    }

    pub fn get(&self, user_id: &UserId) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| &p.identity.user_id == user_id && p.is_live())
    }

    pub fn route(&self, user_id: &UserId) -> Option<&ConnectionHandle> {
        self.get(user_id).and_then(Participant::latest)
    }

    pub fn list_peers(&self, excluding: Option<&UserId>) -> Vec<(Identity, ConnectionHandle)> {
        self.participants
            .iter()
            .filter(|p| Some(&p.identity.user_id) != excluding)
            .filter_map(|p| p.latest().map(|h| (p.identity.clone(), h.clone())))
            .collect()
    }

    pub fn peer_infos(&self, excluding: Option<&UserId>) -> Vec<PeerInfo> {
        self.list_peers(excluding)
            .into_iter()
            .map(|(identity, _)| PeerInfo {
                user_id: identity.user_id,
                display_name: identity.display_name,
            })
            .collect()
    }

    pub fn snapshot(&self) -> Vec<PresentParticipant> {
        self.participants
            .iter()
            .filter(|p| p.is_live())
            .map(|p| PresentParticipant {
                user_id: p.identity.user_id.clone(),
                display_name: p.identity.display_name.clone(),
                role: p.role,
            })
            .collect()
    }

    /// Sends to every live connection in the room.
    pub fn broadcast(&self, event: &ServerEvent) {
        self.broadcast_except(None, event);
    }

    pub fn broadcast_except(&self, excluding: Option<&UserId>, event: &ServerEvent) {
        for participant in &self.participants {
            if Some(&participant.identity.user_id) == excluding {
                continue;
            }
            for handle in participant.live_handles() {
                handle.send(event.clone());
            }
        }
    }

    pub fn clear(&mut self) {
        self.participants.clear();
    }
}
