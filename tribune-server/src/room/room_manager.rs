use crate::config::RoomConfig;
use crate::directory::DebateDirectory;
use crate::error::{RoomError, RoomResult};
use crate::room::membership::{Admission, MembershipGuard};
use crate::room::room_command::{Closure, JoinOutcome, Reply, RoomCommand, RoomSnapshot, TurnAction};
use crate::room::Room;
use crate::transport::ConnectionHandle;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use tribune_core::{
    ChannelKind, ChatMessage, ConnectionId, IceServerConfig, Identity, RoomId, SignalKind, UserId,
};

const ROOM_QUEUE_CAPACITY: usize = 256;
const JOIN_ATTEMPTS: usize = 3;

/// Registry entry for a live room actor.
#[derive(Clone)]
pub struct RoomHandle {
    pub(crate) tx: mpsc::Sender<RoomCommand>,
    pub(crate) generation: u64,
}

/// Process-wide registry of live rooms.
///
/// Rooms are spawned lazily on the first authorized join and remove
/// themselves once they have been empty for the grace period or the debate
/// closes upstream. A room only ever removes the entry carrying its own
/// generation, so a replacement room spawned meanwhile is left alone.
///
/// Debates closed or deleted upstream are remembered in `ended`, so a join
/// authorized just before the closure cannot spawn a fresh room for them.
#[derive(Clone)]
pub struct RoomManager {
    rooms: Arc<DashMap<RoomId, RoomHandle>>,
    ended: Arc<DashMap<RoomId, Closure>>,
    guard: MembershipGuard,
    config: RoomConfig,
    ice_servers: Arc<Vec<IceServerConfig>>,
    generations: Arc<AtomicU64>,
}

impl RoomManager {
    pub fn new(
        directory: Arc<dyn DebateDirectory>,
        config: RoomConfig,
        ice_servers: Vec<IceServerConfig>,
    ) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            ended: Arc::new(DashMap::new()),
            guard: MembershipGuard::new(directory),
            config,
            ice_servers: Arc::new(ice_servers),
            generations: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn ice_servers(&self) -> Vec<IceServerConfig> {
        self.ice_servers.as_ref().clone()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn has_room(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Authorize, then apply the join inside the room.
    ///
    /// The directory lookup happens here, on the caller's task, so a slow
    /// collaborator never stalls the room for everyone else.
    pub async fn join(
        &self,
        room_id: &RoomId,
        identity: &Identity,
        channel: ChannelKind,
        connection: ConnectionHandle,
    ) -> RoomResult<JoinOutcome> {
        let admission = self.guard.authorize(room_id, identity, channel).await?;

        for _ in 0..JOIN_ATTEMPTS {
            let handle = self.get_or_create(&admission)?;
            let (reply, rx) = oneshot::channel();
            let cmd = RoomCommand::Join {
                admission: admission.clone(),
                connection: connection.clone(),
                reply,
            };

            if handle.tx.send(cmd).await.is_err() {
                debug!("Room {} closed under us, retrying join", room_id);
                self.forget(room_id, handle.generation);
                continue;
            }

            match rx.await {
                Ok(Err(RoomError::RoomUnavailable)) | Err(_) => {
                    self.forget(room_id, handle.generation);
                }
                Ok(result) => return result,
            }
        }

        warn!("Giving up joining {} for {}", room_id, identity.user_id);
        Err(RoomError::RoomUnavailable)
    }

    pub async fn leave(&self, room_id: &RoomId, user_id: &UserId, connection: ConnectionId) {
        self.dispatch(
            room_id,
            RoomCommand::Leave {
                user_id: user_id.clone(),
                connection,
            },
        )
        .await;
    }

    pub async fn disconnect(&self, room_id: &RoomId, user_id: &UserId, connection: ConnectionId) {
        self.dispatch(
            room_id,
            RoomCommand::Disconnect {
                user_id: user_id.clone(),
                connection,
            },
        )
        .await;
    }

    pub async fn typing(&self, room_id: &RoomId, user_id: &UserId, typing: bool) {
        self.dispatch(
            room_id,
            RoomCommand::Typing {
                user_id: user_id.clone(),
                typing,
            },
        )
        .await;
    }

    pub async fn send_message(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        content: String,
    ) -> RoomResult<ChatMessage> {
        self.request(room_id, |reply| RoomCommand::SendMessage {
            user_id: user_id.clone(),
            content,
            reply,
        })
        .await
    }

    pub async fn turn(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        action: TurnAction,
    ) -> RoomResult<()> {
        self.request(room_id, |reply| RoomCommand::Turn {
            user_id: user_id.clone(),
            action,
            reply,
        })
        .await
    }

    pub async fn signal(
        &self,
        room_id: &RoomId,
        from: &UserId,
        to: &UserId,
        kind: SignalKind,
        payload: Value,
    ) -> RoomResult<()> {
        self.request(room_id, |reply| RoomCommand::Signal {
            from: from.clone(),
            to: to.clone(),
            kind,
            payload,
            reply,
        })
        .await
    }

    /// The debate service reports the record closed or deleted.
    /// Returns false when no room was live for it.
    pub async fn close_room(&self, room_id: &RoomId, closure: Closure) -> bool {
        // Recorded before the lookup: a join that slipped past the check is
        // either applied before the Close or bounced into a retry that sees it.
        self.ended.insert(room_id.clone(), closure);
        let Some(tx) = self.sender(room_id) else {
            return false;
        };
        info!("Closing room {}: {:?}", room_id, closure);
        tx.send(RoomCommand::Close { closure }).await.is_ok()
    }

    /// The debate is open again upstream; joins may spawn a room for it.
    pub fn reopen(&self, room_id: &RoomId) -> bool {
        self.ended.remove(room_id).is_some()
    }

    pub async fn inspect(&self, room_id: &RoomId) -> Option<RoomSnapshot> {
        let tx = self.sender(room_id)?;
        let (reply, rx) = oneshot::channel();
        tx.send(RoomCommand::Inspect { reply }).await.ok()?;
        rx.await.ok()
    }

    async fn request<T>(
        &self,
        room_id: &RoomId,
        build: impl FnOnce(Reply<T>) -> RoomCommand,
    ) -> RoomResult<T> {
        let (reply, rx) = oneshot::channel();
        self.dispatch(room_id, build(reply)).await;
        rx.await.unwrap_or(Err(RoomError::RoomUnavailable))
    }

    /// Non-join commands never create a room: nobody can be present in a
    /// room that does not exist.
    async fn dispatch(&self, room_id: &RoomId, cmd: RoomCommand) {
        let Some(tx) = self.sender(room_id) else {
            cmd.reject(|| RoomError::NotPresent);
            return;
        };
        if let Err(mpsc::error::SendError(cmd)) = tx.send(cmd).await {
            cmd.reject(|| RoomError::NotPresent);
        }
    }

    fn sender(&self, room_id: &RoomId) -> Option<mpsc::Sender<RoomCommand>> {
        self.rooms.get(room_id).map(|handle| handle.tx.clone())
    }

    fn get_or_create(&self, admission: &Admission) -> RoomResult<RoomHandle> {
        let room_id = admission.debate.id.clone();
        let entry = self.rooms.entry(room_id);
        self.ensure_open(entry.key())?;

        let mut handle = match entry {
            Entry::Occupied(occupied) => occupied.into_ref(),
            Entry::Vacant(vacant) => vacant.insert(self.spawn_room(admission)),
        };
        if handle.tx.is_closed() {
            *handle = self.spawn_room(admission);
        }
        Ok(handle.value().clone())
    }

    fn ensure_open(&self, room_id: &RoomId) -> RoomResult<()> {
        match self.ended.get(room_id).map(|closure| *closure) {
            Some(Closure::Closed) => Err(RoomError::Closed),
            Some(Closure::Deleted) => Err(RoomError::NotFound),
            None => Ok(()),
        }
    }

    fn spawn_room(&self, admission: &Admission) -> RoomHandle {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        info!("Creating new room: {} (generation {})", admission.debate.id, generation);

        let (tx, rx) = mpsc::channel(ROOM_QUEUE_CAPACITY);
        let room = Room::new(
            admission,
            generation,
            self.config.clone(),
            rx,
            tx.downgrade(),
            self.rooms.clone(),
        );
        tokio::spawn(room.run());

        RoomHandle { tx, generation }
    }

    fn forget(&self, room_id: &RoomId, generation: u64) {
        self.rooms
            .remove_if(room_id, |_, handle| handle.generation == generation);
    }
}
