use anyhow::Context;
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::Path;
use tracing::info;
use tribune_core::{DebateRecord, DebateStatus, RoomId, UserId};

/// Read side of the external debate service.
///
/// Implementations may perform network or database I/O. Callers never hold
/// room state across these calls.
#[async_trait]
pub trait DebateDirectory: Send + Sync + 'static {
    async fn get_debate(&self, id: &RoomId) -> anyhow::Result<Option<DebateRecord>>;

    async fn is_participant(&self, id: &RoomId, user_id: &UserId) -> anyhow::Result<bool>;
}

/// Directory held in process memory, optionally seeded from a JSON file.
#[derive(Default)]
pub struct InMemoryDebateDirectory {
    debates: DashMap<RoomId, DebateRecord>,
}

impl InMemoryDebateDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debates(debates: impl IntoIterator<Item = DebateRecord>) -> Self {
        let directory = Self::new();
        for debate in debates {
            directory.insert(debate);
        }
        directory
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading debates file {}", path.display()))?;
        let debates: Vec<DebateRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing debates file {}", path.display()))?;

        info!("Loaded {} debates from {}", debates.len(), path.display());
        Ok(Self::with_debates(debates))
    }

    pub fn insert(&self, debate: DebateRecord) {
        self.debates.insert(debate.id.clone(), debate);
    }

    pub fn remove(&self, id: &RoomId) -> Option<DebateRecord> {
        self.debates.remove(id).map(|(_, debate)| debate)
    }

    pub fn set_status(&self, id: &RoomId, status: DebateStatus) -> bool {
        let Some(mut debate) = self.debates.get_mut(id) else {
            return false;
        };
        debate.status = status;
        true
    }

    pub fn len(&self) -> usize {
        self.debates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.debates.is_empty()
    }
}

#[async_trait]
impl DebateDirectory for InMemoryDebateDirectory {
    async fn get_debate(&self, id: &RoomId) -> anyhow::Result<Option<DebateRecord>> {
        Ok(self.debates.get(id).map(|d| d.value().clone()))
    }

    async fn is_participant(&self, id: &RoomId, user_id: &UserId) -> anyhow::Result<bool> {
        Ok(self
            .debates
            .get(id)
            .is_some_and(|d| d.participant(user_id).is_some()))
    }
}
