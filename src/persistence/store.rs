//! Session store contract and implementations
//!
//! Every call is best-effort from the game's point of view: callers log a
//! `StoreError` and carry on, nothing here can fail a session.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::record::{SessionFilter, SessionMeta, SessionRecord, SessionStatus, SessionUpdate};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session store unavailable: {0}")]
    Unavailable(String),

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Persistence collaborator
pub trait SessionStore {
    /// Insert a new record, returning its ID
    fn create_session(&mut self, identity: &str, meta: &SessionMeta) -> Result<String, StoreError>;

    fn update_session(&mut self, id: &str, update: &SessionUpdate) -> Result<(), StoreError>;

    fn get_session(&self, id: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Records for an identity, optionally narrowed to one content ID
    fn query_sessions(
        &self,
        identity: &str,
        content_id: Option<&str>,
        filter: &SessionFilter,
    ) -> Result<Vec<SessionRecord>, StoreError>;
}

/// In-process store (native builds and tests)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    records: Vec<SessionRecord>,
    next_id: u64,
    /// Simulates an unreachable backend
    #[serde(skip)]
    offline: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline {
            Err(StoreError::Unavailable("store offline".into()))
        } else {
            Ok(())
        }
    }
}

impl SessionStore for MemoryStore {
    fn create_session(&mut self, identity: &str, meta: &SessionMeta) -> Result<String, StoreError> {
        self.check_online()?;
        self.next_id += 1;
        let id = format!("session-{}", self.next_id);
        self.records.push(SessionRecord {
            id: id.clone(),
            identity: identity.to_string(),
            content_id: meta.content_id.clone(),
            seed: meta.seed,
            started_at: meta.started_at,
            ended_at: None,
            final_score: None,
            blocks_built: None,
            verdict: None,
            end_reason: None,
            status: SessionStatus::Active,
            survey_completed: false,
        });
        Ok(id)
    }

    fn update_session(&mut self, id: &str, update: &SessionUpdate) -> Result<(), StoreError> {
        self.check_online()?;
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        update.apply(record);
        Ok(())
    }

    fn get_session(&self, id: &str) -> Result<Option<SessionRecord>, StoreError> {
        self.check_online()?;
        Ok(self.records.iter().find(|r| r.id == id).cloned())
    }

    fn query_sessions(
        &self,
        identity: &str,
        content_id: Option<&str>,
        filter: &SessionFilter,
    ) -> Result<Vec<SessionRecord>, StoreError> {
        self.check_online()?;
        Ok(self
            .records
            .iter()
            .filter(|r| r.identity == identity)
            .filter(|r| content_id.is_none_or(|c| r.content_id.as_deref() == Some(c)))
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }
}

/// LocalStorage-backed store (WASM only)
#[cfg(target_arch = "wasm32")]
pub struct LocalStorageStore {
    inner: MemoryStore,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    const STORAGE_KEY: &'static str = "chunk_tower_sessions";

    pub fn load() -> Self {
        let inner = crate::platform::storage_get(Self::STORAGE_KEY)
            .and_then(|json| match serde_json::from_str::<MemoryStore>(&json) {
                Ok(store) => {
                    log::info!("Loaded {} session records", store.records().len());
                    Some(store)
                }
                Err(e) => {
                    log::warn!("Stored sessions unreadable ({}), starting fresh", e);
                    None
                }
            })
            .unwrap_or_default();
        Self { inner }
    }

    fn persist(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string(&self.inner)?;
        if crate::platform::storage_set(Self::STORAGE_KEY, &json) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("LocalStorage write failed".into()))
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl SessionStore for LocalStorageStore {
    fn create_session(&mut self, identity: &str, meta: &SessionMeta) -> Result<String, StoreError> {
        let id = self.inner.create_session(identity, meta)?;
        self.persist()?;
        Ok(id)
    }

    fn update_session(&mut self, id: &str, update: &SessionUpdate) -> Result<(), StoreError> {
        self.inner.update_session(id, update)?;
        self.persist()
    }

    fn get_session(&self, id: &str) -> Result<Option<SessionRecord>, StoreError> {
        self.inner.get_session(id)
    }

    fn query_sessions(
        &self,
        identity: &str,
        content_id: Option<&str>,
        filter: &SessionFilter,
    ) -> Result<Vec<SessionRecord>, StoreError> {
        self.inner.query_sessions(identity, content_id, filter)
    }
}
