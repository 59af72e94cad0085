use crate::session::Session;
use async_trait::async_trait;
use parking_lot::RwLock;
use parley_core::{validate_non_empty, ParleyResult, Role, Turn};
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::Arc;
use tracing::debug;

/// Number of partitions used by [`InMemorySessionStore::new`].
pub const DEFAULT_SHARDS: usize = 16;

/// Storage for conversation sessions.
///
/// Implementations must guarantee exactly one [`Session`] per identifier, even
/// when several requests reference a new identifier at the same time.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the session for `session_id`, creating it on first reference.
    async fn get_or_create(&self, session_id: &str) -> ParleyResult<Arc<Session>>;

    /// Appends a turn to the session, creating the session if needed.
    async fn append_turn(&self, session_id: &str, role: Role, content: &str)
        -> ParleyResult<Turn>;

    /// Ordered copy of a session's turns; empty for unknown sessions.
    async fn history(&self, session_id: &str) -> Vec<Turn>;

    /// Number of sessions currently held.
    async fn session_count(&self) -> usize;
}

type Shard = RwLock<HashMap<String, Arc<Session>>>;

/// In-process session store, sharded by a hash of the session identifier.
///
/// Each shard has its own lock, so unrelated sessions rarely contend. Locks are
/// synchronous and never held across an `.await`.
pub struct InMemorySessionStore {
    shards: Vec<Shard>,
    hasher: RandomState,
}

impl InMemorySessionStore {
    /// Creates a store with [`DEFAULT_SHARDS`] partitions.
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Creates a store with `count` partitions (at least one).
    pub fn with_shards(count: usize) -> Self {
        let count = count.max(1);
        Self {
            shards: (0..count).map(|_| RwLock::new(HashMap::new())).collect(),
            hasher: RandomState::new(),
        }
    }

    fn shard(&self, session_id: &str) -> &Shard {
        let index = (self.hasher.hash_one(session_id) % self.shards.len() as u64) as usize;
        &self.shards[index]
    }

    fn lookup(&self, session_id: &str) -> Option<Arc<Session>> {
        self.shard(session_id).read().get(session_id).cloned()
    }

    fn lookup_or_insert(&self, session_id: &str) -> ParleyResult<Arc<Session>> {
        let session_id = validate_non_empty("session_id", session_id)?;

        if let Some(existing) = self.lookup(session_id) {
            return Ok(existing);
        }

        // Re-check under the write lock: another request may have created it
        // between the read and this point.
        let mut shard = self.shard(session_id).write();
        let session = shard
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!(session_id = %session_id, "Creating new session");
                Arc::new(Session::new(session_id))
            })
            .clone();
        Ok(session)
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, session_id: &str) -> ParleyResult<Arc<Session>> {
        self.lookup_or_insert(session_id)
    }

    async fn append_turn(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> ParleyResult<Turn> {
        let session = self.lookup_or_insert(session_id)?;
        let turn = Turn::new(role, content);
        session.push(turn.clone());
        debug!(
            session_id = %session_id,
            role = role.as_str(),
            turns = session.turn_count(),
            "Appended turn"
        );
        Ok(turn)
    }

    async fn history(&self, session_id: &str) -> Vec<Turn> {
        self.lookup(session_id)
            .map(|s| s.turns())
            .unwrap_or_default()
    }

    async fn session_count(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }
}
