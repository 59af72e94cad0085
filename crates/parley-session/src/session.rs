use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use parley_core::Turn;
use tokio::sync::{Mutex, MutexGuard};

/// One conversation: an identifier plus its ordered turns.
///
/// Turns sit behind a synchronous lock that is only held for the duration of
/// a push or a copy, never across an `.await`. The exchange gate is an async
/// mutex that callers hold for a whole request/response exchange.
#[derive(Debug)]
pub struct Session {
    id: String,
    turns: RwLock<Vec<Turn>>,
    exchange: Mutex<()>,
    created_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            turns: RwLock::new(Vec::new()),
            exchange: Mutex::new(()),
            created_at: Utc::now(),
        }
    }

    /// Caller-supplied session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the session was first referenced.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Snapshot of the turns, oldest first.
    pub fn turns(&self) -> Vec<Turn> {
        self.turns.read().clone()
    }

    /// Number of recorded turns.
    pub fn turn_count(&self) -> usize {
        self.turns.read().len()
    }

    /// Waits until no other exchange is in flight for this session.
    ///
    /// The returned guard serializes request/response exchanges so a user
    /// turn is always followed by its own assistant turn.
    pub async fn begin_exchange(&self) -> MutexGuard<'_, ()> {
        self.exchange.lock().await
    }

    pub(crate) fn push(&self, turn: Turn) {
        self.turns.write().push(turn);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use parley_core::Role;

    #[test]
    fn test_push_preserves_order() {
        let session = Session::new("s1");
        session.push(Turn::user("one"));
        session.push(Turn::assistant("two"));

        let turns = session.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].content, "two");
        assert!(turns[0].timestamp >= session.created_at());
    }

    #[tokio::test]
    async fn test_exchange_gate_is_exclusive() {
        let session = Session::new("s1");
        let guard = session.begin_exchange().await;
        assert!(session.exchange.try_lock().is_err());
        drop(guard);
        assert!(session.exchange.try_lock().is_ok());
    }
}
