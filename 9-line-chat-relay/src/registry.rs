//! Active-session registry shared by the listener, the broadcaster and the
//! shutdown coordinator.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use tokio::sync::Mutex;

use crate::session::{Outbox, SessionId};

pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Outbox>>,
    next_id: AtomicU64,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocates an id for a fresh connection and records its outbox.
    pub async fn register(&self, outbox: Outbox) -> SessionId {
        let id = SessionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sessions.lock().await.insert(id, outbox);
        id
    }

    /// Returns whether the session was still registered.
    pub async fn remove(&self, id: SessionId) -> bool {
        self.sessions.lock().await.remove(&id).is_some()
    }

    pub async fn outbox(&self, id: SessionId) -> Option<Outbox> {
        self.sessions.lock().await.get(&id).cloned()
    }

    /// Looks up outboxes for `ids` under one lock; `None` marks a session that
    /// has already gone.
    pub async fn outboxes<'a, I>(&self, ids: I) -> Vec<(SessionId, Option<Outbox>)>
    where
        I: IntoIterator<Item = &'a SessionId>,
    {
        let sessions = self.sessions.lock().await;
        ids.into_iter()
            .map(|id| (*id, sessions.get(id).cloned()))
            .collect()
    }

    /// Consistent copy of every active session, taken under the lock.
    pub async fn snapshot(&self) -> Vec<(SessionId, Outbox)> {
        let sessions = self.sessions.lock().await;
        sessions
            .iter()
            .map(|(id, outbox)| (*id, outbox.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
