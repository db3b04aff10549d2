//! In-memory session store.
//!
//! The store owns every live [`Session`]. Each id gets its own slot with a turn
//! lock, so mutating turns on one session run one at a time while sessions
//! never contend with each other. Reads take a snapshot and skip the turn lock.
//!
//! Reset does not wait for an in-flight turn: it marks the session `Reset` and
//! unregisters it at once. The turn then fails its commit check instead of
//! writing into a released session.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::error::{ArticleError, Result};
use crate::models::{Session, SessionState, SessionSummary};

struct Slot {
    turn: Arc<Mutex<()>>,
    session: RwLock<Session>,
}

#[derive(Clone, Default)]
pub struct SessionStore {
    slots: Arc<RwLock<HashMap<Uuid, Arc<Slot>>>>,
}

/// Exclusive right to run one turn against a session.
///
/// Held from before the backend call until the result is committed.
pub struct TurnGuard {
    id: Uuid,
    slot: Arc<Slot>,
    _turn: OwnedMutexGuard<()>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new `Active` session.
    pub async fn create(&self, session: Session) -> Result<SessionSummary> {
        if !session.is_active() {
            return Err(ArticleError::invalid("only active sessions can be stored"));
        }

        let mut slots = self.slots.write().await;
        if slots.contains_key(&session.id) {
            return Err(ArticleError::invalid(format!(
                "session {} already exists",
                session.id
            )));
        }

        let summary = session.summary();
        slots.insert(
            session.id,
            Arc::new(Slot {
                turn: Arc::new(Mutex::new(())),
                session: RwLock::new(session),
            }),
        );
        Ok(summary)
    }

    async fn slot(&self, id: Uuid) -> Result<Arc<Slot>> {
        self.slots
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| ArticleError::not_found(id))
    }

    /// Snapshot of an active session.
    pub async fn get(&self, id: Uuid) -> Result<Session> {
        let slot = self.slot(id).await?;
        let session = slot.session.read().await;
        if !session.is_active() {
            return Err(ArticleError::not_found(id));
        }
        Ok(session.clone())
    }

    /// Summaries of all live sessions, oldest first.
    pub async fn list(&self) -> Vec<SessionSummary> {
        let slots: Vec<Arc<Slot>> = self.slots.read().await.values().cloned().collect();

        let mut summaries = Vec::with_capacity(slots.len());
        for slot in slots {
            let session = slot.session.read().await;
            if session.is_active() {
                summaries.push(session.summary());
            }
        }
        summaries.sort_by_key(|s| s.created_at);
        summaries
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Mark a session `Reset` and release it.
    ///
    /// Returns the final state of the session; unknown ids report
    /// `SessionNotFound`.
    pub async fn delete(&self, id: Uuid) -> Result<Session> {
        let slot = self
            .slots
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| ArticleError::not_found(id))?;

        let mut session = slot.session.write().await;
        session.state = SessionState::Reset;
        Ok(session.clone())
    }

    /// Wait for exclusive turn access to an active session.
    pub async fn begin_turn(&self, id: Uuid) -> Result<TurnGuard> {
        let slot = self.slot(id).await?;
        let turn = slot.turn.clone().lock_owned().await;

        let guard = TurnGuard {
            id,
            slot,
            _turn: turn,
        };
        // The session may have been reset while this turn was queued.
        guard.snapshot().await?;
        Ok(guard)
    }
}

impl TurnGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn snapshot(&self) -> Result<Session> {
        let session = self.slot.session.read().await;
        if !session.is_active() {
            return Err(ArticleError::not_found(self.id));
        }
        Ok(session.clone())
    }

    /// Apply `update` if the session is still active, releasing the turn.
    pub async fn commit<F>(self, update: F) -> Result<Session>
    where
        F: FnOnce(&mut Session),
    {
        let mut session = self.slot.session.write().await;
        if !session.is_active() {
            return Err(ArticleError::not_found(self.id));
        }
        update(&mut session);
        Ok(session.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentBlock;

    fn session() -> Session {
        Session::first_turn(
            Uuid::new_v4(),
            "doc".into(),
            vec![ContentBlock::text("b1", "body")],
            "polish",
            "# Article".into(),
        )
    }

    #[tokio::test]
    async fn turn_commits_while_session_is_active() {
        let store = SessionStore::new();
        let s = session();
        store.create(s.clone()).await.unwrap();

        let turn = store.begin_turn(s.id).await.unwrap();
        let updated = turn
            .commit(|session| session.push_turn("shorter", "# Short".into()))
            .await
            .unwrap();
        assert_eq!(updated.history.len(), 4);
        assert_eq!(store.get(s.id).await.unwrap().current_article, "# Short");
    }

    #[tokio::test]
    async fn turn_fails_commit_after_reset() {
        let store = SessionStore::new();
        let s = session();
        store.create(s.clone()).await.unwrap();

        let turn = store.begin_turn(s.id).await.unwrap();
        let released = store.delete(s.id).await.unwrap();
        assert_eq!(released.state, SessionState::Reset);

        let err = turn
            .commit(|session| session.push_turn("late", "late".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, ArticleError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn second_turn_waits_for_the_first() {
        let store = SessionStore::new();
        let s = session();
        store.create(s.clone()).await.unwrap();

        let first = store.begin_turn(s.id).await.unwrap();
        let store2 = store.clone();
        let id = s.id;
        let waiter = tokio::spawn(async move { store2.begin_turn(id).await.map(|t| t.id()) });

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        first.commit(|_| {}).await.unwrap();
        assert_eq!(waiter.await.unwrap().unwrap(), id);
    }
}
