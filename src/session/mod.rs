use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
    },
    time::Duration,
};

use tokio::{
    sync::{
        Mutex as AsyncMutex,
        OwnedMutexGuard,
    },
    time::Instant,
};

use crate::core::Identity;

pub mod state;

pub use state::{
    transition,
    Effect,
    Input,
    Phase,
    SessionState,
    SpellReply,
    WordOrigin,
};

type SharedSession = Arc<AsyncMutex<SessionState>>;

/// Per-identity sessions. Holding the guard returned by [`SessionStore::lock`] serializes
/// all processing for that identity.
pub struct SessionStore {
    sessions: Mutex<HashMap<Identity, SharedSession>>,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(timeout: Duration) -> Self {
        Self { sessions: Mutex::new(HashMap::new()), timeout }
    }

    fn map(&self) -> MutexGuard<'_, HashMap<Identity, SharedSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits for the identity's session, creating it on first contact and resetting it if
    /// it expired.
    pub async fn lock(&self, identity: &Identity) -> OwnedMutexGuard<SessionState> {
        let session = {
            let mut sessions = self.map();
            Arc::clone(sessions.entry(identity.clone()).or_insert_with(|| {
                log::debug!("New session for {}", identity);
                Arc::new(AsyncMutex::new(SessionState::new(identity.clone(), Instant::now())))
            }))
        };

        let mut guard = session.lock_owned().await;
        guard.refresh(Instant::now(), self.timeout);
        guard
    }

    /// Current phase without touching activity time. `None` for unknown or busy sessions.
    pub fn peek(&self, identity: &Identity) -> Option<Phase> {
        let session = self.map().get(identity).cloned()?;
        let phase = session.try_lock().ok().map(|s| s.phase.clone());
        phase
    }

    /// Sessions used within the timeout. Sessions busy right now count as active.
    pub fn active_count(&self) -> usize {
        let now = Instant::now();
        self.map()
            .values()
            .filter(|session| match session.try_lock() {
                Ok(state) => !state.is_expired(now, self.timeout),
                Err(_) => true,
            })
            .count()
    }

    /// Drops expired sessions nobody is holding.
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.map();
        let before = sessions.len();
        sessions.retain(|_, session| match session.try_lock() {
            Ok(state) => !state.is_expired(now, self.timeout),
            Err(_) => true,
        });
        before - sessions.len()
    }

    pub fn clear_all(&self) -> usize {
        let mut sessions = self.map();
        let count = sessions.len();
        sessions.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(30 * 60);

    #[tokio::test]
    async fn test_sessions_are_per_identity() {
        let store = SessionStore::new(TIMEOUT);
        let alice = Identity::from("alice");
        let bob = Identity::from("bob");

        {
            let mut session = store.lock(&alice).await;
            session.apply(Input::Revoke);
        }
        let _bob_session = store.lock(&bob).await;

        assert_eq!(store.peek(&alice), Some(Phase::AwaitingRevokeConfirm));
        assert_eq!(store.peek(&bob), None);
        assert_eq!(store.active_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session_is_reset_on_next_lock() {
        let store = SessionStore::new(TIMEOUT);
        let alice = Identity::from("alice");
        store.lock(&alice).await.apply(Input::Revoke);

        tokio::time::advance(TIMEOUT + Duration::from_secs(1)).await;
        assert_eq!(store.active_count(), 0);

        let session = store.lock(&alice).await;
        assert_eq!(session.phase, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_and_clear() {
        let store = SessionStore::new(TIMEOUT);
        drop(store.lock(&Identity::from("alice")).await);
        tokio::time::advance(TIMEOUT + Duration::from_secs(1)).await;
        drop(store.lock(&Identity::from("bob")).await);

        assert_eq!(store.prune(), 1);
        assert_eq!(store.clear_all(), 1);
        assert_eq!(store.active_count(), 0);
    }

    #[tokio::test]
    async fn test_same_identity_is_serialized() {
        let store = Arc::new(SessionStore::new(TIMEOUT));
        let alice = Identity::from("alice");

        let first = store.lock(&alice).await;
        let waiter = {
            let store = Arc::clone(&store);
            let alice = alice.clone();
            tokio::spawn(async move { store.lock(&alice).await.phase.clone() })
        };

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        drop(first);
        assert_eq!(waiter.await.unwrap(), Phase::Idle);
    }
}
