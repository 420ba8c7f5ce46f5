//! Session lifecycle: creation, admission, departure and completion.
//!
//! Every membership or status write for one session runs under that session's
//! async mutex, and is then written with a revision compare-and-set. The mutex
//! linearizes writers inside this process; the compare-and-set keeps the
//! participant cap even when several processes share the database. Different
//! sessions never contend.

use std::sync::Arc;

use dashmap::DashMap;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::key::{AlphabeticKeyGenerator, KeyGenerator};
use crate::matches::{compute_matches, MatchRule, SwipeStats};
use crate::model::{
    ConnectionHandle, Direction, Filters, Location, MatchResult, NewSwipe, Participant, Session,
    SessionId, SessionStatus, SwipeRecord,
};
use crate::store::{SessionRepository, SwipeLedger, Versioned};

/// Compare-and-set retries before a membership write gives up.
const MAX_WRITE_ATTEMPTS: usize = 5;

/// Outcome of [`SessionManager::remove_participant`].
#[derive(Clone, Debug, PartialEq)]
pub enum Departure {
    /// Someone is still in the session.
    Remaining(Session),
    /// The last participant left and the session was deleted.
    Retired(SessionId),
}

/// Owns the session state machine on top of a store.
///
/// Cloning is cheap and clones share the per-session locks.
pub struct SessionManager<S, K = AlphabeticKeyGenerator> {
    store: Arc<S>,
    keys: Arc<K>,
    key_max_attempts: usize,
    locks: Arc<DashMap<SessionId, Arc<Mutex<()>>>>,
}

impl<S, K> Clone for SessionManager<S, K> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            keys: Arc::clone(&self.keys),
            key_max_attempts: self.key_max_attempts,
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<S> SessionManager<S>
where
    S: SessionRepository + SwipeLedger,
{
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
            keys: Arc::new(AlphabeticKeyGenerator::default()),
            key_max_attempts: 10,
            locks: Arc::new(DashMap::new()),
        }
    }
}

impl<S, K> SessionManager<S, K>
where
    S: SessionRepository + SwipeLedger,
    K: KeyGenerator,
{
    pub fn with_key_generator<K2: KeyGenerator>(self, keys: K2) -> SessionManager<S, K2> {
        SessionManager {
            store: self.store,
            keys: Arc::new(keys),
            key_max_attempts: self.key_max_attempts,
            locks: self.locks,
        }
    }

    pub fn with_key_max_attempts(mut self, attempts: usize) -> Self {
        self.key_max_attempts = attempts;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates a `waiting` session with no participants under a fresh join key.
    ///
    /// Keys are drawn until one is not held by a live session, at most
    /// `key_max_attempts` times; then this fails with
    /// [`Error::KeyGenerationExhausted`].
    pub async fn create_session(&self, filters: Filters, location: Location) -> Result<Session> {
        for attempt in 1..=self.key_max_attempts {
            let key = self.keys.generate_key();
            if let Some(session) = self.store.create_session(&key, &filters, location).await? {
                tracing::info!(session_id = %session.id, key = %session.key, "session created");
                return Ok(session);
            }
            tracing::debug!(attempt, %key, "join key collision");
        }

        Err(Error::KeyGenerationExhausted(self.key_max_attempts))
    }

    /// Resolves a join key to a session that still has room.
    ///
    /// This does not admit anybody: admission only happens through
    /// [`admit_participant`](Self::admit_participant), which is what keeps the
    /// capacity check race-free.
    pub async fn join_by_key(&self, key: &str) -> Result<Session> {
        if !self.keys.is_valid_format(key) {
            return Err(Error::InvalidKeyFormat(key.to_string()));
        }
        let key = self.keys.normalize(key);

        let session = self
            .store
            .find_by_key(&key)
            .await?
            .ok_or_else(|| Error::NotFound(key.clone()))?;

        if session.status == SessionStatus::Completed {
            return Err(Error::SessionCompleted(session.id.to_string()));
        }
        if session.is_full() {
            return Err(Error::SessionFull(session.id.to_string()));
        }
        Ok(session)
    }

    pub async fn get_session(&self, id: &SessionId) -> Result<Session> {
        Ok(self.load(id).await?.value)
    }

    /// Adds `handle` to the session's members.
    ///
    /// Idempotent for a handle that is already a member. Fails with
    /// [`Error::SessionFull`] when both slots are taken and with
    /// [`Error::SessionCompleted`] once the session is completed. The status
    /// becomes `active` exactly when the second participant is admitted.
    pub async fn admit_participant(
        &self,
        id: &SessionId,
        handle: &ConnectionHandle,
    ) -> Result<Session> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let Versioned {
                value: mut session,
                revision,
            } = self.load(id).await?;

            if session.is_member(handle) {
                return Ok(session);
            }
            if session.status == SessionStatus::Completed {
                return Err(Error::SessionCompleted(id.to_string()));
            }
            if session.is_full() {
                return Err(Error::SessionFull(id.to_string()));
            }

            session.participants.push(Participant {
                handle: handle.clone(),
                joined_at: OffsetDateTime::now_utc(),
            });
            session.status = SessionStatus::for_count(session.participant_count());

            if self
                .store
                .update_membership(id, revision, &session.participants, session.status)
                .await?
            {
                tracing::info!(
                    session_id = %id,
                    %handle,
                    participants = session.participant_count(),
                    status = %session.status,
                    "participant admitted"
                );
                return Ok(session);
            }
            tracing::debug!(session_id = %id, "membership write raced, retrying");
        }

        Err(contended(id))
    }

    /// Removes `handle` from the session's members.
    ///
    /// When nobody is left the session is deleted and [`Departure::Retired`] is
    /// returned. Otherwise the status falls back to `waiting`, unless the
    /// session is completed, which is terminal.
    pub async fn remove_participant(
        &self,
        id: &SessionId,
        handle: &ConnectionHandle,
    ) -> Result<Departure> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let Versioned {
                value: mut session,
                revision,
            } = self.load(id).await?;

            if !session.is_member(handle) {
                return Err(Error::NotParticipant(id.to_string()));
            }
            session.participants.retain(|p| &p.handle != handle);

            if session.participants.is_empty() {
                if self.store.delete_at_revision(id, revision).await? {
                    self.locks.remove(id);
                    tracing::info!(session_id = %id, %handle, "last participant left, session retired");
                    return Ok(Departure::Retired(*id));
                }
            } else {
                if session.status != SessionStatus::Completed {
                    session.status = SessionStatus::for_count(session.participant_count());
                }
                if self
                    .store
                    .update_membership(id, revision, &session.participants, session.status)
                    .await?
                {
                    tracing::info!(
                        session_id = %id,
                        %handle,
                        participants = session.participant_count(),
                        status = %session.status,
                        "participant left"
                    );
                    return Ok(Departure::Remaining(session));
                }
            }
            tracing::debug!(session_id = %id, "membership write raced, retrying");
        }

        Err(contended(id))
    }

    /// Moves the session into the terminal `completed` status.
    pub async fn complete_session(&self, id: &SessionId) -> Result<Session> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let Versioned {
                value: mut session,
                revision,
            } = self.load(id).await?;

            if session.status == SessionStatus::Completed {
                return Ok(session);
            }
            session.status = SessionStatus::Completed;

            if self
                .store
                .update_membership(id, revision, &session.participants, session.status)
                .await?
            {
                tracing::info!(session_id = %id, "session completed");
                return Ok(session);
            }
        }

        Err(contended(id))
    }

    /// Appends a decision for a live session. See [`SwipeLedger::record_swipe`].
    pub async fn record_swipe(&self, swipe: NewSwipe) -> Result<SwipeRecord> {
        self.load(&swipe.session_id).await?;
        self.store.record_swipe(swipe).await
    }

    pub async fn list_swipes(
        &self,
        id: &SessionId,
        direction: Option<Direction>,
    ) -> Result<Vec<SwipeRecord>> {
        self.load(id).await?;
        self.store.list_swipes(id, direction).await
    }

    /// Current matches of a live session under `rule`, freshly computed.
    pub async fn matches(&self, id: &SessionId, rule: &MatchRule) -> Result<Vec<MatchResult>> {
        let swipes = self.list_swipes(id, Some(Direction::Right)).await?;
        Ok(compute_matches(&swipes, rule))
    }

    pub async fn swipe_stats(&self, id: &SessionId) -> Result<SwipeStats> {
        let swipes = self.list_swipes(id, None).await?;
        Ok(SwipeStats::from_swipes(&swipes))
    }

    async fn load(&self, id: &SessionId) -> Result<Versioned<Session>> {
        match self.store.load_session(id).await? {
            Some(session) => Ok(session),
            None => {
                self.locks.remove(id);
                Err(Error::NotFound(id.to_string()))
            }
        }
    }

    fn lock_for(&self, id: &SessionId) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(*id).or_default().value())
    }
}

fn contended(id: &SessionId) -> Error {
    Error::Backend(format!(
        "session {id} kept changing concurrently after {MAX_WRITE_ATTEMPTS} attempts"
    ))
}
