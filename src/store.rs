//! Storage seams used by the lifecycle manager.
//!
//! [`SessionRepository`] persists session identity, membership and status;
//! [`SwipeLedger`] is the append-only decision log; [`ExpiredDeletion`] is the
//! retention sweep. [`SeaOrmStore`](crate::SeaOrmStore) implements all three.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    Direction, Filters, Location, NewSwipe, Participant, Session, SessionId, SessionStatus,
    SwipeRecord,
};

/// A session together with the revision it was read at.
///
/// The revision is handed back to [`SessionRepository::update_membership`] and
/// [`SessionRepository::delete_at_revision`] so a write only lands if nobody
/// else wrote in between.
#[derive(Clone, Debug, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub revision: i64,
}

#[async_trait]
pub trait SessionRepository: Send + Sync + 'static {
    /// Inserts a new `waiting` session with no participants.
    ///
    /// Returns `Ok(None)` when `key` is already held by a live session so the
    /// caller can retry with another key.
    async fn create_session(
        &self,
        key: &str,
        filters: &Filters,
        location: Location,
    ) -> Result<Option<Session>>;

    /// Loads a live session. Expired sessions read as `None`.
    async fn load_session(&self, id: &SessionId) -> Result<Option<Versioned<Session>>>;

    /// Looks up a live session by its (uppercase) join key.
    async fn find_by_key(&self, key: &str) -> Result<Option<Session>>;

    /// Replaces membership and status iff the stored revision still equals
    /// `expected_revision`. Returns `false` when the write lost a race.
    async fn update_membership(
        &self,
        id: &SessionId,
        expected_revision: i64,
        participants: &[Participant],
        status: SessionStatus,
    ) -> Result<bool>;

    /// Deletes the session iff the stored revision still equals `expected_revision`.
    async fn delete_at_revision(&self, id: &SessionId, expected_revision: i64) -> Result<bool>;
}

#[async_trait]
pub trait SwipeLedger: Send + Sync + 'static {
    /// Appends a decision. Fails with `DuplicateSwipe` if the participant
    /// already decided on this candidate in this session.
    async fn record_swipe(&self, swipe: NewSwipe) -> Result<SwipeRecord>;

    /// Lists a session's decisions in insertion order, optionally by direction.
    async fn list_swipes(
        &self,
        session_id: &SessionId,
        direction: Option<Direction>,
    ) -> Result<Vec<SwipeRecord>>;
}

/// Removal of rows that outlived the retention window.
#[async_trait]
pub trait ExpiredDeletion: Send + Sync {
    /// Deletes expired sessions and swipes, returning the number of rows removed.
    async fn delete_expired(&self) -> Result<u64>;

    /// Runs [`delete_expired`](Self::delete_expired) every `period` until it fails.
    ///
    /// Meant to be spawned as a background task. A returned error means the
    /// storage layer is unusable.
    async fn continuously_delete_expired(self, period: std::time::Duration) -> Result<()>
    where
        Self: Sized,
    {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = self.delete_expired().await?;
            if removed > 0 {
                tracing::info!(removed, "deleted expired sessions and swipes");
            }
        }
    }
}
