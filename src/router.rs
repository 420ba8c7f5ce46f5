//! Realtime event router.
//!
//! Maps inbound events from live connections onto lifecycle and ledger
//! operations, and fans the resulting state changes out to the members of a
//! session. The transport (see the `server` feature) only has to call
//! [`EventRouter::connect`], [`EventRouter::handle_text`] and
//! [`EventRouter::disconnect`], and forward whatever arrives on the receiver
//! returned by `connect` to the socket.
//!
//! Broadcast groups are explicit, process-scoped state: populated on join,
//! pruned on disconnect and dropped when the session retires. Every group has
//! its own mutex, held across the lifecycle call and the resulting broadcast,
//! so members observe `session-updated` events in the order the writes
//! happened.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};

use crate::error::{Error, Result};
use crate::events::{InboundEvent, OutboundEvent};
use crate::key::{AlphabeticKeyGenerator, KeyGenerator};
use crate::lifecycle::{Departure, SessionManager};
use crate::model::{
    CandidateId, CandidateSnapshot, ConnectionHandle, Direction, NewSwipe, SessionId,
    MAX_PARTICIPANTS,
};
use crate::store::{SessionRepository, SwipeLedger};

pub type EventSender = mpsc::Sender<OutboundEvent>;
pub type EventReceiver = mpsc::Receiver<OutboundEvent>;

/// Events queued per connection before further ones are dropped.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

/// Connections currently joined to one session.
#[derive(Debug, Default)]
struct Group {
    members: Vec<ConnectionHandle>,
    /// Members that signaled they are done swiping.
    completed: HashSet<ConnectionHandle>,
}

pub struct EventRouter<S, K = AlphabeticKeyGenerator> {
    sessions: SessionManager<S, K>,
    connections: Arc<DashMap<ConnectionHandle, EventSender>>,
    joined: Arc<DashMap<ConnectionHandle, SessionId>>,
    groups: Arc<DashMap<SessionId, Arc<Mutex<Group>>>>,
    outbound_capacity: usize,
}

impl<S, K> Clone for EventRouter<S, K> {
    fn clone(&self) -> Self {
        Self {
            sessions: self.sessions.clone(),
            connections: Arc::clone(&self.connections),
            joined: Arc::clone(&self.joined),
            groups: Arc::clone(&self.groups),
            outbound_capacity: self.outbound_capacity,
        }
    }
}

impl<S, K> EventRouter<S, K>
where
    S: SessionRepository + SwipeLedger,
    K: KeyGenerator,
{
    pub fn new(sessions: SessionManager<S, K>) -> Self {
        Self {
            sessions,
            connections: Arc::new(DashMap::new()),
            joined: Arc::new(DashMap::new()),
            groups: Arc::new(DashMap::new()),
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }

    /// Bounds every connection's outbound queue. A connection that falls this
    /// far behind loses events instead of growing without limit.
    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }

    pub fn sessions(&self) -> &SessionManager<S, K> {
        &self.sessions
    }

    /// Registers a new connection and returns its handle and outbound queue.
    pub fn connect(&self) -> (ConnectionHandle, EventReceiver) {
        let handle = ConnectionHandle::generate();
        let (tx, rx) = mpsc::channel(self.outbound_capacity);
        self.connections.insert(handle.clone(), tx);
        tracing::debug!(%handle, "connection registered");
        (handle, rx)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Session the connection is joined to, if any.
    pub fn session_of(&self, handle: &ConnectionHandle) -> Option<SessionId> {
        self.joined.get(handle).map(|entry| *entry.value())
    }

    /// Parses and dispatches one raw text frame.
    pub async fn handle_text(&self, handle: &ConnectionHandle, text: &str) -> Result<()> {
        match InboundEvent::parse(text) {
            Ok(event) => self.handle_event(handle, event).await,
            Err(err) => {
                tracing::warn!(%handle, error = %err, "rejected inbound frame");
                self.send(handle, OutboundEvent::from(&err));
                Ok(())
            }
        }
    }

    /// Dispatches one inbound event.
    ///
    /// Precondition violations are reported to the originating connection as an
    /// `error` event and never affect anyone else. Only storage failures are
    /// returned (after being reported), since nothing can be done safely
    /// without the store.
    pub async fn handle_event(&self, handle: &ConnectionHandle, event: InboundEvent) -> Result<()> {
        tracing::trace!(%handle, session_id = %event.session_id(), "inbound event");
        let result = match event {
            InboundEvent::Join { session_id, key } => {
                self.on_join(handle, session_id, key.as_deref()).await
            }
            InboundEvent::Swipe {
                session_id,
                candidate_id,
                direction,
                snapshot,
            } => {
                self.on_swipe(handle, session_id, candidate_id, direction, snapshot)
                    .await
            }
            InboundEvent::Complete { session_id } => self.on_complete(handle, session_id).await,
        };

        match result {
            Ok(()) => Ok(()),
            Err(err) => {
                self.send(handle, OutboundEvent::from(&err));
                if err.is_storage() {
                    tracing::error!(%handle, error = %err, "storage failure while handling event");
                    Err(err)
                } else {
                    tracing::warn!(%handle, error = %err, "event rejected");
                    Ok(())
                }
            }
        }
    }

    /// Tears down a connection: leaves its session (retiring it if it was the
    /// last member) and forgets the outbound queue.
    pub async fn disconnect(&self, handle: &ConnectionHandle) -> Result<()> {
        self.connections.remove(handle);
        let result = match self.joined.get(handle).map(|entry| *entry.value()) {
            Some(session_id) => self.leave(handle, session_id).await,
            None => Ok(()),
        };
        self.joined.remove(handle);
        tracing::debug!(%handle, "connection closed");
        result
    }

    async fn on_join(
        &self,
        handle: &ConnectionHandle,
        session_id: SessionId,
        key: Option<&str>,
    ) -> Result<()> {
        if let Some(current) = self.session_of(handle) {
            if current != session_id {
                match self.sessions.get_session(&current).await {
                    Ok(_) => {
                        return Err(Error::InvalidEvent(format!(
                            "connection already joined session {current}"
                        )))
                    }
                    Err(Error::NotFound(_)) => self.forget_membership(handle, current).await,
                    Err(err) => return Err(err),
                }
            }
        }

        let session = self.sessions.get_session(&session_id).await?;
        if let Some(key) = key {
            if !key.trim().eq_ignore_ascii_case(&session.key) {
                return Err(Error::NotFound(format!("{session_id} with key {key}")));
            }
        }

        let group = self.group(&session_id);
        let mut group = group.lock().await;

        let session = self.sessions.admit_participant(&session_id, handle).await?;
        if !group.members.contains(handle) {
            group.members.push(handle.clone());
        }
        self.joined.insert(handle.clone(), session_id);

        self.broadcast(&group.members, OutboundEvent::session_updated(&session));
        Ok(())
    }

    async fn on_swipe(
        &self,
        handle: &ConnectionHandle,
        session_id: SessionId,
        candidate_id: CandidateId,
        direction: Direction,
        snapshot: CandidateSnapshot,
    ) -> Result<()> {
        self.require_member(handle, &session_id)?;

        let swipe = NewSwipe {
            session_id,
            participant: handle.clone(),
            candidate_id: candidate_id.clone(),
            direction,
            snapshot,
        };

        match self.sessions.record_swipe(swipe).await {
            Ok(_) => {}
            Err(Error::DuplicateSwipe { candidate_id }) => {
                tracing::debug!(%handle, session_id = %session_id, %candidate_id, "duplicate swipe ignored");
                return Ok(());
            }
            Err(err) => return Err(err),
        }

        let group = self.group(&session_id);
        let group = group.lock().await;
        self.relay(
            &group.members,
            handle,
            OutboundEvent::PeerSwiped {
                candidate_id,
                direction,
            },
        );
        Ok(())
    }

    async fn on_complete(&self, handle: &ConnectionHandle, session_id: SessionId) -> Result<()> {
        self.require_member(handle, &session_id)?;

        let group = self.group(&session_id);
        let mut group = group.lock().await;
        group.completed.insert(handle.clone());
        self.relay(&group.members, handle, OutboundEvent::PeerCompleted);

        let everyone_done = group.members.len() == MAX_PARTICIPANTS
            && group.members.iter().all(|m| group.completed.contains(m));
        if everyone_done {
            let session = self.sessions.complete_session(&session_id).await?;
            self.broadcast(&group.members, OutboundEvent::session_updated(&session));
        }
        Ok(())
    }

    async fn leave(&self, handle: &ConnectionHandle, session_id: SessionId) -> Result<()> {
        let group_ref = self.group(&session_id);
        let mut group = group_ref.lock().await;
        group.members.retain(|m| m != handle);
        group.completed.remove(handle);

        match self.sessions.remove_participant(&session_id, handle).await {
            Ok(Departure::Remaining(session)) => {
                self.broadcast(&group.members, OutboundEvent::session_updated(&session));
                Ok(())
            }
            Ok(Departure::Retired(_)) => {
                self.groups.remove(&session_id);
                Ok(())
            }
            Err(err) if !err.is_storage() => {
                // Expired or already gone: nothing left to notify
                tracing::debug!(%handle, session_id = %session_id, error = %err, "leave on vanished session");
                if group.members.is_empty() {
                    self.groups.remove(&session_id);
                }
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Drops a connection's registry entries for a session that expired under it.
    async fn forget_membership(&self, handle: &ConnectionHandle, session_id: SessionId) {
        self.joined.remove(handle);
        let group_ref = self.group(&session_id);
        let mut group = group_ref.lock().await;
        group.members.retain(|m| m != handle);
        group.completed.remove(handle);
        if group.members.is_empty() {
            self.groups.remove(&session_id);
        }
        tracing::debug!(%handle, session_id = %session_id, "dropped membership of expired session");
    }

    fn require_member(&self, handle: &ConnectionHandle, session_id: &SessionId) -> Result<()> {
        match self.session_of(handle) {
            Some(joined) if &joined == session_id => Ok(()),
            _ => Err(Error::NotParticipant(session_id.to_string())),
        }
    }

    fn group(&self, session_id: &SessionId) -> Arc<Mutex<Group>> {
        Arc::clone(self.groups.entry(*session_id).or_default().value())
    }

    fn send(&self, handle: &ConnectionHandle, event: OutboundEvent) {
        if let Some(tx) = self.connections.get(handle) {
            match tx.try_send(event) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(event)) => {
                    tracing::warn!(%handle, ?event, "outbound queue full, event dropped");
                }
                // The connection is being torn down
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
    }

    fn broadcast(&self, members: &[ConnectionHandle], event: OutboundEvent) {
        for member in members {
            self.send(member, event.clone());
        }
    }

    /// Sends to every member except `sender`.
    fn relay(&self, members: &[ConnectionHandle], sender: &ConnectionHandle, event: OutboundEvent) {
        for member in members.iter().filter(|m| *m != sender) {
            self.send(member, event.clone());
        }
    }
}
