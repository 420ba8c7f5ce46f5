//! Domain types for sessions, participants, swipes and matches.
//!
//! These are the values the lifecycle manager, the ledger and the router pass
//! around. Their JSON form (camelCase) is also the wire format of the HTTP and
//! WebSocket surfaces; the stored form of the nested values is MessagePack.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::Error;

/// Maximum number of participants a session admits.
pub const MAX_PARTICIPANTS: usize = 2;

/// Identifier of a candidate as handed out by the candidate source.
pub type CandidateId = String;

/// Opaque, immutable session identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| Error::NotFound(s.to_string()))
    }
}

/// Ephemeral identifier of one live transport connection.
///
/// It is not a user identity: a reconnect produces a fresh handle.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionHandle(String);

impl ConnectionHandle {
    /// Generates a fresh handle for a newly accepted connection.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnectionHandle {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ConnectionHandle {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Search criteria forwarded untouched to the candidate source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Filters {
    /// Search radius in meters.
    pub max_distance: u32,
    pub category: String,
    /// Accepted price tiers, 1 (cheapest) to 4.
    pub price_levels: Vec<u8>,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            max_distance: 5000,
            category: "restaurant".to_string(),
            price_levels: vec![1, 2, 3, 4],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

/// One admitted member of a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub handle: ConnectionHandle,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Waiting,
    Active,
    Completed,
}

impl SessionStatus {
    /// Status implied by a membership count for a session that is not completed.
    pub fn for_count(count: usize) -> Self {
        if count >= MAX_PARTICIPANTS {
            SessionStatus::Active
        } else {
            SessionStatus::Waiting
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Waiting => "waiting",
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(SessionStatus::Waiting),
            "active" => Ok(SessionStatus::Active),
            "completed" => Ok(SessionStatus::Completed),
            other => Err(Error::Decode(format!("unknown session status `{other}`"))),
        }
    }
}

/// The shared two-party matching context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub key: String,
    pub filters: Filters,
    pub location: Location,
    pub participants: Vec<Participant>,
    pub status: SessionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl Session {
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_member(&self, handle: &ConnectionHandle) -> bool {
        self.participants.iter().any(|p| &p.handle == handle)
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= MAX_PARTICIPANTS
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            other => Err(Error::Decode(format!("unknown swipe direction `{other}`"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Display data of a candidate, copied at decision time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CandidateSnapshot {
    pub name: String,
    pub address: String,
    pub rating: Option<f64>,
    pub price_level: Option<u8>,
    pub photos: Vec<Photo>,
    pub location: Option<Location>,
}

/// One participant's decision on one candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeRecord {
    pub id: i64,
    pub session_id: SessionId,
    pub participant: ConnectionHandle,
    pub candidate_id: CandidateId,
    pub direction: Direction,
    pub snapshot: CandidateSnapshot,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A swipe about to be written to the ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSwipe {
    pub session_id: SessionId,
    pub participant: ConnectionHandle,
    pub candidate_id: CandidateId,
    pub direction: Direction,
    #[serde(default)]
    pub snapshot: CandidateSnapshot,
}

/// A candidate liked by enough distinct participants of one session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub candidate_id: CandidateId,
    #[serde(flatten)]
    pub snapshot: CandidateSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_membership_count() {
        assert_eq!(SessionStatus::for_count(0), SessionStatus::Waiting);
        assert_eq!(SessionStatus::for_count(1), SessionStatus::Waiting);
        assert_eq!(SessionStatus::for_count(2), SessionStatus::Active);
    }

    #[test]
    fn filters_fill_in_defaults() {
        let filters: Filters = serde_json::from_str(r#"{"maxDistance": 1200}"#).unwrap();
        assert_eq!(filters.max_distance, 1200);
        assert_eq!(filters.category, "restaurant");
        assert_eq!(filters.price_levels, vec![1, 2, 3, 4]);
    }

    #[test]
    fn session_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<SessionId>().is_err());
        let id = SessionId::new();
        assert_eq!(id.to_string().parse::<SessionId>().unwrap(), id);
    }

    #[test]
    fn direction_wire_form_is_lowercase() {
        assert_eq!(serde_json::to_string(&Direction::Right).unwrap(), "\"right\"");
        assert_eq!("left".parse::<Direction>().unwrap(), Direction::Left);
        assert!("up".parse::<Direction>().is_err());
    }
}
