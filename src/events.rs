//! Realtime event protocol.
//!
//! Both directions are JSON objects tagged by `type`:
//!
//! ```json
//! {"type": "join", "sessionId": "…", "key": "QXBT"}
//! {"type": "swipe", "sessionId": "…", "candidateId": "c1", "direction": "right", "snapshot": {…}}
//! {"type": "complete", "sessionId": "…"}
//!
//! {"type": "session-updated", "participantCount": 2, "status": "active"}
//! {"type": "peer-swiped", "candidateId": "c1", "direction": "right"}
//! {"type": "peer-completed"}
//! {"type": "error", "kind": "session_full", "message": "…"}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::{CandidateId, CandidateSnapshot, Direction, Session, SessionId, SessionStatus};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InboundEvent {
    #[serde(rename_all = "camelCase")]
    Join {
        session_id: SessionId,
        #[serde(default)]
        key: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Swipe {
        session_id: SessionId,
        candidate_id: CandidateId,
        direction: Direction,
        #[serde(default)]
        snapshot: CandidateSnapshot,
    },
    #[serde(rename_all = "camelCase")]
    Complete { session_id: SessionId },
}

impl InboundEvent {
    pub fn parse(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|e| Error::InvalidEvent(e.to_string()))
    }

    pub fn session_id(&self) -> &SessionId {
        match self {
            InboundEvent::Join { session_id, .. }
            | InboundEvent::Swipe { session_id, .. }
            | InboundEvent::Complete { session_id } => session_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutboundEvent {
    #[serde(rename_all = "camelCase")]
    SessionUpdated {
        participant_count: usize,
        status: SessionStatus,
    },
    #[serde(rename_all = "camelCase")]
    PeerSwiped {
        candidate_id: CandidateId,
        direction: Direction,
    },
    PeerCompleted,
    Error { kind: String, message: String },
}

impl OutboundEvent {
    pub fn session_updated(session: &Session) -> Self {
        OutboundEvent::SessionUpdated {
            participant_count: session.participant_count(),
            status: session.status,
        }
    }

    pub fn to_json(&self) -> String {
        // Serializing these variants cannot fail: no maps with non-string keys
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl From<&Error> for OutboundEvent {
    fn from(err: &Error) -> Self {
        OutboundEvent::Error {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_swipe() {
        let id = SessionId::new();
        let text = format!(
            r#"{{"type":"swipe","sessionId":"{id}","candidateId":"c1","direction":"right",
                "snapshot":{{"name":"Luigi's","rating":4.5}}}}"#
        );
        match InboundEvent::parse(&text).unwrap() {
            InboundEvent::Swipe {
                session_id,
                candidate_id,
                direction,
                snapshot,
            } => {
                assert_eq!(session_id, id);
                assert_eq!(candidate_id, "c1");
                assert_eq!(direction, Direction::Right);
                assert_eq!(snapshot.name, "Luigi's");
                assert_eq!(snapshot.rating, Some(4.5));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn join_key_is_optional() {
        let id = SessionId::new();
        let event = InboundEvent::parse(&format!(r#"{{"type":"join","sessionId":"{id}"}}"#)).unwrap();
        assert_eq!(
            event,
            InboundEvent::Join {
                session_id: id,
                key: None
            }
        );
    }

    #[test]
    fn rejects_unknown_types_and_bad_ids() {
        assert!(InboundEvent::parse(r#"{"type":"dance"}"#).is_err());
        assert!(InboundEvent::parse(r#"{"type":"complete","sessionId":"nope"}"#).is_err());
        let err = InboundEvent::parse("not json").unwrap_err();
        assert_eq!(err.kind(), "invalid_event");
    }

    #[test]
    fn outbound_wire_format() {
        let updated = OutboundEvent::SessionUpdated {
            participant_count: 2,
            status: SessionStatus::Active,
        };
        assert_eq!(
            updated.to_json(),
            r#"{"type":"session-updated","participantCount":2,"status":"active"}"#
        );
        assert_eq!(OutboundEvent::PeerCompleted.to_json(), r#"{"type":"peer-completed"}"#);

        let err = OutboundEvent::from(&Error::SessionFull("s".into()));
        assert!(err.to_json().starts_with(r#"{"type":"error","kind":"session_full""#));
    }
}
