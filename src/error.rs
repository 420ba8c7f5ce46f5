//! Error taxonomy shared by the store, the lifecycle manager and the router.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure a session or ledger operation can report.
///
/// Apart from the storage variants, each of these is local to the single
/// request or connection that triggered it: a failed operation leaves no
/// partial mutation behind.
#[derive(Debug, Error)]
pub enum Error {
    /// The session or key is unknown, retired or past its retention window.
    #[error("session not found: {0}")]
    NotFound(String),

    /// Admission would take the session past two participants.
    #[error("session {0} is full")]
    SessionFull(String),

    /// The session reached the terminal `completed` status.
    #[error("session {0} is completed")]
    SessionCompleted(String),

    /// The participant already decided on this candidate in this session.
    #[error("swipe already recorded for candidate {candidate_id}")]
    DuplicateSwipe { candidate_id: String },

    /// No collision-free join key was found within the retry budget.
    #[error("failed to generate a unique session key after {0} attempts")]
    KeyGenerationExhausted(usize),

    #[error("invalid session key format: {0}")]
    InvalidKeyFormat(String),

    /// The connection is not an admitted member of the session it addressed.
    #[error("connection is not a participant of session {0}")]
    NotParticipant(String),

    /// An inbound event could not be parsed or is not allowed in this state.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// The database rejected or failed the operation.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A value could not be encoded for storage.
    #[error("encode error: {0}")]
    Encode(String),

    /// A stored value could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl Error {
    /// Machine-readable kind, carried in outbound `error` events and HTTP bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::SessionFull(_) => "session_full",
            Error::SessionCompleted(_) => "session_completed",
            Error::DuplicateSwipe { .. } => "duplicate_swipe",
            Error::KeyGenerationExhausted(_) => "key_generation_exhausted",
            Error::InvalidKeyFormat(_) => "invalid_key_format",
            Error::NotParticipant(_) => "not_participant",
            Error::InvalidEvent(_) => "invalid_event",
            Error::Config(_) => "config",
            Error::Backend(_) | Error::Encode(_) | Error::Decode(_) => "storage",
        }
    }

    /// Whether this error means the storage layer itself is unusable.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Backend(_) | Error::Encode(_) | Error::Decode(_))
    }
}

impl From<sea_orm::DbErr> for Error {
    fn from(e: sea_orm::DbErr) -> Self {
        Error::Backend(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Encode(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_variants_share_a_kind() {
        assert_eq!(Error::Backend("x".into()).kind(), "storage");
        assert_eq!(Error::Decode("x".into()).kind(), "storage");
        assert!(Error::Encode("x".into()).is_storage());
        assert!(!Error::SessionFull("s".into()).is_storage());
    }

    #[test]
    fn duplicate_swipe_message_names_the_candidate() {
        let err = Error::DuplicateSwipe {
            candidate_id: "c1".into(),
        };
        assert_eq!(err.kind(), "duplicate_swipe");
        assert!(err.to_string().contains("c1"));
    }
}
