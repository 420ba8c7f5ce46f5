//! Sea-ORM entity models for the session store and the swipe ledger.
//!
//! Nested values (filters, participant lists, candidate snapshots) are stored
//! as MessagePack blobs; everything that is filtered or constrained on is a
//! plain column.

/// Session rows: identity, join key, membership and status.
pub mod session;

/// Swipe rows: one decision per participant and candidate within a session.
pub mod swipe;
