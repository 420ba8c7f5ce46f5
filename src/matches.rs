//! Match computation over the swipe ledger.
//!
//! Matches are never stored. Each call scans a session's swipes, builds a
//! transient grouping per candidate and throws it away, so the result can
//! never drift from the ledger.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::{CandidateId, ConnectionHandle, Direction, MatchResult, SwipeRecord};

/// Which right-swipes make a candidate a match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchRule {
    /// At least `min` distinct participants swiped right. Handles from earlier
    /// connections (a participant that reconnected) still count.
    DistinctParticipants { min: usize },
    /// Both of these two specific handles swiped right.
    Pair(ConnectionHandle, ConnectionHandle),
}

impl Default for MatchRule {
    fn default() -> Self {
        MatchRule::DistinctParticipants { min: 2 }
    }
}

impl MatchRule {
    fn accepts(&self, likers: &BTreeSet<&ConnectionHandle>) -> bool {
        match self {
            MatchRule::DistinctParticipants { min } => likers.len() >= *min,
            MatchRule::Pair(a, b) => likers.contains(a) && likers.contains(b),
        }
    }
}

/// Computes the matches among `swipes` under `rule`.
///
/// Left swipes are ignored, so the whole ledger of a session can be passed.
/// One result is produced per qualifying candidate, carrying the snapshot of
/// the first right swipe on it. The output is ordered by candidate id; any
/// presentation order is up to the caller (see [`sort_by_rating`]).
pub fn compute_matches(swipes: &[SwipeRecord], rule: &MatchRule) -> Vec<MatchResult> {
    let mut by_candidate: BTreeMap<&CandidateId, (&SwipeRecord, BTreeSet<&ConnectionHandle>)> =
        BTreeMap::new();

    for swipe in swipes.iter().filter(|s| s.direction == Direction::Right) {
        by_candidate
            .entry(&swipe.candidate_id)
            .or_insert_with(|| (swipe, BTreeSet::new()))
            .1
            .insert(&swipe.participant);
    }

    by_candidate
        .into_iter()
        .filter(|(_, (_, likers))| rule.accepts(likers))
        .map(|(candidate_id, (first, _))| MatchResult {
            candidate_id: candidate_id.clone(),
            snapshot: first.snapshot.clone(),
        })
        .collect()
}

/// Orders matches by rating, best first. Unrated candidates count as 0.
pub fn sort_by_rating(matches: &mut [MatchResult]) {
    matches.sort_by(|a, b| {
        let a = a.snapshot.rating.unwrap_or(0.0);
        let b = b.snapshot.rating.unwrap_or(0.0);
        b.partial_cmp(&a).unwrap_or(Ordering::Equal)
    });
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DirectionCounts {
    pub left: u64,
    pub right: u64,
}

impl DirectionCounts {
    fn bump(&mut self, direction: Direction) {
        match direction {
            Direction::Left => self.left += 1,
            Direction::Right => self.right += 1,
        }
    }
}

/// Per-session swipe statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeStats {
    pub total_swipes: u64,
    pub by_participant: BTreeMap<ConnectionHandle, DirectionCounts>,
    pub by_direction: DirectionCounts,
}

impl SwipeStats {
    pub fn from_swipes(swipes: &[SwipeRecord]) -> Self {
        let mut stats = SwipeStats::default();
        for swipe in swipes {
            stats.total_swipes += 1;
            stats
                .by_participant
                .entry(swipe.participant.clone())
                .or_default()
                .bump(swipe.direction);
            stats.by_direction.bump(swipe.direction);
        }
        stats
    }
}
