//! Scoring used to rank slots for a user and to decide auto-joins.
//!
//! Everything here is pure; absent data lowers a score, it never errors.

use std::collections::{HashMap, HashSet};

use crate::domain::movie::entity::movie::MovieKind;

pub const PREFERENCE_WEIGHT: f64 = 0.7;
pub const PEER_RATING_WEIGHT: f64 = 0.3;

/// Catalog votes are 1..=10.
pub const MAX_VOTE_DIFF: f64 = 9.0;
/// Peer ratings are 0..=5.
pub const PEER_RATING_SCALE: f64 = 5.0;

pub const DEFAULT_RATING_TOLERANCE: f64 = 1.0;
pub const AUTO_JOIN_TOLERANCE: f64 = 0.5;

pub const TYPE_AFFINITY_WEIGHT: f64 = 0.7;
pub const YEAR_PROXIMITY_WEIGHT: f64 = 0.3;
pub const YEAR_DECAY: f64 = 30.0;

/// A user's received peer rating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerRating {
    pub rating: f64,
    pub total_ratings: i32,
}

impl PeerRating {
    pub fn new(rating: f64, total_ratings: i32) -> Self {
        Self {
            rating,
            total_ratings,
        }
    }

    pub fn is_rated(&self) -> bool {
        self.total_ratings > 0
    }

    /// Unrated users count as 0.
    pub fn effective(&self) -> f64 {
        if self.is_rated() {
            self.rating
        } else {
            0.0
        }
    }
}

/// `1 - MAE / 9` over the titles both users scored, floored at 0.
/// No shared titles gives 0.
pub fn preference_similarity(a: &HashMap<String, i32>, b: &HashMap<String, i32>) -> f64 {
    let diffs: Vec<f64> = a
        .iter()
        .filter_map(|(catalog_id, score_a)| {
            b.get(catalog_id)
                .map(|score_b| f64::from((score_a - score_b).abs()))
        })
        .collect();

    if diffs.is_empty() {
        return 0.0;
    }

    let mae = diffs.iter().sum::<f64>() / diffs.len() as f64;
    (1.0 - mae / MAX_VOTE_DIFF).max(0.0)
}

pub fn peer_rating_closeness(a: PeerRating, b: PeerRating) -> f64 {
    let diff = (a.effective() - b.effective()).abs();
    (1.0 - diff / PEER_RATING_SCALE).clamp(0.0, 1.0)
}

pub fn combined_similarity(preference: f64, peer_closeness: f64) -> f64 {
    PREFERENCE_WEIGHT * preference + PEER_RATING_WEIGHT * peer_closeness
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Average similarity to the participants; 0 for an empty slot.
pub fn slot_compatibility(similarities: &[f64]) -> f64 {
    mean(similarities).unwrap_or(0.0)
}

/// Distance between the user's rating and the mean rating of the slot's
/// rated participants. `None` when nobody in the slot has been rated.
pub fn slot_rating_gap(user: PeerRating, participants: &[PeerRating]) -> Option<f64> {
    let rated: Vec<f64> = participants
        .iter()
        .filter(|p| p.is_rated())
        .map(|p| p.rating)
        .collect();

    mean(&rated).map(|avg| (avg - user.effective()).abs())
}

/// Inclusive; an unmeasured gap is always within tolerance.
pub fn within_tolerance(gap: Option<f64>, tolerance: f64) -> bool {
    gap.map_or(true, |g| g <= tolerance)
}

/// Filter output ordering key: unmeasured gaps sort as 0.
pub fn gap_sort_key(gap: Option<f64>) -> f64 {
    gap.unwrap_or(0.0)
}

/// What the auto-join predicate looks at for one slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoJoinCandidate {
    pub participant_count: u64,
    pub min_participants: i32,
    pub rating_gap: Option<f64>,
}

/// Users never rated are never auto-joined. Otherwise a slot qualifies when
/// this user would fill it, or when its measured rating gap is within
/// [`AUTO_JOIN_TOLERANCE`].
pub fn qualifies_for_auto_join(user: PeerRating, candidate: &AutoJoinCandidate) -> bool {
    if !user.is_rated() {
        return false;
    }

    let one_short = candidate.participant_count + 1 == candidate.min_participants.max(0) as u64;
    let close_enough = candidate
        .rating_gap
        .map_or(false, |gap| gap <= AUTO_JOIN_TOLERANCE);

    one_short || close_enough
}

/// Aggregate taste from a user's imported catalog votes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceProfile {
    pub average_year: Option<f64>,
    pub kind_counts: HashMap<MovieKind, usize>,
    pub total_votes: usize,
}

impl PreferenceProfile {
    /// Each vote contributes its (year, kind), either of which may be unknown.
    pub fn from_votes<I>(votes: I) -> Self
    where
        I: IntoIterator<Item = (Option<i32>, Option<MovieKind>)>,
    {
        let mut years = Vec::new();
        let mut kind_counts = HashMap::new();
        let mut total_votes = 0;

        for (year, kind) in votes {
            total_votes += 1;
            if let Some(year) = year {
                years.push(f64::from(year));
            }
            if let Some(kind) = kind {
                *kind_counts.entry(kind).or_insert(0) += 1;
            }
        }

        Self {
            average_year: mean(&years),
            kind_counts,
            total_votes,
        }
    }

    /// Share of the user's votes with this kind.
    pub fn type_affinity(&self, kind: MovieKind) -> f64 {
        if self.total_votes == 0 {
            return 0.0;
        }
        self.kind_counts.get(&kind).copied().unwrap_or(0) as f64 / self.total_votes as f64
    }

    pub fn year_proximity(&self, year: Option<i32>) -> f64 {
        match (self.average_year, year) {
            (Some(avg), Some(year)) => {
                1.0 - ((f64::from(year) - avg).abs() / YEAR_DECAY).min(1.0)
            }
            _ => 0.0,
        }
    }

    pub fn interest(&self, kind: MovieKind, year: Option<i32>) -> f64 {
        TYPE_AFFINITY_WEIGHT * self.type_affinity(kind)
            + YEAR_PROXIMITY_WEIGHT * self.year_proximity(year)
    }
}

/// A slot's movie as seen by interest ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct InterestCandidate<T> {
    pub item: T,
    pub catalog_ids: Vec<String>,
    pub kind: MovieKind,
    pub year: Option<i32>,
}

/// Drops candidates whose movie is already consumed, scores the rest and
/// sorts by score descending. Ties keep input order.
pub fn annotate_slots_by_interest<T>(
    candidates: Vec<InterestCandidate<T>>,
    profile: &PreferenceProfile,
    consumed: &HashSet<String>,
) -> Vec<(T, f64)> {
    let mut scored: Vec<(T, f64)> = candidates
        .into_iter()
        .filter(|c| !c.catalog_ids.iter().any(|id| consumed.contains(id)))
        .map(|c| {
            let score = profile.interest(c.kind, c.year);
            (c.item, score)
        })
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
}
