use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::{info, warn};

use super::dto::{
    CompatibleSlot, InterestResponse, RecommendedSlot, SimilarityResponse,
};
use super::score::{
    annotate_slots_by_interest, combined_similarity, gap_sort_key, peer_rating_closeness,
    preference_similarity, qualifies_for_auto_join, slot_compatibility, slot_rating_gap,
    within_tolerance, AutoJoinCandidate, InterestCandidate, PeerRating, PreferenceProfile,
    DEFAULT_RATING_TOLERANCE,
};
use crate::domain::movie::entity::movie;
use crate::domain::movie::service::MovieService;
use crate::domain::slot::entity::slot::{self, SlotStatus};
use crate::domain::slot::entity::slot_participant;
use crate::domain::slot::service::SlotService;
use crate::domain::user::entity::{bot_user, user_vote};
use crate::domain::user::service::UserService;
use crate::state::AppState;
use crate::utils::error::AppError;

const RECOMMENDATION_LIMIT: usize = 20;

/// An open slot that passed the rating filter.
struct Candidate {
    slot: slot::Model,
    participant_count: u64,
    rating_gap: Option<f64>,
    compatibility: f64,
}

pub struct MatchingService;

impl MatchingService {
    pub async fn user_similarity(
        state: &AppState,
        user_id: i64,
        other_user_id: i64,
    ) -> Result<SimilarityResponse, AppError> {
        let user = UserService::find_user(&state.db, user_id).await?;
        let other = UserService::find_user(&state.db, other_user_id).await?;

        let votes = load_vote_maps(&state.db, &[user_id, other_user_id]).await?;
        let empty = HashMap::new();
        let user_votes = votes.get(&user_id).unwrap_or(&empty);
        let other_votes = votes.get(&other_user_id).unwrap_or(&empty);

        let shared_titles = user_votes
            .keys()
            .filter(|id| other_votes.contains_key(*id))
            .count();
        let preference = preference_similarity(user_votes, other_votes);
        let closeness = peer_rating_closeness(peer_of(&user), peer_of(&other));

        Ok(SimilarityResponse {
            user_id,
            other_user_id,
            shared_titles,
            preference_similarity: preference,
            peer_rating_closeness: closeness,
            score: combined_similarity(preference, closeness),
        })
    }

    /// Open slots for the movie (and its duplicate rows) the user could join,
    /// closest peer rating first.
    pub async fn compatible_slots(
        state: &AppState,
        movie_id: i32,
        user_id: i64,
        tolerance: Option<f64>,
    ) -> Result<Vec<CompatibleSlot>, AppError> {
        let tolerance = tolerance.unwrap_or(DEFAULT_RATING_TOLERANCE);
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(AppError::ValidationError(
                "Tolerance must be a non-negative number.".to_string(),
            ));
        }

        let candidates = Self::filter_candidates(state, movie_id, user_id, tolerance).await?;
        Self::to_compatible_slots(state, candidates).await
    }

    /// The "I want to watch this" flow: auto-join the first qualifying slot,
    /// otherwise hand back the filtered list.
    pub async fn express_interest(
        state: &AppState,
        movie_id: i32,
        user_id: i64,
    ) -> Result<InterestResponse, AppError> {
        let user = UserService::find_user(&state.db, user_id).await?;
        let user_peer = peer_of(&user);

        let candidates =
            Self::filter_candidates(state, movie_id, user_id, DEFAULT_RATING_TOLERANCE).await?;

        for candidate in &candidates {
            let auto_join = AutoJoinCandidate {
                participant_count: candidate.participant_count,
                min_participants: candidate.slot.min_participants,
                rating_gap: candidate.rating_gap,
            };
            if !qualifies_for_auto_join(user_peer, &auto_join) {
                continue;
            }

            match SlotService::join_slot(state, candidate.slot.slot_id, user_id).await {
                Ok(joined) => {
                    info!(
                        slot_id = candidate.slot.slot_id,
                        user_id = user_id,
                        "User auto-joined slot"
                    );
                    return Ok(InterestResponse {
                        auto_joined: true,
                        joined: Some(joined),
                        candidates: Vec::new(),
                    });
                }
                // Lost a race for the last seat; try the next one.
                Err(e @ (AppError::SlotFull(_) | AppError::SlotNotOpen(_))) => {
                    warn!(slot_id = candidate.slot.slot_id, error = %e, "Auto-join skipped");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(InterestResponse {
            auto_joined: false,
            joined: None,
            candidates: Self::to_compatible_slots(state, candidates).await?,
        })
    }

    /// Open slots ranked by the user's taste, skipping movies they already scored.
    pub async fn recommendations(
        state: &AppState,
        user_id: i64,
    ) -> Result<Vec<RecommendedSlot>, AppError> {
        UserService::find_user(&state.db, user_id).await?;

        // 1. Taste and consumed titles
        let votes = user_vote::Entity::find()
            .filter(user_vote::Column::UserId.eq(user_id))
            .all(&state.db)
            .await?;
        let consumed: HashSet<String> = votes.iter().map(|v| v.catalog_id.clone()).collect();
        let profile = PreferenceProfile::from_votes(votes.iter().map(|v| (v.year, v.kind)));

        // 2. Open slots the user is not in
        let joined: HashSet<i32> = slot_participant::Entity::find()
            .filter(slot_participant::Column::UserId.eq(user_id))
            .all(&state.db)
            .await?
            .into_iter()
            .map(|p| p.slot_id)
            .collect();

        let slots: Vec<slot::Model> = Self::upcoming_open_slots(&state.db, None)
            .await?
            .into_iter()
            .filter(|s| !joined.contains(&s.slot_id))
            .collect();

        let movie_ids: Vec<i32> = slots.iter().map(|s| s.movie_id).collect();
        let movies: HashMap<i32, movie::Model> = movie::Entity::find()
            .filter(movie::Column::MovieId.is_in(movie_ids))
            .all(&state.db)
            .await?
            .into_iter()
            .map(|m| (m.movie_id, m))
            .collect();

        // 3. Rank
        let candidates = slots
            .into_iter()
            .filter_map(|slot| {
                let movie = movies.get(&slot.movie_id)?;
                Some(InterestCandidate {
                    catalog_ids: movie
                        .kinopoisk_id
                        .iter()
                        .chain(movie.imdb_id.iter())
                        .cloned()
                        .collect(),
                    kind: movie.kind,
                    year: movie.year,
                    item: slot,
                })
            })
            .collect();

        let ranked: Vec<(slot::Model, f64)> =
            annotate_slots_by_interest(candidates, &profile, &consumed)
                .into_iter()
                .take(RECOMMENDATION_LIMIT)
                .collect();

        let (ranked_slots, scores): (Vec<slot::Model>, Vec<f64>) = ranked.into_iter().unzip();
        let summaries = SlotService::summarize(&state.db, ranked_slots).await?;

        Ok(summaries
            .into_iter()
            .zip(scores)
            .map(|(slot, interest)| RecommendedSlot { slot, interest })
            .collect())
    }

    async fn filter_candidates(
        state: &AppState,
        movie_id: i32,
        user_id: i64,
        tolerance: f64,
    ) -> Result<Vec<Candidate>, AppError> {
        // 1. Movie and its duplicates
        let user = UserService::find_user(&state.db, user_id).await?;
        let movie = MovieService::find_movie(&state.db, movie_id).await?;
        let movie_ids = MovieService::sibling_movie_ids(&state.db, &movie).await?;

        let slots = Self::upcoming_open_slots(&state.db, Some(movie_ids)).await?;

        // 2. Memberships
        let slot_ids: Vec<i32> = slots.iter().map(|s| s.slot_id).collect();
        let mut members: HashMap<i32, Vec<i64>> = HashMap::new();
        for p in slot_participant::Entity::find()
            .filter(slot_participant::Column::SlotId.is_in(slot_ids))
            .order_by_asc(slot_participant::Column::JoinedAt)
            .order_by_asc(slot_participant::Column::SlotParticipantId)
            .all(&state.db)
            .await?
        {
            members.entry(p.slot_id).or_default().push(p.user_id);
        }

        let mut everyone: Vec<i64> = members.values().flatten().copied().collect();
        everyone.push(user_id);
        everyone.sort_unstable();
        everyone.dedup();

        let peers = load_peer_ratings(&state.db, &everyone).await?;
        let votes = load_vote_maps(&state.db, &everyone).await?;

        let user_peer = peer_of(&user);
        let empty = HashMap::new();
        let user_votes = votes.get(&user_id).unwrap_or(&empty);

        // 3. Filter and score
        let mut candidates = Vec::new();
        for slot in slots {
            let participants = members.remove(&slot.slot_id).unwrap_or_default();

            if participants.contains(&user_id) {
                continue;
            }
            let participant_count = participants.len() as u64;
            if let Some(max) = slot.max_participants {
                if participant_count >= max as u64 {
                    continue;
                }
            }

            let participant_peers: Vec<PeerRating> = participants
                .iter()
                .map(|id| peers.get(id).copied().unwrap_or(PeerRating::new(0.0, 0)))
                .collect();
            let rating_gap = slot_rating_gap(user_peer, &participant_peers);
            if !within_tolerance(rating_gap, tolerance) {
                continue;
            }

            let similarities: Vec<f64> = participants
                .iter()
                .zip(&participant_peers)
                .map(|(id, peer)| {
                    let preference =
                        preference_similarity(user_votes, votes.get(id).unwrap_or(&empty));
                    combined_similarity(preference, peer_rating_closeness(user_peer, *peer))
                })
                .collect();

            candidates.push(Candidate {
                slot,
                participant_count,
                rating_gap,
                compatibility: slot_compatibility(&similarities),
            });
        }

        // 4. Closest rating first; stable, so ties keep schedule order
        candidates.sort_by(|a, b| gap_sort_key(a.rating_gap).total_cmp(&gap_sort_key(b.rating_gap)));

        Ok(candidates)
    }

    async fn upcoming_open_slots<C: ConnectionTrait>(
        db: &C,
        movie_ids: Option<Vec<i32>>,
    ) -> Result<Vec<slot::Model>, AppError> {
        let mut query = slot::Entity::find()
            .filter(slot::Column::Status.eq(SlotStatus::Open))
            .filter(slot::Column::ScheduledAt.gt(Utc::now().naive_utc()));
        if let Some(ids) = movie_ids {
            query = query.filter(slot::Column::MovieId.is_in(ids));
        }

        Ok(query
            .order_by_asc(slot::Column::ScheduledAt)
            .order_by_asc(slot::Column::SlotId)
            .all(db)
            .await?)
    }

    async fn to_compatible_slots(
        state: &AppState,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<CompatibleSlot>, AppError> {
        let scores: Vec<(Option<f64>, f64)> = candidates
            .iter()
            .map(|c| (c.rating_gap, c.compatibility))
            .collect();
        let slots = candidates.into_iter().map(|c| c.slot).collect();
        let summaries = SlotService::summarize(&state.db, slots).await?;

        Ok(summaries
            .into_iter()
            .zip(scores)
            .map(|(slot, (rating_gap, compatibility))| CompatibleSlot {
                slot,
                rating_gap,
                compatibility,
            })
            .collect())
    }
}

fn peer_of(user: &bot_user::Model) -> PeerRating {
    PeerRating::new(user.rating, user.total_ratings)
}

async fn load_peer_ratings<C: ConnectionTrait>(
    db: &C,
    user_ids: &[i64],
) -> Result<HashMap<i64, PeerRating>, AppError> {
    Ok(bot_user::Entity::find()
        .filter(bot_user::Column::UserId.is_in(user_ids.to_vec()))
        .all(db)
        .await?
        .iter()
        .map(|u| (u.user_id, peer_of(u)))
        .collect())
}

/// catalog id -> score, per user.
async fn load_vote_maps<C: ConnectionTrait>(
    db: &C,
    user_ids: &[i64],
) -> Result<HashMap<i64, HashMap<String, i32>>, AppError> {
    let mut maps: HashMap<i64, HashMap<String, i32>> = HashMap::new();
    for vote in user_vote::Entity::find()
        .filter(user_vote::Column::UserId.is_in(user_ids.to_vec()))
        .all(db)
        .await?
    {
        maps.entry(vote.user_id)
            .or_default()
            .insert(vote.catalog_id, vote.score);
    }
    Ok(maps)
}
