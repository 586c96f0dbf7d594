use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use tracing::info;

use super::dto::{
    OutstandingRatingsResponse, OutstandingUser, SubmitRatingRequest, SubmitRatingResponse,
};
use super::entity::rating;
use crate::domain::slot::entity::room;
use crate::domain::slot::service::SlotService;
use crate::domain::user::entity::bot_user;
use crate::notification::{dispatch, DomainEvent};
use crate::state::AppState;
use crate::utils::error::{is_unique_violation, AppError};

pub const MIN_SCORE: i32 = 1;
pub const MAX_SCORE: i32 = 5;

pub struct RatingService;

impl RatingService {
    /// Records one peer rating and recomputes the rated user's average from
    /// every rating they have received.
    pub async fn submit_rating(
        state: &AppState,
        room_id: i32,
        rater_id: i64,
        req: SubmitRatingRequest,
    ) -> Result<SubmitRatingResponse, AppError> {
        let rated_id = req.rated_user_id;

        // 1. Input
        validate_score(req.score)?;
        if rater_id == rated_id {
            return Err(AppError::SelfRating(
                "You cannot rate yourself.".to_string(),
            ));
        }

        let txn = state.db.begin().await?;

        // 2. Room membership
        let room = Self::find_room(&txn, room_id).await?;
        let participants = SlotService::participant_ids(&txn, room.slot_id).await?;
        if !participants.contains(&rater_id) {
            return Err(AppError::NotRoomParticipant(
                "You are not a participant of this room.".to_string(),
            ));
        }
        if !participants.contains(&rated_id) {
            return Err(AppError::NotRoomParticipant(
                "The rated user is not a participant of this room.".to_string(),
            ));
        }

        // 3. Duplicate check, backed by uq_rating_room_rater_rated
        let existing = rating::Entity::find()
            .filter(rating::Column::RoomId.eq(room_id))
            .filter(rating::Column::RaterId.eq(rater_id))
            .filter(rating::Column::RatedId.eq(rated_id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(already_rated());
        }

        let now = Utc::now().naive_utc();
        let inserted = rating::ActiveModel {
            room_id: Set(room_id),
            rater_id: Set(rater_id),
            rated_id: Set(rated_id),
            score: Set(req.score),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await;

        let saved = match inserted {
            Ok(model) => model,
            Err(e) if is_unique_violation(&e) => return Err(already_rated()),
            Err(e) => return Err(e.into()),
        };

        // 4. Aggregate
        let (average, total) = Self::recompute_average(&txn, rated_id).await?;

        let outstanding = Self::outstanding_for(&txn, room_id, &participants, rater_id).await?;

        txn.commit().await?;

        info!(
            room_id = room_id,
            rater_id = rater_id,
            rated_id = rated_id,
            score = req.score,
            average = average,
            "Rating recorded"
        );

        dispatch(
            state.notifier.as_ref(),
            DomainEvent::RatingRecorded {
                room_id,
                rater_id,
                rated_id,
                score: req.score,
            },
        )
        .await;

        if outstanding.is_empty() {
            dispatch(
                state.notifier.as_ref(),
                DomainEvent::NoMoreUsersToRate { room_id, rater_id },
            )
            .await;
        }

        Ok(SubmitRatingResponse {
            rating: saved.into(),
            rated_user_rating: average,
            rated_user_total_ratings: total,
            next: outstanding.first().cloned(),
            outstanding,
        })
    }

    /// Room participants the rater has not rated yet, in join order.
    pub async fn outstanding_ratings(
        state: &AppState,
        room_id: i32,
        rater_id: i64,
    ) -> Result<OutstandingRatingsResponse, AppError> {
        let room = Self::find_room(&state.db, room_id).await?;
        let participants = SlotService::participant_ids(&state.db, room.slot_id).await?;
        if !participants.contains(&rater_id) {
            return Err(AppError::NotRoomParticipant(
                "You are not a participant of this room.".to_string(),
            ));
        }

        let users = Self::outstanding_for(&state.db, room_id, &participants, rater_id).await?;

        Ok(OutstandingRatingsResponse { room_id, users })
    }

    async fn recompute_average<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
    ) -> Result<(f64, i32), AppError> {
        let scores: Vec<i32> = rating::Entity::find()
            .filter(rating::Column::RatedId.eq(user_id))
            .all(db)
            .await?
            .into_iter()
            .map(|r| r.score)
            .collect();

        let average = average_score(&scores);
        let total = scores.len() as i32;

        bot_user::Entity::update_many()
            .col_expr(bot_user::Column::Rating, Expr::value(average))
            .col_expr(bot_user::Column::TotalRatings, Expr::value(total))
            .col_expr(bot_user::Column::UpdatedAt, Expr::value(Utc::now().naive_utc()))
            .filter(bot_user::Column::UserId.eq(user_id))
            .exec(db)
            .await?;

        Ok((average, total))
    }

    async fn outstanding_for<C: ConnectionTrait>(
        db: &C,
        room_id: i32,
        participants: &[i64],
        rater_id: i64,
    ) -> Result<Vec<OutstandingUser>, AppError> {
        let rated: HashSet<i64> = rating::Entity::find()
            .filter(rating::Column::RoomId.eq(room_id))
            .filter(rating::Column::RaterId.eq(rater_id))
            .all(db)
            .await?
            .into_iter()
            .map(|r| r.rated_id)
            .collect();

        let remaining: Vec<i64> = participants
            .iter()
            .copied()
            .filter(|id| *id != rater_id && !rated.contains(id))
            .collect();

        let names: HashMap<i64, String> = bot_user::Entity::find()
            .filter(bot_user::Column::UserId.is_in(remaining.clone()))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.user_id, u.display_name))
            .collect();

        Ok(remaining
            .into_iter()
            .map(|user_id| OutstandingUser {
                user_id,
                display_name: names.get(&user_id).cloned(),
            })
            .collect())
    }

    async fn find_room<C: ConnectionTrait>(db: &C, room_id: i32) -> Result<room::Model, AppError> {
        room::Entity::find_by_id(room_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::RoomNotFound("Room not found.".to_string()))
    }
}

pub fn validate_score(score: i32) -> Result<(), AppError> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(AppError::InvalidScore(format!(
            "Score must be between {} and {}.",
            MIN_SCORE, MAX_SCORE
        )));
    }
    Ok(())
}

/// Plain mean over every received score; 0 when there are none.
pub fn average_score(scores: &[i32]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(|s| f64::from(*s)).sum::<f64>() / scores.len() as f64
}

fn already_rated() -> AppError {
    AppError::AlreadyRated("You have already rated this user in this room.".to_string())
}
