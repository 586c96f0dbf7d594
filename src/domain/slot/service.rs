use std::collections::HashMap;
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{error, info, warn};

use super::dto::{
    DeleteSlotResponse, JoinSlotResponse, MySlotsResponse, NewSlot, ParticipantItem,
    SlotResponse, SlotSummary,
};
use super::entity::room::{self, RoomStatus};
use super::entity::slot::{self, SlotStatus};
use super::entity::slot_participant;
use super::provisioner::RoomRequest;
use super::schedule::ensure_future;
use crate::domain::movie::entity::movie;
use crate::domain::movie::service::MovieService;
use crate::domain::rating::entity::rating;
use crate::domain::user::entity::bot_user;
use crate::domain::user::service::UserService;
use crate::notification::{dispatch, DomainEvent};
use crate::state::AppState;
use crate::utils::error::{is_unique_violation, AppError};

/// Lowest accepted `min_participants`.
pub const MIN_PARTICIPANTS_FLOOR: i32 = 1;

pub struct SlotService;

impl SlotService {
    /// Creates an `open` slot with the creator as its first participant.
    ///
    /// The creator's membership counts as a join, so a slot whose minimum is
    /// already met is filled right away.
    pub async fn create_slot(
        state: &AppState,
        creator_id: i64,
        new_slot: NewSlot,
    ) -> Result<SlotResponse, AppError> {
        let now = Utc::now().naive_utc();

        // 1. Input validation
        ensure_future(new_slot.scheduled_at, now)?;
        let min_participants = new_slot
            .min_participants
            .unwrap_or(state.config.min_participants_default);
        validate_participant_counts(min_participants, new_slot.max_participants)?;

        // 2. Referenced rows
        UserService::find_user(&state.db, creator_id).await?;
        MovieService::find_movie(&state.db, new_slot.movie_id).await?;

        // 3. Slot + creator membership + fill check, atomically
        let txn = state.db.begin().await?;

        let slot = slot::ActiveModel {
            movie_id: Set(new_slot.movie_id),
            creator_id: Set(creator_id),
            scheduled_at: Set(new_slot.scheduled_at),
            min_participants: Set(min_participants),
            max_participants: Set(new_slot.max_participants),
            status: Set(SlotStatus::Open),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        slot_participant::ActiveModel {
            slot_id: Set(slot.slot_id),
            user_id: Set(creator_id),
            joined_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let room = Self::try_fill(&txn, &slot, state.config.discussion_window_hours, now).await?;

        txn.commit().await?;

        info!(
            slot_id = slot.slot_id,
            movie_id = slot.movie_id,
            creator_id = creator_id,
            "Slot created"
        );

        // 4. Side effects of a fill happen only after commit
        if let Some(room) = room {
            Self::finalize_fill(state, room).await;
        }

        Self::get_slot(state, slot.slot_id).await
    }

    /// Adds the user to the slot. Joining twice is a no-op.
    pub async fn join_slot(
        state: &AppState,
        slot_id: i32,
        user_id: i64,
    ) -> Result<JoinSlotResponse, AppError> {
        UserService::find_user(&state.db, user_id).await?;
        let now = Utc::now().naive_utc();

        let txn = state.db.begin().await?;

        // 1. Slot (row-locked until commit) and existing membership
        let slot = Self::find_slot_for_update(&txn, slot_id).await?;

        if Self::find_participant(&txn, slot_id, user_id)
            .await?
            .is_some()
        {
            txn.commit().await?;
            return Self::already_joined(state, slot_id).await;
        }

        // 2. State and capacity
        if slot.status == SlotStatus::Completed {
            return Err(AppError::SlotNotOpen(
                "This slot is already completed.".to_string(),
            ));
        }

        let count = Self::count_participants(&txn, slot_id).await?;
        if let Some(max) = slot.max_participants {
            if count >= max as u64 {
                return Err(AppError::SlotFull(format!(
                    "This slot already has the maximum of {} participants.",
                    max
                )));
            }
        }

        // 3. Membership
        let inserted = slot_participant::ActiveModel {
            slot_id: Set(slot_id),
            user_id: Set(user_id),
            joined_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await;

        if let Err(e) = inserted {
            if is_unique_violation(&e) {
                // A concurrent request added the same membership.
                txn.rollback().await?;
                return Self::already_joined(state, slot_id).await;
            }
            return Err(e.into());
        }

        // 4. Fill
        let room = Self::try_fill(&txn, &slot, state.config.discussion_window_hours, now).await?;

        txn.commit().await?;

        info!(slot_id = slot_id, user_id = user_id, "User joined slot");

        let filled = room.is_some();
        if let Some(room) = room {
            Self::finalize_fill(state, room).await;
        }

        Ok(JoinSlotResponse {
            already_participant: false,
            filled,
            slot: Self::get_slot(state, slot_id).await?,
        })
    }

    async fn already_joined(state: &AppState, slot_id: i32) -> Result<JoinSlotResponse, AppError> {
        Ok(JoinSlotResponse {
            already_participant: true,
            filled: false,
            slot: Self::get_slot(state, slot_id).await?,
        })
    }

    /// Leaves an `open` slot. The creator has to delete the slot instead.
    pub async fn leave_slot(
        state: &AppState,
        slot_id: i32,
        user_id: i64,
    ) -> Result<SlotResponse, AppError> {
        let txn = state.db.begin().await?;

        // Locked so a concurrent fill cannot slip in between check and delete.
        let slot = Self::find_slot_for_update(&txn, slot_id).await?;

        if slot.creator_id == user_id {
            return Err(AppError::CreatorCannotLeave(
                "The creator cannot leave; delete the slot instead.".to_string(),
            ));
        }

        let participant = Self::find_participant(&txn, slot_id, user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotParticipant("You are not a participant of this slot.".to_string())
            })?;

        if slot.status != SlotStatus::Open {
            return Err(AppError::SlotNotOpen(
                "You can only leave a slot that is still open.".to_string(),
            ));
        }

        participant.delete(&txn).await?;
        txn.commit().await?;

        info!(slot_id = slot_id, user_id = user_id, "User left slot");

        Self::get_slot(state, slot_id).await
    }

    /// Removes the slot with its participants, room and the room's ratings.
    pub async fn delete_slot(
        state: &AppState,
        slot_id: i32,
        user_id: i64,
    ) -> Result<DeleteSlotResponse, AppError> {
        let txn = state.db.begin().await?;

        let slot = Self::find_slot(&txn, slot_id).await?;
        if slot.creator_id != user_id {
            return Err(AppError::NotSlotCreator(
                "Only the creator can delete this slot.".to_string(),
            ));
        }

        // Children first
        if let Some(room) = Self::find_room(&txn, slot_id).await? {
            rating::Entity::delete_many()
                .filter(rating::Column::RoomId.eq(room.room_id))
                .exec(&txn)
                .await?;
            room.delete(&txn).await?;
        }

        slot_participant::Entity::delete_many()
            .filter(slot_participant::Column::SlotId.eq(slot_id))
            .exec(&txn)
            .await?;

        slot.delete(&txn).await?;

        txn.commit().await?;

        info!(slot_id = slot_id, user_id = user_id, "Slot deleted");

        Ok(DeleteSlotResponse { slot_id })
    }

    /// Creator-triggered completion.
    pub async fn complete_slot(
        state: &AppState,
        slot_id: i32,
        user_id: i64,
    ) -> Result<SlotResponse, AppError> {
        let slot = Self::find_slot(&state.db, slot_id).await?;
        if slot.creator_id != user_id {
            return Err(AppError::NotSlotCreator(
                "Only the creator can complete this slot.".to_string(),
            ));
        }

        Self::complete(state, slot_id).await?;

        Self::get_slot(state, slot_id).await
    }

    /// Completes every `full` slot whose discussion window has closed.
    ///
    /// Failures are logged per slot; the rest of the batch still runs.
    pub async fn complete_due_slots(
        state: &AppState,
        now: NaiveDateTime,
    ) -> Result<Vec<i32>, AppError> {
        let due_rooms = room::Entity::find()
            .filter(room::Column::Status.eq(RoomStatus::Active))
            .filter(room::Column::DiscussionEndTime.lte(now))
            .order_by_asc(room::Column::DiscussionEndTime)
            .all(&state.db)
            .await?;

        let mut completed = Vec::new();
        for due in due_rooms {
            match Self::complete(state, due.slot_id).await {
                Ok(()) => completed.push(due.slot_id),
                Err(e) => {
                    warn!(slot_id = due.slot_id, error = %e, "Failed to complete due slot")
                }
            }
        }

        Ok(completed)
    }

    /// `full` -> `completed`, room included.
    async fn complete(state: &AppState, slot_id: i32) -> Result<(), AppError> {
        let txn = state.db.begin().await?;

        let result = slot::Entity::update_many()
            .col_expr(
                slot::Column::Status,
                Expr::value(SlotStatus::Completed.into_value()),
            )
            .filter(slot::Column::SlotId.eq(slot_id))
            .filter(slot::Column::Status.eq(SlotStatus::Full))
            .exec(&txn)
            .await?;

        if result.rows_affected != 1 {
            // Distinguish a missing slot from one in the wrong state.
            Self::find_slot(&txn, slot_id).await?;
            return Err(AppError::SlotNotOpen(
                "Only a full slot can be completed.".to_string(),
            ));
        }

        let room = Self::find_room(&txn, slot_id).await?;
        let room_id = room.as_ref().map(|r| r.room_id);
        if let Some(room) = room {
            let mut active = room.into_active_model();
            active.status = Set(RoomStatus::Completed);
            active.update(&txn).await?;
        }

        txn.commit().await?;

        info!(slot_id = slot_id, room_id = ?room_id, "Slot completed");

        dispatch(
            state.notifier.as_ref(),
            DomainEvent::SlotCompleted { slot_id, room_id },
        )
        .await;

        Ok(())
    }

    pub async fn get_slot(state: &AppState, slot_id: i32) -> Result<SlotResponse, AppError> {
        let slot = Self::find_slot(&state.db, slot_id).await?;
        Self::build_slot_response(&state.db, slot).await
    }

    /// Open slots still ahead, soonest first.
    pub async fn list_open_slots(state: &AppState) -> Result<Vec<SlotSummary>, AppError> {
        let now = Utc::now().naive_utc();
        let slots = slot::Entity::find()
            .filter(slot::Column::Status.eq(SlotStatus::Open))
            .filter(slot::Column::ScheduledAt.gt(now))
            .order_by_asc(slot::Column::ScheduledAt)
            .order_by_asc(slot::Column::SlotId)
            .all(&state.db)
            .await?;

        Self::summarize(&state.db, slots).await
    }

    pub async fn list_my_slots(
        state: &AppState,
        user_id: i64,
    ) -> Result<MySlotsResponse, AppError> {
        let created = slot::Entity::find()
            .filter(slot::Column::CreatorId.eq(user_id))
            .order_by_asc(slot::Column::ScheduledAt)
            .all(&state.db)
            .await?;

        let joined_ids: Vec<i32> = slot_participant::Entity::find()
            .filter(slot_participant::Column::UserId.eq(user_id))
            .all(&state.db)
            .await?
            .into_iter()
            .map(|p| p.slot_id)
            .collect();

        let joined = slot::Entity::find()
            .filter(slot::Column::SlotId.is_in(joined_ids))
            .filter(slot::Column::CreatorId.ne(user_id))
            .order_by_asc(slot::Column::ScheduledAt)
            .all(&state.db)
            .await?;

        Ok(MySlotsResponse {
            created: Self::summarize(&state.db, created).await?,
            joined: Self::summarize(&state.db, joined).await?,
        })
    }

    /// Moves an `open` slot that reached its minimum to `full` and opens its room.
    ///
    /// The status change is conditional on the row still being `open`, and the
    /// room insert is guarded by the unique `room.slot_id`, so at most one
    /// caller ever gets a room back.
    pub async fn try_fill<C: ConnectionTrait>(
        db: &C,
        slot: &slot::Model,
        discussion_window_hours: i64,
        now: NaiveDateTime,
    ) -> Result<Option<room::Model>, AppError> {
        if slot.status != SlotStatus::Open {
            return Ok(None);
        }

        let count = Self::count_participants(db, slot.slot_id).await?;
        if count < slot.min_participants.max(MIN_PARTICIPANTS_FLOOR) as u64 {
            return Ok(None);
        }

        let result = slot::Entity::update_many()
            .col_expr(slot::Column::Status, Expr::value(SlotStatus::Full.into_value()))
            .filter(slot::Column::SlotId.eq(slot.slot_id))
            .filter(slot::Column::Status.eq(SlotStatus::Open))
            .exec(db)
            .await?;

        if result.rows_affected != 1 {
            return Ok(None);
        }

        let room = Self::open_room(db, slot, discussion_window_hours, now).await?;
        info!(
            slot_id = slot.slot_id,
            room_id = room.room_id,
            participants = count,
            "Slot filled, room created"
        );

        Ok(Some(room))
    }

    /// Inserts the slot's room. A second room for the same slot is `SLOT4095`.
    pub async fn open_room<C: ConnectionTrait>(
        db: &C,
        slot: &slot::Model,
        discussion_window_hours: i64,
        now: NaiveDateTime,
    ) -> Result<room::Model, AppError> {
        let discussion_end_time = chrono::Duration::try_hours(discussion_window_hours)
            .and_then(|window| slot.scheduled_at.checked_add_signed(window))
            .ok_or_else(|| {
                AppError::InternalError(format!(
                    "Invalid discussion window: {} hours",
                    discussion_window_hours
                ))
            })?;

        room::ActiveModel {
            slot_id: Set(slot.slot_id),
            status: Set(RoomStatus::Active),
            watch_url: Set(None),
            external_group_id: Set(None),
            external_topic_id: Set(None),
            discussion_end_time: Set(discussion_end_time),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::RoomAlreadyExists("A room already exists for this slot.".to_string())
            } else {
                e.into()
            }
        })
    }

    /// Post-commit work of a fill: provisioning and the `RoomCreated` event.
    /// Never fails the caller.
    async fn finalize_fill(state: &AppState, room: room::Model) {
        let room_id = room.room_id;
        if let Err(e) = Self::announce_room(state, room).await {
            error!(room_id = room_id, error = %e, "Failed to announce room");
        }
    }

    async fn announce_room(state: &AppState, room: room::Model) -> Result<(), AppError> {
        let slot = Self::find_slot(&state.db, room.slot_id).await?;
        let movie = MovieService::find_movie(&state.db, slot.movie_id).await?;
        let participant_ids = Self::participant_ids(&state.db, slot.slot_id).await?;

        let mut watch_url = None;
        if let Some(provisioner) = &state.room_provisioner {
            let request = RoomRequest {
                slot_id: slot.slot_id,
                movie_title: movie.title.clone(),
                movie_kind: movie.kind,
                kinopoisk_id: movie.kinopoisk_id.clone(),
                imdb_id: movie.imdb_id.clone(),
                participant_ids: participant_ids.clone(),
            };
            let timeout = Duration::from_secs(state.config.external_timeout_secs);

            match tokio::time::timeout(timeout, provisioner.provision(&request)).await {
                Ok(Ok(url)) => {
                    let mut active = room.clone().into_active_model();
                    active.watch_url = Set(Some(url.clone()));
                    active.update(&state.db).await?;
                    watch_url = Some(url);
                }
                Ok(Err(e)) => {
                    warn!(slot_id = slot.slot_id, error = %e, "Room provisioning failed")
                }
                Err(_) => warn!(slot_id = slot.slot_id, "Room provisioning timed out"),
            }
        }

        dispatch(
            state.notifier.as_ref(),
            DomainEvent::RoomCreated {
                slot_id: slot.slot_id,
                room_id: room.room_id,
                movie_title: movie.title,
                scheduled_at: slot.scheduled_at,
                participant_ids,
                watch_url,
            },
        )
        .await;

        Ok(())
    }

    pub async fn find_slot<C: ConnectionTrait>(
        db: &C,
        slot_id: i32,
    ) -> Result<slot::Model, AppError> {
        slot::Entity::find_by_id(slot_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::SlotNotFound("Slot not found.".to_string()))
    }

    /// `SELECT .. FOR UPDATE` on the slot row. Joins and leaves on the same
    /// slot serialize on this lock, which keeps the participant count within
    /// `max_participants`.
    async fn find_slot_for_update<C: ConnectionTrait>(
        db: &C,
        slot_id: i32,
    ) -> Result<slot::Model, AppError> {
        slot::Entity::find_by_id(slot_id)
            .lock_exclusive()
            .one(db)
            .await?
            .ok_or_else(|| AppError::SlotNotFound("Slot not found.".to_string()))
    }

    pub async fn find_room<C: ConnectionTrait>(
        db: &C,
        slot_id: i32,
    ) -> Result<Option<room::Model>, AppError> {
        Ok(room::Entity::find()
            .filter(room::Column::SlotId.eq(slot_id))
            .one(db)
            .await?)
    }

    pub async fn find_participant<C: ConnectionTrait>(
        db: &C,
        slot_id: i32,
        user_id: i64,
    ) -> Result<Option<slot_participant::Model>, AppError> {
        Ok(slot_participant::Entity::find()
            .filter(slot_participant::Column::SlotId.eq(slot_id))
            .filter(slot_participant::Column::UserId.eq(user_id))
            .one(db)
            .await?)
    }

    pub async fn count_participants<C: ConnectionTrait>(
        db: &C,
        slot_id: i32,
    ) -> Result<u64, AppError> {
        Ok(slot_participant::Entity::find()
            .filter(slot_participant::Column::SlotId.eq(slot_id))
            .count(db)
            .await?)
    }

    /// Participant ids in join order.
    pub async fn participant_ids<C: ConnectionTrait>(
        db: &C,
        slot_id: i32,
    ) -> Result<Vec<i64>, AppError> {
        Ok(slot_participant::Entity::find()
            .filter(slot_participant::Column::SlotId.eq(slot_id))
            .order_by_asc(slot_participant::Column::JoinedAt)
            .order_by_asc(slot_participant::Column::SlotParticipantId)
            .all(db)
            .await?
            .into_iter()
            .map(|p| p.user_id)
            .collect())
    }

    async fn build_slot_response<C: ConnectionTrait>(
        db: &C,
        slot: slot::Model,
    ) -> Result<SlotResponse, AppError> {
        let movie_title = movie::Entity::find_by_id(slot.movie_id)
            .one(db)
            .await?
            .map(|m| m.title)
            .unwrap_or_default();

        let participants: Vec<ParticipantItem> = slot_participant::Entity::find()
            .filter(slot_participant::Column::SlotId.eq(slot.slot_id))
            .find_also_related(bot_user::Entity)
            .order_by_asc(slot_participant::Column::JoinedAt)
            .order_by_asc(slot_participant::Column::SlotParticipantId)
            .all(db)
            .await?
            .into_iter()
            .map(|(p, user)| ParticipantItem {
                user_id: p.user_id,
                display_name: user.map(|u| u.display_name),
                joined_at: p.joined_at,
            })
            .collect();

        let room = Self::find_room(db, slot.slot_id).await?;

        Ok(SlotResponse {
            slot_id: slot.slot_id,
            movie_id: slot.movie_id,
            movie_title,
            creator_id: slot.creator_id,
            scheduled_at: slot.scheduled_at,
            min_participants: slot.min_participants,
            max_participants: slot.max_participants,
            status: slot.status,
            participant_count: participants.len(),
            participants,
            room: room.map(Into::into),
        })
    }

    pub async fn summarize<C: ConnectionTrait>(
        db: &C,
        slots: Vec<slot::Model>,
    ) -> Result<Vec<SlotSummary>, AppError> {
        let movie_ids: Vec<i32> = slots.iter().map(|s| s.movie_id).collect();
        let titles: HashMap<i32, String> = movie::Entity::find()
            .filter(movie::Column::MovieId.is_in(movie_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.movie_id, m.title))
            .collect();

        let mut summaries = Vec::with_capacity(slots.len());
        for slot in slots {
            let participant_count = Self::count_participants(db, slot.slot_id).await?;
            summaries.push(SlotSummary {
                slot_id: slot.slot_id,
                movie_id: slot.movie_id,
                movie_title: titles.get(&slot.movie_id).cloned().unwrap_or_default(),
                scheduled_at: slot.scheduled_at,
                status: slot.status,
                participant_count,
                min_participants: slot.min_participants,
                max_participants: slot.max_participants,
            });
        }

        Ok(summaries)
    }
}

/// `min >= 1`, and `max >= min` when a maximum is given.
pub fn validate_participant_counts(min: i32, max: Option<i32>) -> Result<(), AppError> {
    if min < MIN_PARTICIPANTS_FLOOR {
        return Err(AppError::InvalidParticipantCount(format!(
            "Minimum participants must be at least {}.",
            MIN_PARTICIPANTS_FLOOR
        )));
    }
    if let Some(max) = max {
        if max < min {
            return Err(AppError::InvalidParticipantCount(
                "Maximum participants cannot be lower than the minimum.".to_string(),
            ));
        }
    }
    Ok(())
}
