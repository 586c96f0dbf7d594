//! Slot lifecycle against an in-memory database.

mod common;

use std::time::Duration;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, PaginatorTrait, Set};

use common::{create_movie, create_slot, create_user, in_days, setup, setup_with_provisioner};
use cowatch_server::domain::bot::conversation::{ConversationState, ConversationStore};
use cowatch_server::domain::slot::dto::NewSlot;
use cowatch_server::domain::slot::entity::room::{self, RoomStatus};
use cowatch_server::domain::slot::entity::slot::{self, SlotStatus};
use cowatch_server::domain::slot::entity::slot_participant;
use cowatch_server::domain::slot::service::SlotService;
use cowatch_server::domain::slot::sweeper::CompletionSweeper;
use cowatch_server::notification::DomainEvent;
use cowatch_server::utils::error::AppError;

#[tokio::test]
async fn should_fill_slot_and_create_room_when_minimum_reached() {
    // Arrange
    let ctx = setup_with_provisioner().await;
    create_user(&ctx.state, 1, "Alice").await;
    create_user(&ctx.state, 2, "Bob").await;
    let movie_id = create_movie(&ctx.state, "Heat", Some("409")).await;
    let slot = create_slot(&ctx.state, 1, movie_id, 2, None).await;
    assert_eq!(slot.status, SlotStatus::Open);
    assert_eq!(slot.participant_count, 1);

    // Act
    let joined = SlotService::join_slot(&ctx.state, slot.slot_id, 2).await.unwrap();

    // Assert
    assert!(joined.filled);
    assert!(!joined.already_participant);
    assert_eq!(joined.slot.status, SlotStatus::Full);
    assert_eq!(joined.slot.participant_ids(), vec![1, 2]);

    let room = joined.slot.room.expect("room should exist");
    assert_eq!(
        room.watch_url.as_deref(),
        Some(format!("https://w2g.tv/rooms/test-{}", slot.slot_id).as_str())
    );

    let events = ctx.sink.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        DomainEvent::RoomCreated {
            slot_id,
            movie_title,
            participant_ids,
            watch_url,
            ..
        } => {
            assert_eq!(*slot_id, slot.slot_id);
            assert_eq!(movie_title, "Heat");
            assert_eq!(participant_ids, &vec![1, 2]);
            assert!(watch_url.is_some());
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn should_fill_immediately_when_minimum_is_one() {
    let ctx = setup().await;
    create_user(&ctx.state, 1, "Alice").await;
    let movie_id = create_movie(&ctx.state, "Solo", None).await;

    let slot = create_slot(&ctx.state, 1, movie_id, 1, None).await;

    assert_eq!(slot.status, SlotStatus::Full);
    let room = slot.room.expect("room should exist");
    assert!(room.watch_url.is_none());
    assert_eq!(ctx.sink.names(), vec!["room_created"]);
}

#[tokio::test]
async fn join_should_be_idempotent() {
    let ctx = setup().await;
    create_user(&ctx.state, 1, "Alice").await;
    create_user(&ctx.state, 2, "Bob").await;
    let movie_id = create_movie(&ctx.state, "Heat", None).await;
    let slot = create_slot(&ctx.state, 1, movie_id, 3, None).await;

    SlotService::join_slot(&ctx.state, slot.slot_id, 2).await.unwrap();
    let again = SlotService::join_slot(&ctx.state, slot.slot_id, 2).await.unwrap();

    assert!(again.already_participant);
    assert_eq!(again.slot.participant_count, 2);
}

#[tokio::test]
async fn join_should_reject_when_max_reached() {
    let ctx = setup().await;
    for (id, name) in [(1, "Alice"), (2, "Bob"), (3, "Carol")] {
        create_user(&ctx.state, id, name).await;
    }
    let movie_id = create_movie(&ctx.state, "Heat", None).await;
    let slot = create_slot(&ctx.state, 1, movie_id, 2, Some(2)).await;
    SlotService::join_slot(&ctx.state, slot.slot_id, 2).await.unwrap();

    let result = SlotService::join_slot(&ctx.state, slot.slot_id, 3).await;

    assert!(matches!(result, Err(AppError::SlotFull(_))));
}

#[tokio::test]
async fn join_full_slot_with_capacity_should_not_create_second_room() {
    let ctx = setup().await;
    for (id, name) in [(1, "Alice"), (2, "Bob"), (3, "Carol")] {
        create_user(&ctx.state, id, name).await;
    }
    let movie_id = create_movie(&ctx.state, "Heat", None).await;
    let slot = create_slot(&ctx.state, 1, movie_id, 2, Some(4)).await;
    SlotService::join_slot(&ctx.state, slot.slot_id, 2).await.unwrap();

    let late = SlotService::join_slot(&ctx.state, slot.slot_id, 3).await.unwrap();

    assert!(!late.filled);
    assert_eq!(late.slot.status, SlotStatus::Full);
    assert_eq!(late.slot.participant_count, 3);
    assert_eq!(room::Entity::find().count(&ctx.state.db).await.unwrap(), 1);
    assert_eq!(ctx.sink.names(), vec!["room_created"]);
}

#[tokio::test]
async fn create_should_reject_past_datetime_and_bad_counts() {
    let ctx = setup().await;
    create_user(&ctx.state, 1, "Alice").await;
    let movie_id = create_movie(&ctx.state, "Heat", None).await;

    let past = SlotService::create_slot(
        &ctx.state,
        1,
        NewSlot {
            movie_id,
            scheduled_at: in_days(-1),
            min_participants: None,
            max_participants: None,
        },
    )
    .await;
    assert!(matches!(past, Err(AppError::InvalidSlotDatetime(_))));

    let inverted = SlotService::create_slot(
        &ctx.state,
        1,
        NewSlot {
            movie_id,
            scheduled_at: in_days(1),
            min_participants: Some(4),
            max_participants: Some(3),
        },
    )
    .await;
    assert!(matches!(inverted, Err(AppError::InvalidParticipantCount(_))));
}

#[tokio::test]
async fn leave_should_follow_creator_membership_and_status_rules() {
    let ctx = setup().await;
    for (id, name) in [(1, "Alice"), (2, "Bob"), (3, "Carol")] {
        create_user(&ctx.state, id, name).await;
    }
    let movie_id = create_movie(&ctx.state, "Heat", None).await;
    let slot = create_slot(&ctx.state, 1, movie_id, 3, None).await;
    SlotService::join_slot(&ctx.state, slot.slot_id, 2).await.unwrap();

    let creator = SlotService::leave_slot(&ctx.state, slot.slot_id, 1).await;
    assert!(matches!(creator, Err(AppError::CreatorCannotLeave(_))));

    let stranger = SlotService::leave_slot(&ctx.state, slot.slot_id, 3).await;
    assert!(matches!(stranger, Err(AppError::NotParticipant(_))));

    let left = SlotService::leave_slot(&ctx.state, slot.slot_id, 2).await.unwrap();
    assert_eq!(left.participant_ids(), vec![1]);
    assert_eq!(left.status, SlotStatus::Open);
}

#[tokio::test]
async fn leave_full_slot_should_be_rejected() {
    let ctx = setup().await;
    create_user(&ctx.state, 1, "Alice").await;
    create_user(&ctx.state, 2, "Bob").await;
    let movie_id = create_movie(&ctx.state, "Heat", None).await;
    let slot = create_slot(&ctx.state, 1, movie_id, 2, None).await;
    SlotService::join_slot(&ctx.state, slot.slot_id, 2).await.unwrap();

    let result = SlotService::leave_slot(&ctx.state, slot.slot_id, 2).await;

    assert!(matches!(result, Err(AppError::SlotNotOpen(_))));
}

#[tokio::test]
async fn delete_should_require_creator_and_remove_slot() {
    let ctx = setup().await;
    create_user(&ctx.state, 1, "Alice").await;
    create_user(&ctx.state, 2, "Bob").await;
    let movie_id = create_movie(&ctx.state, "Heat", None).await;
    let slot = create_slot(&ctx.state, 1, movie_id, 2, None).await;
    SlotService::join_slot(&ctx.state, slot.slot_id, 2).await.unwrap();

    let forbidden = SlotService::delete_slot(&ctx.state, slot.slot_id, 2).await;
    assert!(matches!(forbidden, Err(AppError::NotSlotCreator(_))));

    SlotService::delete_slot(&ctx.state, slot.slot_id, 1).await.unwrap();

    let gone = SlotService::get_slot(&ctx.state, slot.slot_id).await;
    assert!(matches!(gone, Err(AppError::SlotNotFound(_))));
    assert_eq!(room::Entity::find().count(&ctx.state.db).await.unwrap(), 0);
}

#[tokio::test]
async fn complete_should_close_slot_and_reject_later_joins() {
    let ctx = setup().await;
    for (id, name) in [(1, "Alice"), (2, "Bob"), (3, "Carol")] {
        create_user(&ctx.state, id, name).await;
    }
    let movie_id = create_movie(&ctx.state, "Heat", None).await;
    let slot = create_slot(&ctx.state, 1, movie_id, 2, None).await;
    SlotService::join_slot(&ctx.state, slot.slot_id, 2).await.unwrap();

    let completed = SlotService::complete_slot(&ctx.state, slot.slot_id, 1).await.unwrap();

    assert_eq!(completed.status, SlotStatus::Completed);
    assert_eq!(
        completed.room.map(|r| r.status),
        Some(RoomStatus::Completed)
    );
    assert_eq!(ctx.sink.names(), vec!["room_created", "slot_completed"]);

    let late = SlotService::join_slot(&ctx.state, slot.slot_id, 3).await;
    assert!(matches!(late, Err(AppError::SlotNotOpen(_))));
}

#[tokio::test]
async fn sweeper_should_complete_slots_past_discussion_window() {
    let ctx = setup().await;
    create_user(&ctx.state, 1, "Alice").await;
    let movie_id = create_movie(&ctx.state, "Heat", None).await;
    let due = create_slot(&ctx.state, 1, movie_id, 1, None).await;
    let not_due = create_slot(&ctx.state, 1, movie_id, 1, None).await;

    // Pull the first room's window into the past.
    let due_room = room::Entity::find_by_id(due.room.as_ref().unwrap().room_id)
        .one(&ctx.state.db)
        .await
        .unwrap()
        .unwrap();
    let mut active = due_room.into_active_model();
    active.discussion_end_time = Set(Utc::now().naive_utc() - chrono::Duration::minutes(1));
    active.update(&ctx.state.db).await.unwrap();

    let completed = CompletionSweeper::new(ctx.state.clone())
        .sweep_once()
        .await
        .unwrap();

    assert_eq!(completed, vec![due.slot_id]);
    let untouched = SlotService::get_slot(&ctx.state, not_due.slot_id).await.unwrap();
    assert_eq!(untouched.status, SlotStatus::Full);
}

#[tokio::test]
async fn list_open_slots_should_be_sorted_by_time() {
    let ctx = setup().await;
    create_user(&ctx.state, 1, "Alice").await;
    let movie_id = create_movie(&ctx.state, "Heat", None).await;

    let later = SlotService::create_slot(
        &ctx.state,
        1,
        NewSlot {
            movie_id,
            scheduled_at: in_days(5),
            min_participants: Some(3),
            max_participants: None,
        },
    )
    .await
    .unwrap();
    let sooner = create_slot(&ctx.state, 1, movie_id, 3, None).await;
    create_slot(&ctx.state, 1, movie_id, 1, None).await; // full, not listed

    let open = SlotService::list_open_slots(&ctx.state).await.unwrap();

    let ids: Vec<i32> = open.iter().map(|s| s.slot_id).collect();
    assert_eq!(ids, vec![sooner.slot_id, later.slot_id]);
}

#[tokio::test]
async fn concurrent_joins_should_never_exceed_max_participants() {
    let ctx = setup().await;
    for (id, name) in [(1, "Alice"), (2, "Bob"), (3, "Carol"), (4, "Dave")] {
        create_user(&ctx.state, id, name).await;
    }
    let movie_id = create_movie(&ctx.state, "Heat", None).await;
    let slot = create_slot(&ctx.state, 1, movie_id, 3, Some(3)).await;

    let (a, b, c) = tokio::join!(
        SlotService::join_slot(&ctx.state, slot.slot_id, 2),
        SlotService::join_slot(&ctx.state, slot.slot_id, 3),
        SlotService::join_slot(&ctx.state, slot.slot_id, 4),
    );
    let results = [a, b, c];

    let joined = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::SlotFull(_))))
        .count();
    assert_eq!(joined, 2);
    assert_eq!(rejected, 1);

    let after = SlotService::get_slot(&ctx.state, slot.slot_id).await.unwrap();
    assert_eq!(after.participant_count, 3);
    assert_eq!(after.status, SlotStatus::Full);
    assert_eq!(room::Entity::find().count(&ctx.state.db).await.unwrap(), 1);
}

#[tokio::test]
async fn second_room_for_same_slot_should_be_rejected() {
    let ctx = setup().await;
    create_user(&ctx.state, 1, "Alice").await;
    let movie_id = create_movie(&ctx.state, "Heat", None).await;
    let filled = create_slot(&ctx.state, 1, movie_id, 1, None).await;

    let model = slot::Entity::find_by_id(filled.slot_id)
        .one(&ctx.state.db)
        .await
        .unwrap()
        .unwrap();
    let again = SlotService::open_room(&ctx.state.db, &model, 24, Utc::now().naive_utc()).await;

    assert!(matches!(again, Err(AppError::RoomAlreadyExists(_))));
    assert_eq!(room::Entity::find().count(&ctx.state.db).await.unwrap(), 1);
}

#[tokio::test]
async fn try_fill_should_transition_only_once_for_same_snapshot() {
    let ctx = setup().await;
    create_user(&ctx.state, 1, "Alice").await;
    create_user(&ctx.state, 2, "Bob").await;
    let movie_id = create_movie(&ctx.state, "Heat", None).await;
    let open = create_slot(&ctx.state, 1, movie_id, 2, None).await;

    // Second member inserted directly so the slot is still open at its minimum.
    slot_participant::ActiveModel {
        slot_id: Set(open.slot_id),
        user_id: Set(2),
        joined_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&ctx.state.db)
    .await
    .unwrap();

    let snapshot = slot::Entity::find_by_id(open.slot_id)
        .one(&ctx.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.status, SlotStatus::Open);

    let now = Utc::now().naive_utc();
    let first = SlotService::try_fill(&ctx.state.db, &snapshot, 24, now)
        .await
        .unwrap();
    let second = SlotService::try_fill(&ctx.state.db, &snapshot, 24, now)
        .await
        .unwrap();

    assert!(first.is_some());
    assert!(second.is_none());
    assert_eq!(room::Entity::find().count(&ctx.state.db).await.unwrap(), 1);
}

#[tokio::test]
async fn sweeper_should_drop_expired_conversations() {
    let mut ctx = setup().await;
    ctx.state.conversations = ConversationStore::new(Duration::from_millis(1));
    for user_id in 0..100 {
        ctx.state
            .conversations
            .set(user_id, ConversationState::AwaitingMovieReference);
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    CompletionSweeper::new(ctx.state.clone())
        .sweep_once()
        .await
        .unwrap();

    assert!(ctx.state.conversations.is_empty());
}
