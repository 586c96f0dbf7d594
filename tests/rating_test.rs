//! Rating aggregator against an in-memory database.

mod common;

use sea_orm::{EntityTrait, PaginatorTrait};

use common::{create_movie, create_slot, create_user, setup};
use cowatch_server::domain::rating::dto::SubmitRatingRequest;
use cowatch_server::domain::rating::entity::rating;
use cowatch_server::domain::rating::service::RatingService;
use cowatch_server::domain::slot::service::SlotService;
use cowatch_server::domain::user::entity::bot_user;
use cowatch_server::notification::DomainEvent;
use cowatch_server::utils::error::AppError;
use cowatch_server::AppState;

/// Full slot with the given members; returns the room id.
async fn room_with(state: &AppState, members: &[i64]) -> i32 {
    let movie_id = create_movie(state, "Heat", None).await;
    let slot = create_slot(state, members[0], movie_id, members.len() as i32, None).await;
    let mut last = None;
    for user_id in &members[1..] {
        last = Some(SlotService::join_slot(state, slot.slot_id, *user_id).await.unwrap());
    }
    let slot = match last {
        Some(joined) => joined.slot,
        None => slot,
    };
    slot.room.expect("slot should be full").room_id
}

async fn users(state: &AppState, ids: &[i64]) {
    for id in ids {
        create_user(state, *id, &format!("user-{}", id)).await;
    }
}

fn req(rated_user_id: i64, score: i32) -> SubmitRatingRequest {
    SubmitRatingRequest {
        rated_user_id,
        score,
    }
}

async fn stored(state: &AppState, user_id: i64) -> (f64, i32) {
    let user = bot_user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await
        .unwrap()
        .unwrap();
    (user.rating, user.total_ratings)
}

#[tokio::test]
async fn first_rating_should_set_average_and_count() {
    // Arrange
    let ctx = setup().await;
    users(&ctx.state, &[1, 2]).await;
    let room_id = room_with(&ctx.state, &[1, 2]).await;

    // Act
    let result = RatingService::submit_rating(&ctx.state, room_id, 1, req(2, 4))
        .await
        .unwrap();

    // Assert
    assert_eq!(result.rated_user_rating, 4.0);
    assert_eq!(result.rated_user_total_ratings, 1);
    assert!(result.next.is_none());
    assert_eq!(stored(&ctx.state, 2).await, (4.0, 1));
}

#[tokio::test]
async fn average_should_be_recomputed_across_rooms() {
    let ctx = setup().await;
    users(&ctx.state, &[1, 2, 3, 4]).await;
    let first = room_with(&ctx.state, &[1, 4]).await;
    let second = room_with(&ctx.state, &[2, 4]).await;
    let third = room_with(&ctx.state, &[3, 4]).await;

    RatingService::submit_rating(&ctx.state, first, 1, req(4, 5)).await.unwrap();
    RatingService::submit_rating(&ctx.state, second, 2, req(4, 3)).await.unwrap();
    let last = RatingService::submit_rating(&ctx.state, third, 3, req(4, 4))
        .await
        .unwrap();

    assert_eq!(last.rated_user_rating, 4.0);
    assert_eq!(stored(&ctx.state, 4).await, (4.0, 3));
}

#[tokio::test]
async fn duplicate_rating_should_fail_without_changing_average() {
    let ctx = setup().await;
    users(&ctx.state, &[1, 2]).await;
    let room_id = room_with(&ctx.state, &[1, 2]).await;
    RatingService::submit_rating(&ctx.state, room_id, 1, req(2, 4))
        .await
        .unwrap();

    let again = RatingService::submit_rating(&ctx.state, room_id, 1, req(2, 1)).await;

    assert!(matches!(again, Err(AppError::AlreadyRated(_))));
    assert_eq!(stored(&ctx.state, 2).await, (4.0, 1));
    assert_eq!(rating::Entity::find().count(&ctx.state.db).await.unwrap(), 1);
}

#[tokio::test]
async fn self_rating_should_fail_even_with_valid_score() {
    let ctx = setup().await;
    users(&ctx.state, &[1, 2]).await;
    let room_id = room_with(&ctx.state, &[1, 2]).await;

    let result = RatingService::submit_rating(&ctx.state, room_id, 1, req(1, 5)).await;

    assert!(matches!(result, Err(AppError::SelfRating(_))));
    assert_eq!(stored(&ctx.state, 1).await, (0.0, 0));
}

#[tokio::test]
async fn out_of_range_score_should_fail() {
    let ctx = setup().await;
    users(&ctx.state, &[1, 2]).await;
    let room_id = room_with(&ctx.state, &[1, 2]).await;

    for score in [0, 6] {
        let result = RatingService::submit_rating(&ctx.state, room_id, 1, req(2, score)).await;
        assert!(matches!(result, Err(AppError::InvalidScore(_))));
    }
}

#[tokio::test]
async fn non_participants_should_be_rejected() {
    let ctx = setup().await;
    users(&ctx.state, &[1, 2, 3]).await;
    let room_id = room_with(&ctx.state, &[1, 2]).await;

    let outsider_rates = RatingService::submit_rating(&ctx.state, room_id, 3, req(2, 4)).await;
    assert!(matches!(outsider_rates, Err(AppError::NotRoomParticipant(_))));

    let outsider_rated = RatingService::submit_rating(&ctx.state, room_id, 1, req(3, 4)).await;
    assert!(matches!(outsider_rated, Err(AppError::NotRoomParticipant(_))));

    let missing_room = RatingService::submit_rating(&ctx.state, 999, 1, req(2, 4)).await;
    assert!(matches!(missing_room, Err(AppError::RoomNotFound(_))));
}

#[tokio::test]
async fn outstanding_should_follow_join_order_and_shrink() {
    let ctx = setup().await;
    users(&ctx.state, &[1, 2, 3]).await;
    let room_id = room_with(&ctx.state, &[1, 2, 3]).await;

    let before = RatingService::outstanding_ratings(&ctx.state, room_id, 1)
        .await
        .unwrap();
    let ids: Vec<i64> = before.users.iter().map(|u| u.user_id).collect();
    assert_eq!(ids, vec![2, 3]);

    let first = RatingService::submit_rating(&ctx.state, room_id, 1, req(2, 5))
        .await
        .unwrap();
    assert_eq!(first.next.map(|u| u.user_id), Some(3));

    let second = RatingService::submit_rating(&ctx.state, room_id, 1, req(3, 2))
        .await
        .unwrap();
    assert!(second.next.is_none());
    assert!(second.outstanding.is_empty());

    // Each rater keeps their own list.
    let others = RatingService::outstanding_ratings(&ctx.state, room_id, 2)
        .await
        .unwrap();
    let ids: Vec<i64> = others.users.iter().map(|u| u.user_id).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test]
async fn should_emit_no_more_users_when_rater_is_done() {
    let ctx = setup().await;
    users(&ctx.state, &[1, 2]).await;
    let room_id = room_with(&ctx.state, &[1, 2]).await;

    RatingService::submit_rating(&ctx.state, room_id, 1, req(2, 3))
        .await
        .unwrap();

    let events = ctx.sink.events();
    assert!(events.contains(&DomainEvent::RatingRecorded {
        room_id,
        rater_id: 1,
        rated_id: 2,
        score: 3,
    }));
    assert!(events.contains(&DomainEvent::NoMoreUsersToRate {
        room_id,
        rater_id: 1,
    }));
}
