//! Candidate filtering, auto-join and ranking against an in-memory database.

mod common;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};

use common::{
    create_movie, create_movie_with, create_slot, create_user, set_peer_rating, setup,
};
use cowatch_server::domain::matching::service::MatchingService;
use cowatch_server::domain::movie::entity::movie::MovieKind;
use cowatch_server::domain::slot::entity::slot::SlotStatus;
use cowatch_server::domain::slot::service::SlotService;
use cowatch_server::domain::user::entity::user_vote;
use cowatch_server::utils::error::AppError;
use cowatch_server::AppState;

async fn add_vote(
    state: &AppState,
    user_id: i64,
    catalog_id: &str,
    score: i32,
    kind: MovieKind,
    year: i32,
) {
    let now = Utc::now().naive_utc();
    user_vote::ActiveModel {
        user_id: Set(user_id),
        catalog_id: Set(catalog_id.to_string()),
        title: Set(None),
        year: Set(Some(year)),
        kind: Set(Some(kind)),
        score: Set(score),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .unwrap();
}

#[tokio::test]
async fn unrated_user_should_never_be_auto_joined() {
    // Arrange: slot one short of its minimum, nobody rated yet
    let ctx = setup().await;
    create_user(&ctx.state, 1, "Alice").await;
    create_user(&ctx.state, 3, "Carol").await;
    let movie_id = create_movie(&ctx.state, "Heat", Some("409")).await;
    let slot = create_slot(&ctx.state, 1, movie_id, 2, None).await;

    // Act
    let result = MatchingService::express_interest(&ctx.state, movie_id, 3)
        .await
        .unwrap();

    // Assert
    assert!(!result.auto_joined);
    assert!(result.joined.is_none());
    let ids: Vec<i32> = result.candidates.iter().map(|c| c.slot.slot_id).collect();
    assert_eq!(ids, vec![slot.slot_id]);
    assert_eq!(result.candidates[0].rating_gap, None);

    let unchanged = SlotService::get_slot(&ctx.state, slot.slot_id).await.unwrap();
    assert_eq!(unchanged.participant_ids(), vec![1]);
}

#[tokio::test]
async fn rated_user_should_auto_join_slot_it_would_fill() {
    let ctx = setup().await;
    create_user(&ctx.state, 1, "Alice").await;
    create_user(&ctx.state, 2, "Bob").await;
    set_peer_rating(&ctx.state, 1, 4.0, 1).await;
    set_peer_rating(&ctx.state, 2, 3.4, 2).await;
    let movie_id = create_movie(&ctx.state, "Heat", Some("409")).await;
    let slot = create_slot(&ctx.state, 1, movie_id, 2, None).await;

    let result = MatchingService::express_interest(&ctx.state, movie_id, 2)
        .await
        .unwrap();

    assert!(result.auto_joined);
    let joined = result.joined.expect("joined slot");
    assert_eq!(joined.slot.slot_id, slot.slot_id);
    assert!(joined.filled);
    assert_eq!(joined.slot.status, SlotStatus::Full);
    assert!(result.candidates.is_empty());
}

#[tokio::test]
async fn rated_user_should_not_auto_join_distant_slot_that_is_not_one_short() {
    let ctx = setup().await;
    create_user(&ctx.state, 1, "Alice").await;
    create_user(&ctx.state, 2, "Bob").await;
    set_peer_rating(&ctx.state, 1, 4.0, 1).await;
    set_peer_rating(&ctx.state, 2, 3.2, 1).await;
    let movie_id = create_movie(&ctx.state, "Heat", None).await;
    create_slot(&ctx.state, 1, movie_id, 4, None).await;

    let result = MatchingService::express_interest(&ctx.state, movie_id, 2)
        .await
        .unwrap();

    // Gap 0.8: inside the filter, outside the auto-join tolerance.
    assert!(!result.auto_joined);
    assert_eq!(result.candidates.len(), 1);
}

#[tokio::test]
async fn compatible_slots_should_filter_and_sort_by_rating_gap() {
    // Arrange
    let ctx = setup().await;
    for (id, name) in [(1, "Close"), (2, "Far"), (3, "Unrated"), (4, "Seeker"), (5, "Own")] {
        create_user(&ctx.state, id, name).await;
    }
    set_peer_rating(&ctx.state, 1, 3.5, 2).await;
    set_peer_rating(&ctx.state, 2, 5.0, 2).await;
    set_peer_rating(&ctx.state, 4, 3.0, 1).await;

    let movie_id = create_movie(&ctx.state, "Heat", Some("409")).await;
    // Same catalog title stored twice
    let duplicate_id = create_movie(&ctx.state, "Heat (1995)", Some("409")).await;
    let other_id = create_movie(&ctx.state, "Ronin", Some("500")).await;

    let close = create_slot(&ctx.state, 1, duplicate_id, 3, None).await;
    let far = create_slot(&ctx.state, 2, movie_id, 3, None).await;
    let unrated = create_slot(&ctx.state, 3, movie_id, 3, None).await;
    let own = create_slot(&ctx.state, 4, movie_id, 3, None).await;
    let capped = create_slot(&ctx.state, 5, movie_id, 1, Some(1)).await;
    create_slot(&ctx.state, 1, other_id, 3, None).await;

    // Act
    let default = MatchingService::compatible_slots(&ctx.state, movie_id, 4, None)
        .await
        .unwrap();
    let wide = MatchingService::compatible_slots(&ctx.state, movie_id, 4, Some(2.5))
        .await
        .unwrap();

    // Assert
    let ids: Vec<i32> = default.iter().map(|c| c.slot.slot_id).collect();
    assert_eq!(ids, vec![unrated.slot_id, close.slot_id]);
    assert_eq!(default[1].rating_gap, Some(0.5));

    let ids: Vec<i32> = wide.iter().map(|c| c.slot.slot_id).collect();
    assert_eq!(ids, vec![unrated.slot_id, close.slot_id, far.slot_id]);
    assert!(!ids.contains(&own.slot_id));
    assert!(!ids.contains(&capped.slot_id));
}

#[tokio::test]
async fn compatible_slots_should_reject_negative_tolerance() {
    let ctx = setup().await;
    create_user(&ctx.state, 1, "Alice").await;
    let movie_id = create_movie(&ctx.state, "Heat", None).await;

    let result = MatchingService::compatible_slots(&ctx.state, movie_id, 1, Some(-1.0)).await;

    assert!(matches!(result, Err(AppError::ValidationError(_))));
}

#[tokio::test]
async fn recommendations_should_skip_consumed_titles_and_rank_by_taste() {
    let ctx = setup().await;
    create_user(&ctx.state, 1, "Viewer").await;
    create_user(&ctx.state, 2, "Host").await;
    for (catalog_id, year) in [("100", 2000), ("101", 2002), ("102", 2004)] {
        add_vote(&ctx.state, 1, catalog_id, 8, MovieKind::Movie, year).await;
    }

    let seen = create_movie_with(&ctx.state, "Seen", Some("100"), MovieKind::Movie, Some(2000)).await;
    let film =
        create_movie_with(&ctx.state, "Film", Some("200"), MovieKind::Movie, Some(2003)).await;
    let show =
        create_movie_with(&ctx.state, "Show", Some("300"), MovieKind::Series, Some(2003)).await;

    create_slot(&ctx.state, 2, seen, 3, None).await;
    let show_slot = create_slot(&ctx.state, 2, show, 3, None).await;
    let film_slot = create_slot(&ctx.state, 2, film, 3, None).await;
    create_slot(&ctx.state, 1, film, 3, None).await; // own slot

    let ranked = MatchingService::recommendations(&ctx.state, 1).await.unwrap();

    let ids: Vec<i32> = ranked.iter().map(|r| r.slot.slot_id).collect();
    assert_eq!(ids, vec![film_slot.slot_id, show_slot.slot_id]);
    assert!(ranked[0].interest > ranked[1].interest);
}

#[tokio::test]
async fn similarity_should_combine_votes_and_peer_ratings() {
    let ctx = setup().await;
    for (id, name) in [(1, "A"), (2, "B"), (3, "C")] {
        create_user(&ctx.state, id, name).await;
    }
    add_vote(&ctx.state, 1, "100", 8, MovieKind::Movie, 2000).await;
    add_vote(&ctx.state, 2, "100", 8, MovieKind::Movie, 2000).await;
    add_vote(&ctx.state, 3, "999", 8, MovieKind::Movie, 2000).await;

    let twins = MatchingService::user_similarity(&ctx.state, 1, 2).await.unwrap();
    assert_eq!(twins.shared_titles, 1);
    assert!((twins.score - 1.0).abs() < 1e-9);

    let strangers = MatchingService::user_similarity(&ctx.state, 1, 3).await.unwrap();
    assert_eq!(strangers.shared_titles, 0);
    assert_eq!(strangers.preference_similarity, 0.0);
    assert!((strangers.score - 0.3).abs() < 1e-9);

    let missing = MatchingService::user_similarity(&ctx.state, 1, 42).await;
    assert!(matches!(missing, Err(AppError::UserNotFound(_))));
}
