use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::dto::{
    CompatibleSlot, CompatibleSlotsQuery, InterestResponse, RecommendedSlot, SimilarityResponse,
};
use super::service::MatchingService;
use crate::state::AppState;
use crate::utils::auth::BotUser;
use crate::utils::error::AppError;
use crate::utils::BaseResponse;

/// Open slots for a movie, filtered by peer-rating gap
#[utoipa::path(
    get,
    path = "/api/v1/matching/movies/{movie_id}/compatible-slots",
    params(
        ("movie_id" = i32, Path, description = "Movie id"),
        CompatibleSlotsQuery
    ),
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Compatible slots, closest rating first", body = SuccessCompatibleSlotsResponse),
        (status = 400, description = "Invalid tolerance", body = ErrorResponse),
        (status = 404, description = "User or movie not found", body = ErrorResponse)
    ),
    tag = "Matching"
)]
pub async fn compatible_slots(
    State(state): State<AppState>,
    user: BotUser,
    Path(movie_id): Path<i32>,
    Query(query): Query<CompatibleSlotsQuery>,
) -> Result<Json<BaseResponse<Vec<CompatibleSlot>>>, AppError> {
    let result =
        MatchingService::compatible_slots(&state, movie_id, user.user_id(), query.tolerance)
            .await?;
    Ok(Json(BaseResponse::success(result)))
}

/// "I want to watch this"
///
/// Joins the best matching slot when the user qualifies, otherwise returns
/// the candidates to pick from.
#[utoipa::path(
    post,
    path = "/api/v1/movies/{movie_id}/interest",
    params(("movie_id" = i32, Path, description = "Movie id")),
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Auto-joined or candidate list", body = SuccessInterestResponse),
        (status = 404, description = "User or movie not found", body = ErrorResponse)
    ),
    tag = "Matching"
)]
pub async fn express_interest(
    State(state): State<AppState>,
    user: BotUser,
    Path(movie_id): Path<i32>,
) -> Result<Json<BaseResponse<InterestResponse>>, AppError> {
    let result = MatchingService::express_interest(&state, movie_id, user.user_id()).await?;

    let message = if result.auto_joined {
        "Joined a matching slot."
    } else {
        "OK"
    };
    Ok(Json(BaseResponse::success_with_message(result, message)))
}

#[utoipa::path(
    get,
    path = "/api/v1/matching/recommendations",
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Open slots ranked by taste", body = SuccessRecommendationsResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Matching"
)]
pub async fn recommendations(
    State(state): State<AppState>,
    user: BotUser,
) -> Result<Json<BaseResponse<Vec<RecommendedSlot>>>, AppError> {
    let result = MatchingService::recommendations(&state, user.user_id()).await?;
    Ok(Json(BaseResponse::success(result)))
}

#[utoipa::path(
    get,
    path = "/api/v1/matching/similarity/{other_user_id}",
    params(("other_user_id" = i64, Path, description = "Chat user id to compare with")),
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Similarity breakdown", body = SuccessSimilarityResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Matching"
)]
pub async fn similarity(
    State(state): State<AppState>,
    user: BotUser,
    Path(other_user_id): Path<i64>,
) -> Result<Json<BaseResponse<SimilarityResponse>>, AppError> {
    let result = MatchingService::user_similarity(&state, user.user_id(), other_user_id).await?;
    Ok(Json(BaseResponse::success(result)))
}
