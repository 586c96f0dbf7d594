use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use super::dto::{OutstandingRatingsResponse, SubmitRatingRequest, SubmitRatingResponse};
use super::service::RatingService;
use crate::state::AppState;
use crate::utils::auth::BotUser;
use crate::utils::error::AppError;
use crate::utils::BaseResponse;

/// Rate another participant of the room
///
/// Ratings are final. The response names the next participant to rate.
#[utoipa::path(
    post,
    path = "/api/v1/rooms/{room_id}/ratings",
    params(("room_id" = i32, Path, description = "Room id")),
    request_body = SubmitRatingRequest,
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Rating recorded", body = SuccessSubmitRatingResponse),
        (status = 400, description = "Score out of range or self-rating", body = ErrorResponse),
        (status = 403, description = "Rater or rated user is not in the room", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
        (status = 409, description = "Already rated", body = ErrorResponse)
    ),
    tag = "Rating"
)]
pub async fn submit_rating(
    State(state): State<AppState>,
    user: BotUser,
    Path(room_id): Path<i32>,
    payload: Result<Json<SubmitRatingRequest>, JsonRejection>,
) -> Result<Json<BaseResponse<SubmitRatingResponse>>, AppError> {
    let Json(req) = payload?;

    let result = RatingService::submit_rating(&state, room_id, user.user_id(), req).await?;
    Ok(Json(BaseResponse::success(result)))
}

#[utoipa::path(
    get,
    path = "/api/v1/rooms/{room_id}/ratings/outstanding",
    params(("room_id" = i32, Path, description = "Room id")),
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Participants not yet rated, in join order", body = SuccessOutstandingRatingsResponse),
        (status = 403, description = "Not a participant of the room", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse)
    ),
    tag = "Rating"
)]
pub async fn outstanding_ratings(
    State(state): State<AppState>,
    user: BotUser,
    Path(room_id): Path<i32>,
) -> Result<Json<BaseResponse<OutstandingRatingsResponse>>, AppError> {
    let result = RatingService::outstanding_ratings(&state, room_id, user.user_id()).await?;
    Ok(Json(BaseResponse::success(result)))
}
