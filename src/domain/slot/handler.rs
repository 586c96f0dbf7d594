use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use validator::Validate;

use super::dto::{
    CreateSlotRequest, DeleteSlotResponse, JoinSlotResponse, MySlotsResponse, NewSlot, SlotResponse,
    SlotSummary,
};
use super::schedule::parse_slot_datetime;
use super::service::SlotService;
use crate::state::AppState;
use crate::utils::auth::BotUser;
use crate::utils::error::AppError;
use crate::utils::BaseResponse;

/// Propose a viewing slot
///
/// The creator becomes the first participant.
#[utoipa::path(
    post,
    path = "/api/v1/slots",
    request_body = CreateSlotRequest,
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Slot created", body = SuccessSlotResponse),
        (status = 400, description = "Invalid time or participant counts", body = ErrorResponse),
        (status = 404, description = "User or movie not found", body = ErrorResponse)
    ),
    tag = "Slot"
)]
pub async fn create_slot(
    State(state): State<AppState>,
    user: BotUser,
    payload: Result<Json<CreateSlotRequest>, JsonRejection>,
) -> Result<Json<BaseResponse<SlotResponse>>, AppError> {
    let Json(req) = payload?;
    req.validate()?;

    let scheduled_at =
        parse_slot_datetime(&req.scheduled_at, state.config.schedule_utc_offset_hours)?;
    let new_slot = NewSlot {
        movie_id: req.movie_id,
        scheduled_at,
        min_participants: req.min_participants,
        max_participants: req.max_participants,
    };

    let result = SlotService::create_slot(&state, user.user_id(), new_slot).await?;

    Ok(Json(BaseResponse::success(result)))
}

#[utoipa::path(
    get,
    path = "/api/v1/slots",
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Open upcoming slots, soonest first", body = SuccessSlotListResponse)
    ),
    tag = "Slot"
)]
pub async fn list_open_slots(
    State(state): State<AppState>,
    _user: BotUser,
) -> Result<Json<BaseResponse<Vec<SlotSummary>>>, AppError> {
    let result = SlotService::list_open_slots(&state).await?;
    Ok(Json(BaseResponse::success(result)))
}

#[utoipa::path(
    get,
    path = "/api/v1/slots/mine",
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Slots created and joined by the acting user", body = SuccessMySlotsResponse)
    ),
    tag = "Slot"
)]
pub async fn list_my_slots(
    State(state): State<AppState>,
    user: BotUser,
) -> Result<Json<BaseResponse<MySlotsResponse>>, AppError> {
    let result = SlotService::list_my_slots(&state, user.user_id()).await?;
    Ok(Json(BaseResponse::success(result)))
}

#[utoipa::path(
    get,
    path = "/api/v1/slots/{slot_id}",
    params(("slot_id" = i32, Path, description = "Slot id")),
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Slot with participants and room", body = SuccessSlotResponse),
        (status = 404, description = "Slot not found", body = ErrorResponse)
    ),
    tag = "Slot"
)]
pub async fn get_slot(
    State(state): State<AppState>,
    _user: BotUser,
    Path(slot_id): Path<i32>,
) -> Result<Json<BaseResponse<SlotResponse>>, AppError> {
    let result = SlotService::get_slot(&state, slot_id).await?;
    Ok(Json(BaseResponse::success(result)))
}

/// Join a slot
///
/// Idempotent. Filling the minimum moves the slot to `full` and opens its room.
#[utoipa::path(
    post,
    path = "/api/v1/slots/{slot_id}/join",
    params(("slot_id" = i32, Path, description = "Slot id")),
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Joined", body = SuccessJoinSlotResponse),
        (status = 404, description = "Slot or user not found", body = ErrorResponse),
        (status = 409, description = "Slot full or completed", body = ErrorResponse)
    ),
    tag = "Slot"
)]
pub async fn join_slot(
    State(state): State<AppState>,
    user: BotUser,
    Path(slot_id): Path<i32>,
) -> Result<Json<BaseResponse<JoinSlotResponse>>, AppError> {
    let result = SlotService::join_slot(&state, slot_id, user.user_id()).await?;
    Ok(Json(BaseResponse::success(result)))
}

#[utoipa::path(
    post,
    path = "/api/v1/slots/{slot_id}/leave",
    params(("slot_id" = i32, Path, description = "Slot id")),
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Left the slot", body = SuccessSlotResponse),
        (status = 404, description = "Slot not found", body = ErrorResponse),
        (status = 409, description = "Creator, not a participant, or slot no longer open", body = ErrorResponse)
    ),
    tag = "Slot"
)]
pub async fn leave_slot(
    State(state): State<AppState>,
    user: BotUser,
    Path(slot_id): Path<i32>,
) -> Result<Json<BaseResponse<SlotResponse>>, AppError> {
    let result = SlotService::leave_slot(&state, slot_id, user.user_id()).await?;
    Ok(Json(BaseResponse::success(result)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/slots/{slot_id}",
    params(("slot_id" = i32, Path, description = "Slot id")),
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Slot deleted", body = SuccessDeleteSlotResponse),
        (status = 403, description = "Not the creator", body = ErrorResponse),
        (status = 404, description = "Slot not found", body = ErrorResponse)
    ),
    tag = "Slot"
)]
pub async fn delete_slot(
    State(state): State<AppState>,
    user: BotUser,
    Path(slot_id): Path<i32>,
) -> Result<Json<BaseResponse<DeleteSlotResponse>>, AppError> {
    let result = SlotService::delete_slot(&state, slot_id, user.user_id()).await?;
    Ok(Json(BaseResponse::success(result)))
}

#[utoipa::path(
    post,
    path = "/api/v1/slots/{slot_id}/complete",
    params(("slot_id" = i32, Path, description = "Slot id")),
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Slot completed", body = SuccessSlotResponse),
        (status = 403, description = "Not the creator", body = ErrorResponse),
        (status = 409, description = "Slot is not full", body = ErrorResponse)
    ),
    tag = "Slot"
)]
pub async fn complete_slot(
    State(state): State<AppState>,
    user: BotUser,
    Path(slot_id): Path<i32>,
) -> Result<Json<BaseResponse<SlotResponse>>, AppError> {
    let result = SlotService::complete_slot(&state, slot_id, user.user_id()).await?;
    Ok(Json(BaseResponse::success(result)))
}
