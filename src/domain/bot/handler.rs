use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use validator::Validate;

use super::conversation::ConversationState;
use super::dto::{BotOutcome, CallbackRequest, ConversationResponse, MessageRequest};
use super::service::BotService;
use crate::state::AppState;
use crate::utils::auth::BotUser;
use crate::utils::error::AppError;
use crate::utils::BaseResponse;

/// Handle a button press
///
/// Payloads look like `join_slot:12` or `rate_user:5:4242:4`.
#[utoipa::path(
    post,
    path = "/api/v1/bot/callbacks",
    request_body = CallbackRequest,
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Action performed", body = SuccessBotOutcomeResponse),
        (status = 400, description = "Malformed payload or invalid input", body = ErrorResponse),
        (status = 403, description = "Action not allowed for this user", body = ErrorResponse),
        (status = 404, description = "Target not found", body = ErrorResponse),
        (status = 409, description = "Conflicting state", body = ErrorResponse)
    ),
    tag = "Bot"
)]
pub async fn handle_callback(
    State(state): State<AppState>,
    user: BotUser,
    payload: Result<Json<CallbackRequest>, JsonRejection>,
) -> Result<Json<BaseResponse<BotOutcome>>, AppError> {
    let Json(req) = payload?;
    req.validate()?;

    let result = BotService::handle_callback(&state, user.user_id(), &req.payload).await?;
    Ok(Json(BaseResponse::success(result)))
}

/// Feed free text to the current conversation
#[utoipa::path(
    post,
    path = "/api/v1/bot/messages",
    request_body = MessageRequest,
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Conversation step completed", body = SuccessBotOutcomeResponse),
        (status = 400, description = "No conversation, or the text was invalid (state kept)", body = ErrorResponse)
    ),
    tag = "Bot"
)]
pub async fn handle_message(
    State(state): State<AppState>,
    user: BotUser,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> Result<Json<BaseResponse<BotOutcome>>, AppError> {
    let Json(req) = payload?;
    req.validate()?;

    let result = BotService::handle_message(&state, user.user_id(), &req.text).await?;
    Ok(Json(BaseResponse::success(result)))
}

#[utoipa::path(
    post,
    path = "/api/v1/bot/conversations",
    request_body = ConversationState,
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Conversation started", body = SuccessConversationResponse),
        (status = 404, description = "User or movie not found", body = ErrorResponse)
    ),
    tag = "Bot"
)]
pub async fn set_conversation(
    State(state): State<AppState>,
    user: BotUser,
    payload: Result<Json<ConversationState>, JsonRejection>,
) -> Result<Json<BaseResponse<ConversationResponse>>, AppError> {
    let Json(conversation) = payload?;

    let result = BotService::set_conversation(&state, user.user_id(), conversation).await?;
    Ok(Json(BaseResponse::success(result)))
}

#[utoipa::path(
    get,
    path = "/api/v1/bot/conversations",
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Current conversation, if any", body = SuccessConversationResponse)
    ),
    tag = "Bot"
)]
pub async fn get_conversation(
    State(state): State<AppState>,
    user: BotUser,
) -> Result<Json<BaseResponse<ConversationResponse>>, AppError> {
    Ok(Json(BaseResponse::success(BotService::get_conversation(
        &state,
        user.user_id(),
    ))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/bot/conversations",
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Conversation cleared; returns the cleared state", body = SuccessConversationResponse)
    ),
    tag = "Bot"
)]
pub async fn clear_conversation(
    State(state): State<AppState>,
    user: BotUser,
) -> Result<Json<BaseResponse<ConversationResponse>>, AppError> {
    let result = BotService::clear_conversation(&state, user.user_id());
    Ok(Json(BaseResponse::success_with_message(
        result,
        "Conversation cleared.",
    )))
}
