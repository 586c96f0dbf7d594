use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use validator::Validate;

use super::dto::{
    CatalogAccountResponse, ImportVotesResponse, LinkCatalogAccountRequest, RegisterUserRequest,
    UserProfileResponse,
};
use super::service::UserService;
use crate::state::AppState;
use crate::utils::auth::BotUser;
use crate::utils::error::AppError;
use crate::utils::BaseResponse;

/// Register or update the acting user
#[utoipa::path(
    put,
    path = "/api/v1/users/me",
    request_body = RegisterUserRequest,
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "User registered", body = SuccessUserProfileResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Bot authentication failed", body = ErrorResponse)
    ),
    tag = "User"
)]
pub async fn register_user(
    State(state): State<AppState>,
    user: BotUser,
    payload: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> Result<Json<BaseResponse<UserProfileResponse>>, AppError> {
    let Json(req) = payload?;
    req.validate()?;

    let result = UserService::register(&state, user.user_id(), req).await?;

    Ok(Json(BaseResponse::success(result)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Profile", body = SuccessUserProfileResponse),
        (status = 404, description = "User not registered", body = ErrorResponse)
    ),
    tag = "User"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: BotUser,
) -> Result<Json<BaseResponse<UserProfileResponse>>, AppError> {
    let result = UserService::get_profile(&state, user.user_id()).await?;
    Ok(Json(BaseResponse::success(result)))
}

/// Link a movie catalog account
#[utoipa::path(
    put,
    path = "/api/v1/users/me/catalog-account",
    request_body = LinkCatalogAccountRequest,
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Account linked", body = SuccessCatalogAccountResponse),
        (status = 400, description = "Invalid account id", body = ErrorResponse),
        (status = 404, description = "User not registered", body = ErrorResponse)
    ),
    tag = "User"
)]
pub async fn link_catalog_account(
    State(state): State<AppState>,
    user: BotUser,
    payload: Result<Json<LinkCatalogAccountRequest>, JsonRejection>,
) -> Result<Json<BaseResponse<CatalogAccountResponse>>, AppError> {
    let Json(req) = payload?;
    req.validate()?;

    let result = UserService::link_catalog_account(&state, user.user_id(), req).await?;

    Ok(Json(BaseResponse::success(result)))
}

/// Import votes from the linked catalog account
#[utoipa::path(
    post,
    path = "/api/v1/users/me/catalog-votes/import",
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Votes imported", body = SuccessImportVotesResponse),
        (status = 404, description = "No linked account", body = ErrorResponse),
        (status = 502, description = "Catalog unavailable", body = ErrorResponse)
    ),
    tag = "User"
)]
pub async fn import_votes(
    State(state): State<AppState>,
    user: BotUser,
) -> Result<Json<BaseResponse<ImportVotesResponse>>, AppError> {
    let result = UserService::import_votes(&state, user.user_id()).await?;
    Ok(Json(BaseResponse::success(result)))
}
