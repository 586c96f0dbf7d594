use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use validator::Validate;

use super::dto::{MovieResponse, ResolveMovieRequest};
use super::service::MovieService;
use crate::state::AppState;
use crate::utils::auth::BotUser;
use crate::utils::error::AppError;
use crate::utils::BaseResponse;

/// Resolve a movie link or catalog id
///
/// Returns the stored movie, creating it from the catalog on first reference.
#[utoipa::path(
    post,
    path = "/api/v1/movies/resolve",
    request_body = ResolveMovieRequest,
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Movie resolved", body = SuccessMovieResponse),
        (status = 400, description = "Unsupported reference", body = ErrorResponse),
        (status = 404, description = "Catalog has no such title", body = ErrorResponse),
        (status = 502, description = "Catalog unavailable", body = ErrorResponse)
    ),
    tag = "Movie"
)]
pub async fn resolve_movie(
    State(state): State<AppState>,
    _user: BotUser,
    payload: Result<Json<ResolveMovieRequest>, JsonRejection>,
) -> Result<Json<BaseResponse<MovieResponse>>, AppError> {
    let Json(req) = payload?;
    req.validate()?;

    let result = MovieService::resolve_reference(&state, &req.reference).await?;

    Ok(Json(BaseResponse::success(result)))
}

#[utoipa::path(
    get,
    path = "/api/v1/movies/{movie_id}",
    params(("movie_id" = i32, Path, description = "Movie id")),
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Movie", body = SuccessMovieResponse),
        (status = 404, description = "Movie not found", body = ErrorResponse)
    ),
    tag = "Movie"
)]
pub async fn get_movie(
    State(state): State<AppState>,
    _user: BotUser,
    Path(movie_id): Path<i32>,
) -> Result<Json<BaseResponse<MovieResponse>>, AppError> {
    let result = MovieService::get_movie(&state, movie_id).await?;
    Ok(Json(BaseResponse::success(result)))
}

/// Refresh movie metadata from the catalog
#[utoipa::path(
    post,
    path = "/api/v1/movies/{movie_id}/refresh",
    params(("movie_id" = i32, Path, description = "Movie id")),
    security(("bot_secret" = []), ("bot_user" = [])),
    responses(
        (status = 200, description = "Metadata refreshed", body = SuccessMovieResponse),
        (status = 404, description = "Movie not found", body = ErrorResponse),
        (status = 502, description = "Catalog unavailable", body = ErrorResponse)
    ),
    tag = "Movie"
)]
pub async fn refresh_movie(
    State(state): State<AppState>,
    _user: BotUser,
    Path(movie_id): Path<i32>,
) -> Result<Json<BaseResponse<MovieResponse>>, AppError> {
    let result = MovieService::refresh_metadata(&state, movie_id).await?;
    Ok(Json(BaseResponse::success(result)))
}
