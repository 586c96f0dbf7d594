use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::entity::rating;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRatingRequest {
    pub rated_user_id: i64,
    /// 1..=5
    pub score: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatingItem {
    pub rating_id: i32,
    pub room_id: i32,
    pub rater_id: i64,
    pub rated_id: i64,
    pub score: i32,
    pub created_at: NaiveDateTime,
}

impl From<rating::Model> for RatingItem {
    fn from(model: rating::Model) -> Self {
        Self {
            rating_id: model.rating_id,
            room_id: model.room_id,
            rater_id: model.rater_id,
            rated_id: model.rated_id,
            score: model.score,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutstandingUser {
    pub user_id: i64,
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRatingResponse {
    pub rating: RatingItem,
    /// Rated user's average after this rating.
    pub rated_user_rating: f64,
    pub rated_user_total_ratings: i32,
    /// Next participant to prompt for, if any.
    pub next: Option<OutstandingUser>,
    pub outstanding: Vec<OutstandingUser>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutstandingRatingsResponse {
    pub room_id: i32,
    pub users: Vec<OutstandingUser>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessSubmitRatingResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: SubmitRatingResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessOutstandingRatingsResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: OutstandingRatingsResponse,
}
