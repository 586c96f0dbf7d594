use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::slot::dto::{JoinSlotResponse, SlotSummary};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct CompatibleSlotsQuery {
    /// Allowed gap between peer ratings (default 1.0).
    pub tolerance: Option<f64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompatibleSlot {
    pub slot: SlotSummary,
    /// `None` when no participant has been rated yet.
    pub rating_gap: Option<f64>,
    pub compatibility: f64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterestResponse {
    pub auto_joined: bool,
    pub joined: Option<JoinSlotResponse>,
    /// The filtered list, shown when no auto-join happened.
    pub candidates: Vec<CompatibleSlot>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedSlot {
    pub slot: SlotSummary,
    pub interest: f64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityResponse {
    pub user_id: i64,
    pub other_user_id: i64,
    pub shared_titles: usize,
    pub preference_similarity: f64,
    pub peer_rating_closeness: f64,
    pub score: f64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessCompatibleSlotsResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: Vec<CompatibleSlot>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessInterestResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: InterestResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessRecommendationsResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: Vec<RecommendedSlot>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessSimilarityResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: SimilarityResponse,
}
