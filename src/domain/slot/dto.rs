use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::entity::room::{self, RoomStatus};
use super::entity::slot::SlotStatus;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSlotRequest {
    pub movie_id: i32,
    /// RFC 3339, or `DD.MM.YYYY HH:MM[:SS]` in the configured offset.
    #[validate(length(min = 1, max = 64, message = "Slot time is required."))]
    pub scheduled_at: String,
    pub min_participants: Option<i32>,
    pub max_participants: Option<i32>,
}

/// Validated slot parameters; `scheduled_at` is UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSlot {
    pub movie_id: i32,
    pub scheduled_at: NaiveDateTime,
    pub min_participants: Option<i32>,
    pub max_participants: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantItem {
    pub user_id: i64,
    pub display_name: Option<String>,
    pub joined_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomResponse {
    pub room_id: i32,
    pub status: RoomStatus,
    pub watch_url: Option<String>,
    pub discussion_end_time: NaiveDateTime,
}

impl From<room::Model> for RoomResponse {
    fn from(r: room::Model) -> Self {
        Self {
            room_id: r.room_id,
            status: r.status,
            watch_url: r.watch_url,
            discussion_end_time: r.discussion_end_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotResponse {
    pub slot_id: i32,
    pub movie_id: i32,
    pub movie_title: String,
    pub creator_id: i64,
    /// UTC.
    pub scheduled_at: NaiveDateTime,
    pub min_participants: i32,
    pub max_participants: Option<i32>,
    pub status: SlotStatus,
    pub participant_count: usize,
    /// Join order.
    pub participants: Vec<ParticipantItem>,
    pub room: Option<RoomResponse>,
}

impl SlotResponse {
    pub fn participant_ids(&self) -> Vec<i64> {
        self.participants.iter().map(|p| p.user_id).collect()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotSummary {
    pub slot_id: i32,
    pub movie_id: i32,
    pub movie_title: String,
    pub scheduled_at: NaiveDateTime,
    pub status: SlotStatus,
    pub participant_count: u64,
    pub min_participants: i32,
    pub max_participants: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinSlotResponse {
    /// True when the user was already a participant (nothing changed).
    pub already_participant: bool,
    /// True when this join moved the slot to `full`.
    pub filled: bool,
    pub slot: SlotResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MySlotsResponse {
    pub created: Vec<SlotSummary>,
    pub joined: Vec<SlotSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSlotResponse {
    pub slot_id: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessSlotResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: SlotResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessJoinSlotResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: JoinSlotResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessSlotListResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: Vec<SlotSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessMySlotsResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: MySlotsResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessDeleteSlotResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: DeleteSlotResponse,
}
