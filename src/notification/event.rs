use chrono::NaiveDateTime;
use serde::Serialize;

/// Events emitted by the slot lifecycle and the rating aggregator.
///
/// Each carries everything a renderer needs without further queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainEvent {
    #[serde(rename_all = "camelCase")]
    RoomCreated {
        slot_id: i32,
        room_id: i32,
        movie_title: String,
        /// UTC.
        scheduled_at: NaiveDateTime,
        participant_ids: Vec<i64>,
        watch_url: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    RatingRecorded {
        room_id: i32,
        rater_id: i64,
        rated_id: i64,
        score: i32,
    },
    #[serde(rename_all = "camelCase")]
    NoMoreUsersToRate { room_id: i32, rater_id: i64 },
    #[serde(rename_all = "camelCase")]
    SlotCompleted { slot_id: i32, room_id: Option<i32> },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::RoomCreated { .. } => "room_created",
            DomainEvent::RatingRecorded { .. } => "rating_recorded",
            DomainEvent::NoMoreUsersToRate { .. } => "no_more_users_to_rate",
            DomainEvent::SlotCompleted { .. } => "slot_completed",
        }
    }
}
