use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::conversation::ConversationState;
use crate::domain::matching::dto::InterestResponse;
use crate::domain::movie::dto::MovieResponse;
use crate::domain::rating::dto::SubmitRatingResponse;
use crate::domain::slot::dto::{DeleteSlotResponse, JoinSlotResponse, SlotResponse};
use crate::domain::user::dto::CatalogAccountResponse;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallbackRequest {
    /// Button payload, e.g. `join_slot:12`.
    #[validate(length(min = 1, max = 64, message = "Callback payload must be 1-64 characters."))]
    pub payload: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    #[validate(length(min = 1, max = 1000, message = "Message must be 1-1000 characters."))]
    pub text: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub user_id: i64,
    pub state: Option<ConversationState>,
}

/// What a callback or message ended up doing.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "outcome", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BotOutcome {
    SlotCreated(SlotResponse),
    SlotJoined(JoinSlotResponse),
    SlotLeft(SlotResponse),
    SlotDeleted(DeleteSlotResponse),
    SlotCompleted(SlotResponse),
    RatingRecorded(SubmitRatingResponse),
    MovieInterest(MovieInterestOutcome),
    CatalogAccountLinked(CatalogAccountResponse),
    /// The bot now waits for free text from the user.
    AwaitingInput(ConversationState),
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovieInterestOutcome {
    pub movie: MovieResponse,
    pub interest: InterestResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessBotOutcomeResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: BotOutcome,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessConversationResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: ConversationResponse,
}
