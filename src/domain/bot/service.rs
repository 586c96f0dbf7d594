use tracing::{debug, info};

use super::command::CallbackAction;
use super::conversation::ConversationState;
use super::dto::{BotOutcome, ConversationResponse, MovieInterestOutcome};
use crate::domain::matching::service::MatchingService;
use crate::domain::movie::service::MovieService;
use crate::domain::rating::dto::SubmitRatingRequest;
use crate::domain::rating::service::RatingService;
use crate::domain::slot::dto::NewSlot;
use crate::domain::slot::schedule::parse_slot_datetime;
use crate::domain::slot::service::SlotService;
use crate::domain::user::dto::LinkCatalogAccountRequest;
use crate::domain::user::service::UserService;
use crate::state::AppState;
use crate::utils::error::AppError;

pub struct BotService;

impl BotService {
    /// Runs a button press against the domain services.
    pub async fn handle_callback(
        state: &AppState,
        user_id: i64,
        payload: &str,
    ) -> Result<BotOutcome, AppError> {
        let action: CallbackAction = payload.parse()?;
        debug!(user_id = user_id, action = %action, "Callback received");

        let outcome = match action {
            CallbackAction::JoinSlot { slot_id } => {
                BotOutcome::SlotJoined(SlotService::join_slot(state, slot_id, user_id).await?)
            }
            CallbackAction::LeaveSlot { slot_id } => {
                BotOutcome::SlotLeft(SlotService::leave_slot(state, slot_id, user_id).await?)
            }
            CallbackAction::DeleteSlot { slot_id } => {
                BotOutcome::SlotDeleted(SlotService::delete_slot(state, slot_id, user_id).await?)
            }
            CallbackAction::CompleteSlot { slot_id } => BotOutcome::SlotCompleted(
                SlotService::complete_slot(state, slot_id, user_id).await?,
            ),
            CallbackAction::CreateSlot { movie_id } => BotOutcome::AwaitingInput(
                Self::start_conversation(
                    state,
                    user_id,
                    ConversationState::AwaitingSlotDatetime { movie_id },
                )
                .await?,
            ),
            CallbackAction::RateUser {
                room_id,
                user_id: rated_user_id,
                score,
            } => {
                let req = SubmitRatingRequest {
                    rated_user_id,
                    score,
                };
                BotOutcome::RatingRecorded(
                    RatingService::submit_rating(state, room_id, user_id, req).await?,
                )
            }
        };

        Ok(outcome)
    }

    /// Feeds free text to whatever the user's conversation is waiting for.
    ///
    /// The state is cleared only when the operation succeeds, so a bad
    /// datetime or link can simply be sent again.
    pub async fn handle_message(
        state: &AppState,
        user_id: i64,
        text: &str,
    ) -> Result<BotOutcome, AppError> {
        let Some(conversation) = state.conversations.get(user_id) else {
            return Err(AppError::BadRequest(
                "Nothing is waiting for input. Start with a command.".to_string(),
            ));
        };
        let text = text.trim();

        let outcome = match conversation {
            ConversationState::AwaitingMovieReference => {
                let movie = MovieService::resolve_reference(state, text).await?;
                let interest =
                    MatchingService::express_interest(state, movie.movie_id, user_id).await?;
                BotOutcome::MovieInterest(MovieInterestOutcome { movie, interest })
            }
            ConversationState::AwaitingSlotDatetime { movie_id } => {
                let scheduled_at =
                    parse_slot_datetime(text, state.config.schedule_utc_offset_hours)?;
                let new_slot = NewSlot {
                    movie_id,
                    scheduled_at,
                    min_participants: None,
                    max_participants: None,
                };
                BotOutcome::SlotCreated(SlotService::create_slot(state, user_id, new_slot).await?)
            }
            ConversationState::AwaitingCatalogAccount => {
                let req = LinkCatalogAccountRequest {
                    catalog_user_id: text.to_string(),
                };
                BotOutcome::CatalogAccountLinked(
                    UserService::link_catalog_account(state, user_id, req).await?,
                )
            }
        };

        state.conversations.clear(user_id);
        info!(user_id = user_id, "Conversation step completed");

        Ok(outcome)
    }

    pub async fn set_conversation(
        state: &AppState,
        user_id: i64,
        conversation: ConversationState,
    ) -> Result<ConversationResponse, AppError> {
        let started = Self::start_conversation(state, user_id, conversation).await?;

        Ok(ConversationResponse {
            user_id,
            state: Some(started),
        })
    }

    pub fn get_conversation(state: &AppState, user_id: i64) -> ConversationResponse {
        ConversationResponse {
            user_id,
            state: state.conversations.get(user_id),
        }
    }

    /// Returns the state that was cleared, if any.
    pub fn clear_conversation(state: &AppState, user_id: i64) -> ConversationResponse {
        ConversationResponse {
            user_id,
            state: state.conversations.clear(user_id),
        }
    }

    async fn start_conversation(
        state: &AppState,
        user_id: i64,
        conversation: ConversationState,
    ) -> Result<ConversationState, AppError> {
        UserService::find_user(&state.db, user_id).await?;
        if let ConversationState::AwaitingSlotDatetime { movie_id } = conversation {
            MovieService::find_movie(&state.db, movie_id).await?;
        }

        state.conversations.set(user_id, conversation.clone());
        Ok(conversation)
    }
}
