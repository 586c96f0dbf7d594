pub mod config;
pub mod domain;
pub mod global;
pub mod notification;
pub mod state;
pub mod utils;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

pub use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        domain::health::handler::health_check,
        domain::user::handler::register_user,
        domain::user::handler::get_profile,
        domain::user::handler::link_catalog_account,
        domain::user::handler::import_votes,
        domain::movie::handler::resolve_movie,
        domain::movie::handler::get_movie,
        domain::movie::handler::refresh_movie,
        domain::slot::handler::create_slot,
        domain::slot::handler::list_open_slots,
        domain::slot::handler::list_my_slots,
        domain::slot::handler::get_slot,
        domain::slot::handler::join_slot,
        domain::slot::handler::leave_slot,
        domain::slot::handler::delete_slot,
        domain::slot::handler::complete_slot,
        domain::matching::handler::compatible_slots,
        domain::matching::handler::express_interest,
        domain::matching::handler::recommendations,
        domain::matching::handler::similarity,
        domain::rating::handler::submit_rating,
        domain::rating::handler::outstanding_ratings,
        domain::bot::handler::handle_callback,
        domain::bot::handler::handle_message,
        domain::bot::handler::set_conversation,
        domain::bot::handler::get_conversation,
        domain::bot::handler::clear_conversation,
    ),
    components(
        schemas(
            domain::health::dto::HealthStatus,
            domain::health::dto::HealthState,
            domain::health::dto::DependencyState,
            domain::user::dto::RegisterUserRequest,
            domain::user::dto::LinkCatalogAccountRequest,
            domain::user::dto::UserProfileResponse,
            domain::user::dto::CatalogAccountResponse,
            domain::user::dto::ImportVotesResponse,
            domain::user::dto::SuccessUserProfileResponse,
            domain::user::dto::SuccessCatalogAccountResponse,
            domain::user::dto::SuccessImportVotesResponse,
            domain::movie::entity::movie::MovieKind,
            domain::movie::dto::ResolveMovieRequest,
            domain::movie::dto::MovieResponse,
            domain::movie::dto::SuccessMovieResponse,
            domain::slot::entity::slot::SlotStatus,
            domain::slot::entity::room::RoomStatus,
            domain::slot::dto::CreateSlotRequest,
            domain::slot::dto::ParticipantItem,
            domain::slot::dto::RoomResponse,
            domain::slot::dto::SlotResponse,
            domain::slot::dto::SlotSummary,
            domain::slot::dto::JoinSlotResponse,
            domain::slot::dto::MySlotsResponse,
            domain::slot::dto::DeleteSlotResponse,
            domain::slot::dto::SuccessSlotResponse,
            domain::slot::dto::SuccessJoinSlotResponse,
            domain::slot::dto::SuccessSlotListResponse,
            domain::slot::dto::SuccessMySlotsResponse,
            domain::slot::dto::SuccessDeleteSlotResponse,
            domain::matching::dto::CompatibleSlot,
            domain::matching::dto::InterestResponse,
            domain::matching::dto::RecommendedSlot,
            domain::matching::dto::SimilarityResponse,
            domain::matching::dto::SuccessCompatibleSlotsResponse,
            domain::matching::dto::SuccessInterestResponse,
            domain::matching::dto::SuccessRecommendationsResponse,
            domain::matching::dto::SuccessSimilarityResponse,
            domain::rating::dto::SubmitRatingRequest,
            domain::rating::dto::RatingItem,
            domain::rating::dto::OutstandingUser,
            domain::rating::dto::SubmitRatingResponse,
            domain::rating::dto::OutstandingRatingsResponse,
            domain::rating::dto::SuccessSubmitRatingResponse,
            domain::rating::dto::SuccessOutstandingRatingsResponse,
            domain::bot::conversation::ConversationState,
            domain::bot::dto::CallbackRequest,
            domain::bot::dto::MessageRequest,
            domain::bot::dto::ConversationResponse,
            domain::bot::dto::BotOutcome,
            domain::bot::dto::MovieInterestOutcome,
            domain::bot::dto::SuccessBotOutcomeResponse,
            domain::bot::dto::SuccessConversationResponse,
            utils::response::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service status"),
        (name = "User", description = "Chat users and catalog accounts"),
        (name = "Movie", description = "Movie resolution and metadata"),
        (name = "Slot", description = "Viewing slots and their rooms"),
        (name = "Matching", description = "Compatible slots, auto-join and recommendations"),
        (name = "Rating", description = "Peer ratings after a session"),
        (name = "Bot", description = "Button callbacks and conversation state")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bot_secret",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Bot-Secret"))),
            );
            components.add_security_scheme(
                "bot_user",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Bot-User-Id"))),
            );
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(domain::health::health_check))
        // User
        .route(
            "/api/v1/users/me",
            put(domain::user::handler::register_user).get(domain::user::handler::get_profile),
        )
        .route(
            "/api/v1/users/me/catalog-account",
            put(domain::user::handler::link_catalog_account),
        )
        .route(
            "/api/v1/users/me/catalog-votes/import",
            post(domain::user::handler::import_votes),
        )
        // Movie
        .route(
            "/api/v1/movies/resolve",
            post(domain::movie::handler::resolve_movie),
        )
        .route(
            "/api/v1/movies/:movie_id",
            get(domain::movie::handler::get_movie),
        )
        .route(
            "/api/v1/movies/:movie_id/refresh",
            post(domain::movie::handler::refresh_movie),
        )
        .route(
            "/api/v1/movies/:movie_id/interest",
            post(domain::matching::handler::express_interest),
        )
        // Slot
        .route(
            "/api/v1/slots",
            post(domain::slot::handler::create_slot).get(domain::slot::handler::list_open_slots),
        )
        .route(
            "/api/v1/slots/mine",
            get(domain::slot::handler::list_my_slots),
        )
        .route(
            "/api/v1/slots/:slot_id",
            get(domain::slot::handler::get_slot).delete(domain::slot::handler::delete_slot),
        )
        .route(
            "/api/v1/slots/:slot_id/join",
            post(domain::slot::handler::join_slot),
        )
        .route(
            "/api/v1/slots/:slot_id/leave",
            post(domain::slot::handler::leave_slot),
        )
        .route(
            "/api/v1/slots/:slot_id/complete",
            post(domain::slot::handler::complete_slot),
        )
        // Matching
        .route(
            "/api/v1/matching/movies/:movie_id/compatible-slots",
            get(domain::matching::handler::compatible_slots),
        )
        .route(
            "/api/v1/matching/recommendations",
            get(domain::matching::handler::recommendations),
        )
        .route(
            "/api/v1/matching/similarity/:other_user_id",
            get(domain::matching::handler::similarity),
        )
        // Rating
        .route(
            "/api/v1/rooms/:room_id/ratings",
            post(domain::rating::handler::submit_rating),
        )
        .route(
            "/api/v1/rooms/:room_id/ratings/outstanding",
            get(domain::rating::handler::outstanding_ratings),
        )
        // Bot
        .route(
            "/api/v1/bot/callbacks",
            post(domain::bot::handler::handle_callback),
        )
        .route(
            "/api/v1/bot/messages",
            post(domain::bot::handler::handle_message),
        )
        .route(
            "/api/v1/bot/conversations",
            post(domain::bot::handler::set_conversation)
                .get(domain::bot::handler::get_conversation)
                .delete(domain::bot::handler::clear_conversation),
        )
        .layer(middleware::from_fn(
            global::middleware::request_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
