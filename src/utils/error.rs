use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use tracing::{error, warn};

use super::response::ErrorResponse;

/// Application-wide error type.
///
/// Every variant carries the message shown to the caller and maps to a stable
/// error code and HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Validation
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    JsonParseFailed(String),
    #[error("{0}")]
    InvalidSlotDatetime(String),
    #[error("{0}")]
    InvalidParticipantCount(String),
    #[error("{0}")]
    InvalidScore(String),
    #[error("{0}")]
    SelfRating(String),
    #[error("{0}")]
    UnsupportedMovieReference(String),

    // Authentication
    #[error("{0}")]
    Unauthorized(String),

    // Not found
    #[error("{0}")]
    UserNotFound(String),
    #[error("{0}")]
    MovieNotFound(String),
    #[error("{0}")]
    SlotNotFound(String),
    #[error("{0}")]
    RoomNotFound(String),
    #[error("{0}")]
    CatalogAccountNotLinked(String),

    // Forbidden
    #[error("{0}")]
    NotSlotCreator(String),
    #[error("{0}")]
    NotRoomParticipant(String),

    // Conflict
    #[error("{0}")]
    SlotFull(String),
    #[error("{0}")]
    SlotNotOpen(String),
    #[error("{0}")]
    CreatorCannotLeave(String),
    #[error("{0}")]
    NotParticipant(String),
    #[error("{0}")]
    RoomAlreadyExists(String),
    #[error("{0}")]
    AlreadyRated(String),

    // External collaborators
    #[error("{0}")]
    ExternalServiceError(String),

    #[error("{0}")]
    InternalError(String),
}

impl AppError {
    /// Message returned to the caller.
    pub fn message(&self) -> String {
        match self {
            AppError::JsonParseFailed(msg) => format!("Malformed request body: {}", msg),
            AppError::InternalError(_) => "Internal server error.".to_string(),
            other => other.to_string(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_)
            | AppError::ValidationError(_)
            | AppError::JsonParseFailed(_) => "COMMON400",
            AppError::InvalidSlotDatetime(_) => "SLOT4001",
            AppError::InvalidParticipantCount(_) => "SLOT4002",
            AppError::InvalidScore(_) => "RATING4001",
            AppError::SelfRating(_) => "RATING4002",
            AppError::UnsupportedMovieReference(_) => "MOVIE4001",
            AppError::Unauthorized(_) => "AUTH4001",
            AppError::UserNotFound(_) => "USER4041",
            AppError::MovieNotFound(_) => "MOVIE4041",
            AppError::SlotNotFound(_) => "SLOT4041",
            AppError::RoomNotFound(_) => "ROOM4041",
            AppError::CatalogAccountNotLinked(_) => "USER4042",
            AppError::NotSlotCreator(_) => "SLOT4031",
            AppError::NotRoomParticipant(_) => "ROOM4031",
            AppError::SlotFull(_) => "SLOT4091",
            AppError::SlotNotOpen(_) => "SLOT4092",
            AppError::CreatorCannotLeave(_) => "SLOT4093",
            AppError::NotParticipant(_) => "SLOT4094",
            AppError::RoomAlreadyExists(_) => "SLOT4095",
            AppError::AlreadyRated(_) => "RATING4091",
            AppError::ExternalServiceError(_) => "EXTERNAL5021",
            AppError::InternalError(_) => "COMMON500",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_)
            | AppError::ValidationError(_)
            | AppError::JsonParseFailed(_)
            | AppError::InvalidSlotDatetime(_)
            | AppError::InvalidParticipantCount(_)
            | AppError::InvalidScore(_)
            | AppError::SelfRating(_)
            | AppError::UnsupportedMovieReference(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::UserNotFound(_)
            | AppError::MovieNotFound(_)
            | AppError::SlotNotFound(_)
            | AppError::RoomNotFound(_)
            | AppError::CatalogAccountNotLinked(_) => StatusCode::NOT_FOUND,
            AppError::NotSlotCreator(_) | AppError::NotRoomParticipant(_) => {
                StatusCode::FORBIDDEN
            }
            AppError::SlotFull(_)
            | AppError::SlotNotOpen(_)
            | AppError::CreatorCannotLeave(_)
            | AppError::NotParticipant(_)
            | AppError::RoomAlreadyExists(_)
            | AppError::AlreadyRated(_) => StatusCode::CONFLICT,
            AppError::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.message();

        if status.is_server_error() {
            error!(error_code = error_code, detail = %self, "request failed");
        } else {
            warn!(error_code = error_code, "{}", message);
        }

        let error_response = ErrorResponse::new(error_code, message);

        (status, Json(error_response)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::JsonParseFailed(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::ValidationError(errors.to_string())
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::InternalError(err.to_string())
    }
}

/// Whether a database error is a unique-constraint violation.
///
/// Falls back to message inspection for drivers that do not classify the error.
pub fn is_unique_violation(err: &DbErr) -> bool {
    if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
        return true;
    }
    let error_msg = err.to_string().to_lowercase();
    error_msg.contains("duplicate") || error_msg.contains("unique")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_errors_should_map_to_409() {
        let errors = [
            AppError::SlotFull("full".into()),
            AppError::SlotNotOpen("closed".into()),
            AppError::CreatorCannotLeave("creator".into()),
            AppError::NotParticipant("nope".into()),
            AppError::RoomAlreadyExists("room".into()),
            AppError::AlreadyRated("dup".into()),
        ];
        for error in errors {
            assert_eq!(error.status_code(), StatusCode::CONFLICT, "{:?}", error);
        }
    }

    #[test]
    fn validation_errors_should_be_distinct_from_not_found() {
        let invalid = AppError::InvalidScore("score".into());
        let missing = AppError::RoomNotFound("room".into());

        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert_ne!(invalid.error_code(), missing.error_code());
    }

    #[test]
    fn internal_error_should_hide_details_from_caller() {
        let error = AppError::InternalError("connection reset by peer".into());
        assert_eq!(error.message(), "Internal server error.");
        assert_eq!(error.error_code(), "COMMON500");
    }

    #[test]
    fn unique_violation_should_be_detected_from_message() {
        let err = DbErr::Custom("UNIQUE constraint failed: rating.room_id".to_string());
        assert!(is_unique_violation(&err));

        let other = DbErr::Custom("no such table: slot".to_string());
        assert!(!is_unique_violation(&other));
    }
}
