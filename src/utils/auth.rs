use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use subtle::ConstantTimeEq;

use crate::state::AppState;
use crate::utils::error::AppError;

pub const BOT_SECRET_HEADER: &str = "x-bot-secret";
pub const BOT_USER_ID_HEADER: &str = "x-bot-user-id";

/// The chat user on whose behalf the bot front-end is calling.
///
/// Requires a valid `X-Bot-Secret` and a numeric `X-Bot-User-Id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotUser(pub i64);

impl BotUser {
    pub fn user_id(&self) -> i64 {
        self.0
    }
}

#[async_trait]
impl FromRequestParts<AppState> for BotUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // 1. Shared secret
        let secret = header_str(parts, BOT_SECRET_HEADER)?
            .ok_or_else(|| AppError::Unauthorized("Missing bot secret.".to_string()))?;

        if !secret_matches(secret, &state.config.bot_api_secret) {
            return Err(AppError::Unauthorized("Invalid bot secret.".to_string()));
        }

        // 2. Acting user
        let user_id = header_str(parts, BOT_USER_ID_HEADER)?
            .ok_or_else(|| AppError::Unauthorized("Missing bot user id.".to_string()))?
            .trim()
            .parse::<i64>()
            .map_err(|_| AppError::Unauthorized("Invalid bot user id.".to_string()))?;

        Ok(BotUser(user_id))
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, AppError> {
    match parts.headers.get(name) {
        Some(value) => value
            .to_str()
            .map(Some)
            .map_err(|_| AppError::Unauthorized("Malformed authentication header.".to_string())),
        None => Ok(None),
    }
}

/// Constant-time comparison of the presented secret against the configured one.
pub fn secret_matches(presented: &str, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}
