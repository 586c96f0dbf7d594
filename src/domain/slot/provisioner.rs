//! Optional co-viewing room provisioning (Watch2Gether API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::movie::entity::movie::MovieKind;
use crate::utils::error::AppError;

/// What a provisioner needs to know about a freshly filled slot.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomRequest {
    pub slot_id: i32,
    pub movie_title: String,
    pub movie_kind: MovieKind,
    pub kinopoisk_id: Option<String>,
    pub imdb_id: Option<String>,
    pub participant_ids: Vec<i64>,
}

impl RoomRequest {
    /// Page the co-viewing room opens with.
    pub fn share_url(&self) -> Option<String> {
        if let Some(kp) = &self.kinopoisk_id {
            let section = match self.movie_kind {
                MovieKind::Series => "series",
                MovieKind::Movie => "film",
            };
            return Some(format!("https://www.kinopoisk.ru/{}/{}/", section, kp));
        }
        self.imdb_id
            .as_ref()
            .map(|imdb| format!("https://www.imdb.com/title/{}/", imdb))
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomProvisioner: Send + Sync {
    /// Returns the reachable room URL.
    async fn provision(&self, request: &RoomRequest) -> Result<String, AppError>;
}

#[derive(Debug, Serialize)]
struct CreateRoomPayload<'a> {
    w2g_api_key: &'a str,
    share: String,
}

#[derive(Debug, Deserialize)]
struct CreateRoomResponse {
    streamkey: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WatchTogetherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl WatchTogetherClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InternalError(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RoomProvisioner for WatchTogetherClient {
    async fn provision(&self, request: &RoomRequest) -> Result<String, AppError> {
        let share = request.share_url().ok_or_else(|| {
            AppError::ExternalServiceError("Movie has no catalog page to share.".to_string())
        })?;

        let response = self
            .client
            .post(format!("{}/rooms/create.json", self.base_url))
            .json(&CreateRoomPayload {
                w2g_api_key: &self.api_key,
                share,
            })
            .send()
            .await
            .map_err(|e| {
                warn!(slot_id = request.slot_id, "Room provisioning request failed: {}", e);
                AppError::ExternalServiceError("Room provisioning is unavailable.".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(slot_id = request.slot_id, status = %status, "Room provisioning rejected");
            return Err(AppError::ExternalServiceError(format!(
                "Room provisioning returned {}.",
                status
            )));
        }

        let body: CreateRoomResponse = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Malformed room provisioning response: {}", e))
        })?;

        let streamkey = body
            .streamkey
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                AppError::ExternalServiceError("Room provisioning returned no room key.".to_string())
            })?;

        let room_url = format!("https://w2g.tv/rooms/{}", streamkey);
        info!(slot_id = request.slot_id, room_url = %room_url, "Co-viewing room provisioned");

        Ok(room_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(kind: MovieKind, kp: Option<&str>, imdb: Option<&str>) -> RoomRequest {
        RoomRequest {
            slot_id: 1,
            movie_title: "Solaris".to_string(),
            movie_kind: kind,
            kinopoisk_id: kp.map(String::from),
            imdb_id: imdb.map(String::from),
            participant_ids: vec![1, 2],
        }
    }

    #[test]
    fn share_url_should_follow_movie_kind() {
        assert_eq!(
            request(MovieKind::Movie, Some("43911"), None).share_url().as_deref(),
            Some("https://www.kinopoisk.ru/film/43911/")
        );
        assert_eq!(
            request(MovieKind::Series, Some("77044"), None).share_url().as_deref(),
            Some("https://www.kinopoisk.ru/series/77044/")
        );
    }

    #[test]
    fn share_url_should_fall_back_to_imdb() {
        assert_eq!(
            request(MovieKind::Movie, None, Some("tt0069293")).share_url().as_deref(),
            Some("https://www.imdb.com/title/tt0069293/")
        );
        assert_eq!(request(MovieKind::Movie, None, None).share_url(), None);
    }
}
