//! Movie catalog collaborator (kinopoiskapiunofficial.tech).
//!
//! Resolves catalog references to metadata and pages through a catalog
//! account's votes. Every call is bounded by the configured timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::entity::movie::MovieKind;
use super::reference::CatalogRef;
use crate::utils::error::AppError;

const API_KEY_HEADER: &str = "X-API-KEY";

#[derive(Debug, Clone, PartialEq)]
pub struct MovieMetadata {
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<i32>,
    pub kind: MovieKind,
    pub kinopoisk_id: Option<String>,
    pub imdb_id: Option<String>,
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub rating_kinopoisk: Option<f64>,
    pub rating_imdb: Option<f64>,
    pub film_length: Option<i32>,
    pub genres: Vec<String>,
}

/// One scored title from a catalog account.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogVote {
    pub catalog_id: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub kind: Option<MovieKind>,
    pub score: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VotesPage {
    pub total_pages: u32,
    pub items: Vec<CatalogVote>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// `Ok(None)` when the catalog has no such title.
    async fn resolve(&self, reference: &CatalogRef) -> Result<Option<MovieMetadata>, AppError>;

    /// Pages are 1-based.
    async fn fetch_user_votes(
        &self,
        catalog_user_id: &str,
        page: u32,
    ) -> Result<VotesPage, AppError>;
}

/// Maps the catalog's content type to a movie kind.
pub fn kind_from_catalog_type(raw: &str) -> MovieKind {
    match raw {
        "TV_SERIES" | "MINI_SERIES" | "TV_SHOW" => MovieKind::Series,
        _ => MovieKind::Movie,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilmResponse {
    kinopoisk_id: i64,
    imdb_id: Option<String>,
    name_ru: Option<String>,
    name_en: Option<String>,
    name_original: Option<String>,
    poster_url: Option<String>,
    rating_kinopoisk: Option<f64>,
    rating_imdb: Option<f64>,
    year: Option<serde_json::Value>,
    film_length: Option<i32>,
    description: Option<String>,
    #[serde(rename = "type")]
    film_type: Option<String>,
    #[serde(default)]
    genres: Vec<GenreItem>,
}

#[derive(Debug, Deserialize)]
struct GenreItem {
    genre: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilmSearchResponse {
    #[serde(default)]
    items: Vec<FilmSearchItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilmSearchItem {
    kinopoisk_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VotesResponse {
    total_pages: Option<u32>,
    #[serde(default)]
    items: Vec<VoteItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoteItem {
    kinopoisk_id: Option<i64>,
    name_ru: Option<String>,
    name_en: Option<String>,
    name_original: Option<String>,
    year: Option<serde_json::Value>,
    #[serde(rename = "type")]
    film_type: Option<String>,
    user_rating: Option<serde_json::Value>,
}

/// Years and scores arrive as either numbers or numeric strings.
fn loose_int(value: Option<&serde_json::Value>) -> Option<i32> {
    match value? {
        serde_json::Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl From<FilmResponse> for MovieMetadata {
    fn from(film: FilmResponse) -> Self {
        let title = film
            .name_ru
            .clone()
            .or_else(|| film.name_en.clone())
            .or_else(|| film.name_original.clone())
            .unwrap_or_else(|| format!("#{}", film.kinopoisk_id));
        let original_title = film
            .name_original
            .or(film.name_en)
            .filter(|original| *original != title);

        Self {
            title,
            original_title,
            year: loose_int(film.year.as_ref()),
            kind: film
                .film_type
                .as_deref()
                .map(kind_from_catalog_type)
                .unwrap_or(MovieKind::Movie),
            kinopoisk_id: Some(film.kinopoisk_id.to_string()),
            imdb_id: film.imdb_id.filter(|id| !id.is_empty()),
            description: film.description,
            poster_url: film.poster_url,
            rating_kinopoisk: film.rating_kinopoisk,
            rating_imdb: film.rating_imdb,
            film_length: film.film_length,
            genres: film.genres.into_iter().map(|g| g.genre).collect(),
        }
    }
}

impl From<VoteItem> for CatalogVote {
    fn from(item: VoteItem) -> Self {
        Self {
            catalog_id: item.kinopoisk_id.map(|id| id.to_string()),
            title: item.name_ru.or(item.name_en).or(item.name_original),
            year: loose_int(item.year.as_ref()),
            kind: item.film_type.as_deref().map(kind_from_catalog_type),
            score: loose_int(item.user_rating.as_ref()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KinopoiskClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl KinopoiskClient {
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

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, AppError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Calling movie catalog");

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                warn!("Movie catalog request failed: {}", e);
                AppError::ExternalServiceError("Movie catalog is unavailable.".to_string())
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body.chars().take(200).collect::<String>(), "Movie catalog returned an error");
            return Err(AppError::ExternalServiceError(format!(
                "Movie catalog returned {}.",
                status
            )));
        }

        response.json::<T>().await.map(Some).map_err(|e| {
            warn!("Malformed movie catalog response: {}", e);
            AppError::ExternalServiceError("Movie catalog returned malformed data.".to_string())
        })
    }

    async fn film_by_kinopoisk_id(&self, id: &str) -> Result<Option<MovieMetadata>, AppError> {
        let film: Option<FilmResponse> =
            self.get_json(&format!("/api/v2.2/films/{}", id), &[]).await?;
        Ok(film.map(MovieMetadata::from))
    }
}

#[async_trait]
impl MetadataResolver for KinopoiskClient {
    async fn resolve(&self, reference: &CatalogRef) -> Result<Option<MovieMetadata>, AppError> {
        match reference {
            CatalogRef::Kinopoisk(id) => self.film_by_kinopoisk_id(id).await,
            CatalogRef::Imdb(id) => {
                // The catalog is keyed by its own ids; look the IMDb id up first.
                let search: Option<FilmSearchResponse> = self
                    .get_json("/api/v2.2/films", &[("imdbId", id.clone())])
                    .await?;
                let Some(kinopoisk_id) = search
                    .and_then(|s| s.items.into_iter().next())
                    .map(|item| item.kinopoisk_id.to_string())
                else {
                    return Ok(None);
                };
                let metadata = self.film_by_kinopoisk_id(&kinopoisk_id).await?;
                Ok(metadata.map(|mut m| {
                    m.imdb_id.get_or_insert_with(|| id.clone());
                    m
                }))
            }
        }
    }

    async fn fetch_user_votes(
        &self,
        catalog_user_id: &str,
        page: u32,
    ) -> Result<VotesPage, AppError> {
        let votes: Option<VotesResponse> = self
            .get_json(
                &format!("/api/v1/kp_users/{}/votes", catalog_user_id),
                &[("page", page.to_string())],
            )
            .await?;

        let votes = votes.ok_or_else(|| {
            AppError::ExternalServiceError("Catalog account was not found.".to_string())
        })?;

        Ok(VotesPage {
            total_pages: votes.total_pages.unwrap_or(1).max(1),
            items: votes.items.into_iter().map(CatalogVote::from).collect(),
        })
    }
}
