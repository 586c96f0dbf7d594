use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::entity::movie::{self, MovieKind};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveMovieRequest {
    /// kinopoisk.ru / imdb.com URL, or a bare catalog id.
    #[validate(length(min = 1, max = 500, message = "Movie reference must be 1-500 characters."))]
    pub reference: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovieResponse {
    pub movie_id: i32,
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

impl From<movie::Model> for MovieResponse {
    fn from(m: movie::Model) -> Self {
        let genres = m
            .genres
            .as_deref()
            .map(|g| {
                g.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            movie_id: m.movie_id,
            title: m.title,
            original_title: m.original_title,
            year: m.year,
            kind: m.kind,
            kinopoisk_id: m.kinopoisk_id,
            imdb_id: m.imdb_id,
            description: m.description,
            poster_url: m.poster_url,
            rating_kinopoisk: m.rating_kinopoisk,
            rating_imdb: m.rating_imdb,
            film_length: m.film_length,
            genres,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessMovieResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: MovieResponse,
}
