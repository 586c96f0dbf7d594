use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};
use tracing::info;

use super::client::MovieMetadata;
use super::dto::MovieResponse;
use super::entity::movie;
use super::reference::{parse_movie_reference, CatalogRef};
use crate::state::AppState;
use crate::utils::error::AppError;

pub struct MovieService;

impl MovieService {
    /// Returns the movie behind a URL or catalog id, creating it from the
    /// catalog on first reference.
    pub async fn resolve_reference(
        state: &AppState,
        reference: &str,
    ) -> Result<MovieResponse, AppError> {
        // 1. Extract the catalog id
        let catalog_ref = parse_movie_reference(reference).ok_or_else(|| {
            AppError::UnsupportedMovieReference(
                "Send a kinopoisk.ru or imdb.com link, or a catalog id.".to_string(),
            )
        })?;

        // 2. Known already: no outbound call
        if let Some(existing) = Self::find_by_catalog_ref(&state.db, &catalog_ref).await? {
            return Ok(existing.into());
        }

        // 3. Ask the catalog
        let metadata = Self::fetch_metadata(state, &catalog_ref).await?;

        // 4. The other namespace may already be known
        if let Some(existing) = Self::find_by_metadata_ids(&state.db, &metadata).await? {
            return Ok(existing.into());
        }

        // 5. Create
        let now = Utc::now().naive_utc();
        let mut active = movie::ActiveModel {
            created_at: Set(now),
            ..Default::default()
        };
        apply_metadata(&mut active, metadata);
        active.updated_at = Set(now);

        let created = active.insert(&state.db).await?;
        info!(
            movie_id = created.movie_id,
            catalog_ref = %catalog_ref,
            "Movie created from catalog"
        );

        Ok(created.into())
    }

    /// Re-reads metadata from the catalog; identity is unchanged.
    pub async fn refresh_metadata(
        state: &AppState,
        movie_id: i32,
    ) -> Result<MovieResponse, AppError> {
        let existing = Self::find_movie(&state.db, movie_id).await?;

        let catalog_ref = match (&existing.kinopoisk_id, &existing.imdb_id) {
            (Some(kp), _) => CatalogRef::Kinopoisk(kp.clone()),
            (None, Some(imdb)) => CatalogRef::Imdb(imdb.clone()),
            (None, None) => {
                return Err(AppError::BadRequest(
                    "Movie has no catalog id to refresh from.".to_string(),
                ))
            }
        };

        let mut metadata = Self::fetch_metadata(state, &catalog_ref).await?;
        // Keep ids that were already known
        metadata.kinopoisk_id = existing.kinopoisk_id.clone().or(metadata.kinopoisk_id);
        metadata.imdb_id = existing.imdb_id.clone().or(metadata.imdb_id);

        let mut active = existing.into_active_model();
        apply_metadata(&mut active, metadata);
        active.updated_at = Set(Utc::now().naive_utc());

        let updated = active.update(&state.db).await?;
        info!(movie_id = movie_id, "Movie metadata refreshed");

        Ok(updated.into())
    }

    pub async fn get_movie(state: &AppState, movie_id: i32) -> Result<MovieResponse, AppError> {
        Ok(Self::find_movie(&state.db, movie_id).await?.into())
    }

    pub async fn find_movie<C: ConnectionTrait>(
        db: &C,
        movie_id: i32,
    ) -> Result<movie::Model, AppError> {
        movie::Entity::find_by_id(movie_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::MovieNotFound("Movie not found.".to_string()))
    }

    /// Ids of every movie row sharing a catalog id with `target`, itself included.
    pub async fn sibling_movie_ids<C: ConnectionTrait>(
        db: &C,
        target: &movie::Model,
    ) -> Result<Vec<i32>, AppError> {
        let mut condition = Condition::any().add(movie::Column::MovieId.eq(target.movie_id));
        if let Some(kp) = &target.kinopoisk_id {
            condition = condition.add(movie::Column::KinopoiskId.eq(kp.clone()));
        }
        if let Some(imdb) = &target.imdb_id {
            condition = condition.add(movie::Column::ImdbId.eq(imdb.clone()));
        }

        let movies = movie::Entity::find()
            .filter(condition)
            .order_by_asc(movie::Column::MovieId)
            .all(db)
            .await?;

        Ok(movies.into_iter().map(|m| m.movie_id).collect())
    }

    async fn fetch_metadata(
        state: &AppState,
        catalog_ref: &CatalogRef,
    ) -> Result<MovieMetadata, AppError> {
        let resolver = state.metadata.as_ref().ok_or_else(|| {
            AppError::ExternalServiceError("Movie catalog is not configured.".to_string())
        })?;

        resolver
            .resolve(catalog_ref)
            .await?
            .ok_or_else(|| AppError::MovieNotFound(format!("No catalog entry for {}.", catalog_ref)))
    }

    async fn find_by_catalog_ref<C: ConnectionTrait>(
        db: &C,
        catalog_ref: &CatalogRef,
    ) -> Result<Option<movie::Model>, AppError> {
        let column = match catalog_ref {
            CatalogRef::Kinopoisk(_) => movie::Column::KinopoiskId,
            CatalogRef::Imdb(_) => movie::Column::ImdbId,
        };

        Ok(movie::Entity::find()
            .filter(column.eq(catalog_ref.id()))
            .order_by_asc(movie::Column::MovieId)
            .one(db)
            .await?)
    }

    async fn find_by_metadata_ids<C: ConnectionTrait>(
        db: &C,
        metadata: &MovieMetadata,
    ) -> Result<Option<movie::Model>, AppError> {
        if let Some(kp) = &metadata.kinopoisk_id {
            if let Some(found) =
                Self::find_by_catalog_ref(db, &CatalogRef::Kinopoisk(kp.clone())).await?
            {
                return Ok(Some(found));
            }
        }
        if let Some(imdb) = &metadata.imdb_id {
            return Self::find_by_catalog_ref(db, &CatalogRef::Imdb(imdb.clone())).await;
        }
        Ok(None)
    }
}

fn apply_metadata(active: &mut movie::ActiveModel, metadata: MovieMetadata) {
    active.title = Set(metadata.title);
    active.original_title = Set(metadata.original_title);
    active.year = Set(metadata.year);
    active.kind = Set(metadata.kind);
    active.kinopoisk_id = Set(metadata.kinopoisk_id);
    active.imdb_id = Set(metadata.imdb_id);
    active.description = Set(metadata.description);
    active.poster_url = Set(metadata.poster_url);
    active.rating_kinopoisk = Set(metadata.rating_kinopoisk);
    active.rating_imdb = Set(metadata.rating_imdb);
    active.film_length = Set(metadata.film_length);
    active.genres = Set(if metadata.genres.is_empty() {
        None
    } else {
        Some(metadata.genres.join(", "))
    });
}
