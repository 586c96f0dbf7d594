use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};
use tracing::{info, warn};

use super::dto::{
    CatalogAccountResponse, ImportVotesResponse, LinkCatalogAccountRequest, RegisterUserRequest,
    UserProfileResponse,
};
use super::entity::{bot_user, catalog_account, user_vote};
use crate::domain::movie::client::CatalogVote;
use crate::domain::slot::entity::{slot, slot_participant};
use crate::state::AppState;
use crate::utils::error::AppError;

/// Upper bound on vote pages fetched in one import.
const MAX_VOTE_PAGES: u32 = 200;

const MIN_VOTE_SCORE: i32 = 1;
const MAX_VOTE_SCORE: i32 = 10;

pub struct UserService;

impl UserService {
    /// Get-or-create; name and handle are updated when they changed.
    pub async fn register(
        state: &AppState,
        user_id: i64,
        req: RegisterUserRequest,
    ) -> Result<UserProfileResponse, AppError> {
        let now = Utc::now().naive_utc();
        let display_name = req.display_name.trim().to_string();
        let username = req
            .username
            .map(|u| u.trim().trim_start_matches('@').to_string())
            .filter(|u| !u.is_empty());

        match bot_user::Entity::find_by_id(user_id).one(&state.db).await? {
            Some(existing) => {
                if existing.display_name != display_name
                    || (username.is_some() && existing.username != username)
                {
                    let mut active = existing.into_active_model();
                    active.display_name = Set(display_name);
                    if username.is_some() {
                        active.username = Set(username);
                    }
                    active.updated_at = Set(now);
                    active.update(&state.db).await?;
                }
            }
            None => {
                bot_user::ActiveModel {
                    user_id: Set(user_id),
                    username: Set(username),
                    display_name: Set(display_name),
                    rating: Set(0.0),
                    total_ratings: Set(0),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&state.db)
                .await?;
                info!(user_id = user_id, "User registered");
            }
        }

        Self::get_profile(state, user_id).await
    }

    pub async fn get_profile(
        state: &AppState,
        user_id: i64,
    ) -> Result<UserProfileResponse, AppError> {
        let user = Self::find_user(&state.db, user_id).await?;

        let catalog_user_id = catalog_account::Entity::find_by_id(user_id)
            .one(&state.db)
            .await?
            .map(|a| a.catalog_user_id);

        let imported_votes = user_vote::Entity::find()
            .filter(user_vote::Column::UserId.eq(user_id))
            .count(&state.db)
            .await?;

        let created_slots = slot::Entity::find()
            .filter(slot::Column::CreatorId.eq(user_id))
            .count(&state.db)
            .await?;

        let participating_slots = slot_participant::Entity::find()
            .filter(slot_participant::Column::UserId.eq(user_id))
            .count(&state.db)
            .await?;

        Ok(UserProfileResponse {
            user_id: user.user_id,
            display_name: user.display_name,
            username: user.username,
            rating: user.rating,
            total_ratings: user.total_ratings,
            catalog_user_id,
            imported_votes,
            created_slots,
            participating_slots,
            created_at: user.created_at,
        })
    }

    pub async fn link_catalog_account(
        state: &AppState,
        user_id: i64,
        req: LinkCatalogAccountRequest,
    ) -> Result<CatalogAccountResponse, AppError> {
        let catalog_user_id = req.catalog_user_id.trim().to_string();
        if catalog_user_id.is_empty() || !catalog_user_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::ValidationError(
                "Catalog account id must contain digits only.".to_string(),
            ));
        }

        Self::find_user(&state.db, user_id).await?;

        match catalog_account::Entity::find_by_id(user_id).one(&state.db).await? {
            Some(existing) => {
                let mut active = existing.into_active_model();
                active.catalog_user_id = Set(catalog_user_id.clone());
                active.update(&state.db).await?;
            }
            None => {
                catalog_account::ActiveModel {
                    user_id: Set(user_id),
                    catalog_user_id: Set(catalog_user_id.clone()),
                    created_at: Set(Utc::now().naive_utc()),
                }
                .insert(&state.db)
                .await?;
            }
        }

        info!(user_id = user_id, "Catalog account linked");

        Ok(CatalogAccountResponse {
            user_id,
            catalog_user_id,
        })
    }

    /// Pulls every page of the linked account's votes and upserts them.
    ///
    /// All pages are fetched before anything is written, so a catalog failure
    /// leaves the stored votes untouched.
    pub async fn import_votes(
        state: &AppState,
        user_id: i64,
    ) -> Result<ImportVotesResponse, AppError> {
        // 1. Linked account
        Self::find_user(&state.db, user_id).await?;
        let account = catalog_account::Entity::find_by_id(user_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| {
                AppError::CatalogAccountNotLinked(
                    "Link a catalog account before importing votes.".to_string(),
                )
            })?;

        let resolver = state.metadata.as_ref().ok_or_else(|| {
            AppError::ExternalServiceError("Movie catalog is not configured.".to_string())
        })?;

        // 2. Fetch
        let mut votes = Vec::new();
        let mut page = 1;
        loop {
            let batch = resolver
                .fetch_user_votes(&account.catalog_user_id, page)
                .await?;
            votes.extend(batch.items);
            if page >= batch.total_pages || page >= MAX_VOTE_PAGES {
                break;
            }
            page += 1;
        }

        // 3. Store
        let txn = state.db.begin().await?;
        let mut stored = 0;
        for vote in votes {
            if Self::upsert_vote(&txn, user_id, vote).await? {
                stored += 1;
            }
        }
        txn.commit().await?;

        info!(user_id = user_id, stored = stored, pages = page, "Catalog votes imported");

        Ok(ImportVotesResponse {
            stored,
            pages: page,
        })
    }

    /// Returns false when the item lacks a catalog id or a usable score.
    async fn upsert_vote<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
        vote: CatalogVote,
    ) -> Result<bool, AppError> {
        let (Some(catalog_id), Some(score)) = (vote.catalog_id, vote.score) else {
            return Ok(false);
        };
        if !(MIN_VOTE_SCORE..=MAX_VOTE_SCORE).contains(&score) {
            warn!(catalog_id = %catalog_id, score = score, "Skipping out-of-range catalog vote");
            return Ok(false);
        }

        let now = Utc::now().naive_utc();
        let existing = user_vote::Entity::find()
            .filter(user_vote::Column::UserId.eq(user_id))
            .filter(user_vote::Column::CatalogId.eq(catalog_id.clone()))
            .one(db)
            .await?;

        match existing {
            Some(found) => {
                let mut active = found.into_active_model();
                active.title = Set(vote.title);
                active.year = Set(vote.year);
                active.kind = Set(vote.kind);
                active.score = Set(score);
                active.updated_at = Set(now);
                active.update(db).await?;
            }
            None => {
                user_vote::ActiveModel {
                    user_id: Set(user_id),
                    catalog_id: Set(catalog_id),
                    title: Set(vote.title),
                    year: Set(vote.year),
                    kind: Set(vote.kind),
                    score: Set(score),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(db)
                .await?;
            }
        }

        Ok(true)
    }

    pub async fn find_user<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
    ) -> Result<bot_user::Model, AppError> {
        bot_user::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::UserNotFound("User is not registered.".to_string()))
    }
}
