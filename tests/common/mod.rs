#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, EntityTrait, IntoActiveModel, Set};

use cowatch_server::config::{sync_schema, AppConfig};
use cowatch_server::domain::bot::conversation::ConversationStore;
use cowatch_server::domain::movie::client::{CatalogVote, MetadataResolver, MovieMetadata, VotesPage};
use cowatch_server::domain::movie::entity::movie::{self, MovieKind};
use cowatch_server::domain::movie::reference::CatalogRef;
use cowatch_server::domain::slot::dto::{NewSlot, SlotResponse};
use cowatch_server::domain::slot::provisioner::{RoomProvisioner, RoomRequest};
use cowatch_server::domain::slot::service::SlotService;
use cowatch_server::domain::user::dto::RegisterUserRequest;
use cowatch_server::domain::user::entity::bot_user;
use cowatch_server::domain::user::service::UserService;
use cowatch_server::notification::{DomainEvent, NotificationSink};
use cowatch_server::utils::error::AppError;
use cowatch_server::AppState;

pub const TEST_SECRET: &str = "test-bot-secret";

/// Keeps every event it receives.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(DomainEvent::name).collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, event: &DomainEvent) -> Result<(), AppError> {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
        Ok(())
    }
}

/// Hands out a predictable room URL.
pub struct FakeProvisioner;

#[async_trait]
impl RoomProvisioner for FakeProvisioner {
    async fn provision(&self, request: &RoomRequest) -> Result<String, AppError> {
        Ok(format!("https://w2g.tv/rooms/test-{}", request.slot_id))
    }
}

/// Knows one title (kinopoisk 326 / tt0111161) and serves two pages of votes.
#[derive(Default)]
pub struct FakeCatalog {
    resolve_calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataResolver for FakeCatalog {
    async fn resolve(&self, reference: &CatalogRef) -> Result<Option<MovieMetadata>, AppError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if reference.id() != "326" && reference.id() != "tt0111161" {
            return Ok(None);
        }
        Ok(Some(MovieMetadata {
            title: "The Shawshank Redemption".to_string(),
            original_title: None,
            year: Some(1994),
            kind: MovieKind::Movie,
            kinopoisk_id: Some("326".to_string()),
            imdb_id: Some("tt0111161".to_string()),
            description: None,
            poster_url: None,
            rating_kinopoisk: Some(9.1),
            rating_imdb: Some(9.3),
            film_length: Some(142),
            genres: vec!["drama".to_string()],
        }))
    }

    async fn fetch_user_votes(
        &self,
        _catalog_user_id: &str,
        page: u32,
    ) -> Result<VotesPage, AppError> {
        let vote = |id: Option<&str>, score: Option<i32>| CatalogVote {
            catalog_id: id.map(String::from),
            title: Some(format!("Title {}", id.unwrap_or("?"))),
            year: Some(2000),
            kind: Some(MovieKind::Movie),
            score,
        };
        let items = match page {
            1 => vec![vote(Some("100"), Some(8)), vote(None, Some(7))],
            _ => vec![vote(Some("200"), Some(6)), vote(Some("300"), None)],
        };
        Ok(VotesPage {
            total_pages: 2,
            items,
        })
    }
}

pub struct TestContext {
    pub state: AppState,
    pub sink: Arc<RecordingSink>,
}

/// Fresh in-memory database with the full schema.
pub async fn setup() -> TestContext {
    setup_with(None).await
}

pub async fn setup_with_provisioner() -> TestContext {
    setup_with(Some(Arc::new(FakeProvisioner))).await
}

pub async fn setup_with_catalog(catalog: Arc<FakeCatalog>) -> TestContext {
    let mut ctx = setup().await;
    ctx.state.metadata = Some(catalog);
    ctx
}

async fn setup_with(room_provisioner: Option<Arc<dyn RoomProvisioner>>) -> TestContext {
    // One connection: every pool connection would otherwise get its own memory db.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    sync_schema(&db).await.unwrap();

    let config = AppConfig {
        bot_api_secret: TEST_SECRET.to_string(),
        ..AppConfig::default()
    };

    let sink = Arc::new(RecordingSink::default());
    let state = AppState {
        db,
        conversations: ConversationStore::new(Duration::from_secs(
            config.conversation_ttl_secs,
        )),
        config,
        notifier: sink.clone(),
        metadata: None,
        room_provisioner,
    };

    TestContext { state, sink }
}

pub async fn create_user(state: &AppState, user_id: i64, name: &str) {
    UserService::register(
        state,
        user_id,
        RegisterUserRequest {
            display_name: name.to_string(),
            username: None,
        },
    )
    .await
    .unwrap();
}

/// Sets a user's received peer rating directly.
pub async fn set_peer_rating(state: &AppState, user_id: i64, rating: f64, total_ratings: i32) {
    let user = bot_user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await
        .unwrap()
        .unwrap();
    let mut active = user.into_active_model();
    active.rating = Set(rating);
    active.total_ratings = Set(total_ratings);
    active.update(&state.db).await.unwrap();
}

pub async fn create_movie(state: &AppState, title: &str, kinopoisk_id: Option<&str>) -> i32 {
    create_movie_with(state, title, kinopoisk_id, MovieKind::Movie, Some(2010)).await
}

pub async fn create_movie_with(
    state: &AppState,
    title: &str,
    kinopoisk_id: Option<&str>,
    kind: MovieKind,
    year: Option<i32>,
) -> i32 {
    let now = Utc::now().naive_utc();
    movie::ActiveModel {
        title: Set(title.to_string()),
        original_title: Set(None),
        year: Set(year),
        kind: Set(kind),
        kinopoisk_id: Set(kinopoisk_id.map(String::from)),
        imdb_id: Set(None),
        description: Set(None),
        poster_url: Set(None),
        rating_kinopoisk: Set(None),
        rating_imdb: Set(None),
        film_length: Set(None),
        genres: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .unwrap()
    .movie_id
}

pub fn in_days(days: i64) -> NaiveDateTime {
    Utc::now().naive_utc() + chrono::Duration::days(days)
}

pub async fn create_slot(
    state: &AppState,
    creator_id: i64,
    movie_id: i32,
    min_participants: i32,
    max_participants: Option<i32>,
) -> SlotResponse {
    SlotService::create_slot(
        state,
        creator_id,
        NewSlot {
            movie_id,
            scheduled_at: in_days(2),
            min_participants: Some(min_participants),
            max_participants,
        },
    )
    .await
    .unwrap()
}
