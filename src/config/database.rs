use crate::domain::{
    movie::entity::movie,
    rating::entity::rating,
    slot::entity::{room, slot, slot_participant},
    user::entity::{bot_user, catalog_account, user_vote},
};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Schema, Statement};
use tracing::info;

pub async fn establish_connection(
    database_url: &str,
    schema_update: bool,
) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;
    info!("Successfully connected to the database.");

    if schema_update {
        sync_schema(&db).await?;
    } else {
        info!("Skipping database schema synchronization (DB_SCHEMA_UPDATE is not true).");
    }

    Ok(db)
}

/// Creates missing tables from the entities, then the unique indexes the
/// slot lifecycle and rating aggregator rely on.
pub async fn sync_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    info!("Starting database schema synchronization...");

    // Parents first for foreign keys.

    // 1. Independent
    create_table_if_not_exists(db, &schema, bot_user::Entity).await?;
    create_table_if_not_exists(db, &schema, movie::Entity).await?;

    // 2. Level 1
    create_table_if_not_exists(db, &schema, catalog_account::Entity).await?;
    create_table_if_not_exists(db, &schema, user_vote::Entity).await?;
    create_table_if_not_exists(db, &schema, slot::Entity).await?;

    // 3. Level 2
    create_table_if_not_exists(db, &schema, slot_participant::Entity).await?;
    create_table_if_not_exists(db, &schema, room::Entity).await?;

    // 4. Level 3
    create_table_if_not_exists(db, &schema, rating::Entity).await?;

    create_unique_index_if_not_exists(
        db,
        "uq_slot_participant_slot_user",
        "slot_participant",
        &["slot_id", "user_id"],
    )
    .await?;
    create_unique_index_if_not_exists(
        db,
        "uq_rating_room_rater_rated",
        "rating",
        &["room_id", "rater_id", "rated_id"],
    )
    .await?;
    create_unique_index_if_not_exists(
        db,
        "uq_user_vote_user_catalog",
        "user_vote",
        &["user_id", "catalog_id"],
    )
    .await?;
    create_index_if_not_exists(db, "idx_slot_status_scheduled", "slot", &["status", "scheduled_at"])
        .await?;
    create_index_if_not_exists(db, "idx_rating_rated", "rating", &["rated_id"]).await?;

    info!("Database schema synchronization completed.");
    Ok(())
}

fn is_already_exists(err: &DbErr) -> bool {
    let err_str = err.to_string().to_lowercase();
    err_str.contains("duplicate") || err_str.contains("already exists")
}

async fn create_index_if_not_exists(
    db: &DatabaseConnection,
    index_name: &str,
    table_name: &str,
    columns: &[&str],
) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let sql = format!(
        "CREATE INDEX {} ON {} ({})",
        index_name,
        table_name,
        columns.join(", ")
    );
    match db.execute(Statement::from_string(backend, sql)).await {
        Ok(_) => Ok(()),
        Err(e) if is_already_exists(&e) => Ok(()),
        Err(e) => {
            tracing::error!("Failed to create index {}: {}", index_name, e);
            Err(e)
        }
    }
}

async fn create_unique_index_if_not_exists(
    db: &DatabaseConnection,
    index_name: &str,
    table_name: &str,
    columns: &[&str],
) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let sql = format!(
        "CREATE UNIQUE INDEX {} ON {} ({})",
        index_name,
        table_name,
        columns.join(", ")
    );
    match db.execute(Statement::from_string(backend, sql)).await {
        Ok(_) => Ok(()),
        Err(e) if is_already_exists(&e) => Ok(()),
        Err(e) => {
            tracing::error!("Failed to create unique index {}: {}", index_name, e);
            Err(e)
        }
    }
}

async fn create_table_if_not_exists<E>(
    db: &DatabaseConnection,
    schema: &Schema,
    entity: E,
) -> Result<(), DbErr>
where
    E: sea_orm::EntityTrait,
{
    let backend = db.get_database_backend();
    let table_name = entity.table_name().to_string();
    let create_stmt: Statement =
        backend.build(schema.create_table_from_entity(entity).if_not_exists());

    db.execute(create_stmt).await.map(|_| ()).map_err(|e| {
        tracing::error!("Failed to create table {}: {}", table_name, e);
        e
    })
}
