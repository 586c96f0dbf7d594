use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `open` -> `full` -> `completed`, never backwards.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "full")]
    Full,
    #[sea_orm(string_value = "completed")]
    Completed,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "slot")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub slot_id: i32,
    pub movie_id: i32,
    pub creator_id: i64,
    /// UTC.
    pub scheduled_at: DateTime,
    pub min_participants: i32,
    pub max_participants: Option<i32>,
    pub status: SlotStatus,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::domain::movie::entity::movie::Entity",
        from = "Column::MovieId",
        to = "crate::domain::movie::entity::movie::Column::MovieId",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Movie,
    #[sea_orm(
        belongs_to = "crate::domain::user::entity::bot_user::Entity",
        from = "Column::CreatorId",
        to = "crate::domain::user::entity::bot_user::Column::UserId",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Creator,
    #[sea_orm(has_many = "super::slot_participant::Entity")]
    SlotParticipant,
    #[sea_orm(has_one = "super::room::Entity")]
    Room,
}

impl Related<crate::domain::movie::entity::movie::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movie.def()
    }
}

impl Related<super::slot_participant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SlotParticipant.def()
    }
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Room.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
