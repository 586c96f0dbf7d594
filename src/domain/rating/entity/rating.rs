use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Peer score (1-5), immutable once written.
/// `(room_id, rater_id, rated_id)` is unique (`uq_rating_room_rater_rated`).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rating")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub rating_id: i32,
    pub room_id: i32,
    pub rater_id: i64,
    pub rated_id: i64,
    pub score: i32,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::domain::slot::entity::room::Entity",
        from = "Column::RoomId",
        to = "crate::domain::slot::entity::room::Column::RoomId",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Room,
}

impl Related<crate::domain::slot::entity::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Room.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
