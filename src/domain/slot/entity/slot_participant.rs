use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Join record; `(slot_id, user_id)` is unique (`uq_slot_participant_slot_user`).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "slot_participant")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub slot_participant_id: i32,
    pub slot_id: i32,
    pub user_id: i64,
    pub joined_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::slot::Entity",
        from = "Column::SlotId",
        to = "super::slot::Column::SlotId",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Slot,
    #[sea_orm(
        belongs_to = "crate::domain::user::entity::bot_user::Entity",
        from = "Column::UserId",
        to = "crate::domain::user::entity::bot_user::Column::UserId",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    BotUser,
}

impl Related<super::slot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Slot.def()
    }
}

impl Related<crate::domain::user::entity::bot_user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BotUser.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
