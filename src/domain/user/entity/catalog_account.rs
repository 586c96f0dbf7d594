use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_account")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    pub catalog_user_id: String,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bot_user::Entity",
        from = "Column::UserId",
        to = "super::bot_user::Column::UserId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    BotUser,
}

impl Related<super::bot_user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BotUser.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
