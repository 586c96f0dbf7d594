use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::movie::entity::movie::MovieKind;

/// A score (1-10) the user gave a title on the external catalog, imported
/// from their linked account.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_vote")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub user_vote_id: i32,
    pub user_id: i64,
    pub catalog_id: String,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub kind: Option<MovieKind>,
    pub score: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
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
