use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A chat user, keyed by the messaging platform's identity id.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bot_user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    pub username: Option<String>,
    pub display_name: String,
    /// Mean of every peer rating received (0 until the first one).
    pub rating: f64,
    pub total_ratings: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::catalog_account::Entity")]
    CatalogAccount,
    #[sea_orm(has_many = "super::user_vote::Entity")]
    UserVote,
    #[sea_orm(has_many = "crate::domain::slot::entity::slot_participant::Entity")]
    SlotParticipant,
}

impl Related<super::catalog_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatalogAccount.def()
    }
}

impl Related<super::user_vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserVote.def()
    }
}

impl Related<crate::domain::slot::entity::slot_participant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SlotParticipant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
