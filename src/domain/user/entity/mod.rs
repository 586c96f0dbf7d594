pub mod bot_user;
pub mod catalog_account;
pub mod user_vote;
