pub mod bot;
pub mod health;
pub mod matching;
pub mod movie;
pub mod rating;
pub mod slot;
pub mod user;
