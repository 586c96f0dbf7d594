pub mod dto;
pub mod handler;
pub mod score;
pub mod service;
