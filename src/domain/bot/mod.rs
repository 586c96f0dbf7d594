pub mod command;
pub mod conversation;
pub mod dto;
pub mod handler;
pub mod service;
