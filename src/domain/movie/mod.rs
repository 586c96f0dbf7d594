pub mod client;
pub mod dto;
pub mod entity;
pub mod handler;
pub mod reference;
pub mod service;
