pub mod dto;
pub mod entity;
pub mod handler;
pub mod provisioner;
pub mod schedule;
pub mod service;
pub mod sweeper;
