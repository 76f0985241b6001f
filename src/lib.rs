pub mod app;
pub mod cache;
pub mod config;
pub mod events;
pub mod guard;
pub mod humanize;
pub mod media;
pub mod observability;
pub mod settings;
pub mod worker;
