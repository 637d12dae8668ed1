pub mod auth;
pub mod content;
pub mod episode;
pub mod forms;
pub mod language;
pub mod translation;
pub mod user;
