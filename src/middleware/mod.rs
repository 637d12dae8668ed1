pub mod auth;
pub mod language;
pub mod rate_limit;
