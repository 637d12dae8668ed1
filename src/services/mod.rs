pub mod audit;
pub mod auth;
pub mod content;
pub mod email;
pub mod episodes;
pub mod forms;
pub mod i18n;
pub mod inspector;
pub mod metrics;
pub mod pages;
pub mod realtime;
pub mod storage;
pub mod translations;
