pub mod analytics;
pub mod api;
pub mod config;
pub mod document;
pub mod error;
pub mod http;
pub mod limiter;
