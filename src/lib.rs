// Library modules for the binary and integration tests
pub mod audio;
pub mod auth;
pub mod chunking;
pub mod config;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod server;
pub mod services;
pub mod text_processing;
pub mod upstream;
