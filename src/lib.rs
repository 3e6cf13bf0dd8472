pub mod api_client;
pub mod config;
pub mod core;
pub mod error;
pub mod search_tui;
pub mod utils;
