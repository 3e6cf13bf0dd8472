//! Configuration module
//!
//! Settings loaded from `config.toml`: the autocomplete endpoint,
//! user-facing messages and display options.

pub mod config;
