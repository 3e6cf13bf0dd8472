//! Core search logic, independent of any front end

pub mod search_controller;

pub use search_controller::{BeginOutcome, SearchController, SearchState, SearchTicket};
