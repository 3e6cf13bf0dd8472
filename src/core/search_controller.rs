//! SearchController - owns the lifecycle of one search box
//!
//! Turns raw input into a validated lookup, keeps at most one request in
//! flight and resolves every outcome into a [`SearchState`] a front end can
//! render directly. Results are tagged with a request token so a response
//! that arrives after the search was cancelled or reset is dropped.

use crate::api_client::SuggestionSource;
use crate::config::config::MessagesConfig;
use crate::error::LookupError;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle phase of the search box
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum SearchState {
    #[default]
    Idle,
    Loading,
    Success(Vec<String>),
    Failed(String),
}

/// Identifies one dispatched lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub token: u64,
    /// Raw input text, untrimmed
    pub query: String,
}

/// What `begin_search` decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeginOutcome {
    /// Validation passed; the caller must run the lookup for this ticket
    Dispatch(SearchTicket),
    /// Empty input; the state is now `Failed` and nothing is sent
    Rejected,
    /// A lookup is already in flight; nothing changed
    Busy,
}

pub struct SearchController {
    source: Arc<dyn SuggestionSource>,
    messages: MessagesConfig,
    state: SearchState,
    token: u64,
}

impl SearchController {
    pub fn new(source: Arc<dyn SuggestionSource>, messages: MessagesConfig) -> Self {
        Self {
            source,
            messages,
            state: SearchState::Idle,
            token: 0,
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Suggestions of the last successful search, empty in any other state
    pub fn suggestions(&self) -> &[String] {
        match &self.state {
            SearchState::Success(list) => list,
            _ => &[],
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            SearchState::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state == SearchState::Loading
    }

    pub fn current_token(&self) -> u64 {
        self.token
    }

    /// Shared handle to the lookup backend, for running a ticket elsewhere
    pub fn source(&self) -> Arc<dyn SuggestionSource> {
        Arc::clone(&self.source)
    }

    /// Validate the input and, when it is usable, enter `Loading`.
    pub fn begin_search(&mut self, raw: &str) -> BeginOutcome {
        if self.is_loading() {
            warn!(target: "search", "Search requested while token {} is in flight", self.token);
            return BeginOutcome::Busy;
        }

        if raw.trim().is_empty() {
            info!(target: "search", "Rejected empty query");
            self.state = SearchState::Failed(self.messages.empty_query.clone());
            return BeginOutcome::Rejected;
        }

        self.token += 1;
        self.state = SearchState::Loading;
        info!(target: "search", "Dispatching query {:?} (token {})", raw, self.token);

        BeginOutcome::Dispatch(SearchTicket {
            token: self.token,
            query: raw.to_string(),
        })
    }

    /// Apply the result of a lookup. Returns false when the ticket is stale
    /// and the result was discarded.
    pub fn complete_search(
        &mut self,
        ticket: &SearchTicket,
        result: Result<Vec<String>, LookupError>,
    ) -> bool {
        if ticket.token != self.token || !self.is_loading() {
            debug!(
                target: "search",
                "Discarding stale result for token {} (current {})",
                ticket.token,
                self.token
            );
            return false;
        }

        self.state = match result {
            Ok(suggestions) => {
                info!(
                    target: "search",
                    "Query {:?} returned {} suggestions",
                    ticket.query,
                    suggestions.len()
                );
                SearchState::Success(suggestions)
            }
            Err(err) => {
                warn!(target: "search", "Query {:?} failed: {}", ticket.query, err);
                SearchState::Failed(self.failure_message(err))
            }
        };
        true
    }

    /// Validate, look up and resolve in one step.
    /// Performs at most one lookup per call.
    pub async fn submit_search(&mut self, raw: &str) -> &SearchState {
        if let BeginOutcome::Dispatch(ticket) = self.begin_search(raw) {
            let result = self.source.lookup(&ticket.query).await;
            self.complete_search(&ticket, result);
        }
        &self.state
    }

    /// Abandon the in-flight lookup, if any; its result will be ignored
    pub fn cancel(&mut self) {
        if self.is_loading() {
            info!(target: "search", "Cancelled token {}", self.token);
            self.token += 1;
            self.state = SearchState::Idle;
        }
    }

    /// Return to `Idle` from any state
    pub fn reset(&mut self) {
        self.token += 1;
        self.state = SearchState::Idle;
    }

    fn failure_message(&self, err: LookupError) -> String {
        match err {
            LookupError::Transport(_) => self.messages.connection_error.clone(),
            LookupError::Service {
                message: Some(message),
                ..
            } => message,
            LookupError::Service { message: None, .. } => self.messages.fetch_error.clone(),
            LookupError::Decode(_) => self.messages.invalid_response.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedSource(Vec<String>);

    #[async_trait]
    impl SuggestionSource for FixedSource {
        async fn lookup(&self, _query: &str) -> Result<Vec<String>, LookupError> {
            Ok(self.0.clone())
        }
    }

    fn controller() -> SearchController {
        SearchController::new(
            Arc::new(FixedSource(vec!["Анна".to_string()])),
            MessagesConfig::default(),
        )
    }

    #[test]
    fn test_starts_idle() {
        let c = controller();
        assert_eq!(c.state(), &SearchState::Idle);
        assert_eq!(c.current_token(), 0);
        assert!(c.suggestions().is_empty());
        assert_eq!(c.error_message(), None);
    }

    #[test]
    fn test_whitespace_is_rejected_without_ticket() {
        let mut c = controller();
        assert_eq!(c.begin_search(" \t\n"), BeginOutcome::Rejected);
        assert_eq!(c.error_message(), Some("Введите имя для поиска"));
        assert_eq!(c.current_token(), 0);
    }

    #[test]
    fn test_begin_keeps_raw_text() {
        let mut c = controller();
        match c.begin_search("  Ан ") {
            BeginOutcome::Dispatch(ticket) => {
                assert_eq!(ticket.query, "  Ан ");
                assert_eq!(ticket.token, 1);
            }
            other => panic!("expected dispatch, got {:?}", other),
        }
        assert!(c.is_loading());
    }

    #[test]
    fn test_busy_while_loading() {
        let mut c = controller();
        assert!(matches!(c.begin_search("Ан"), BeginOutcome::Dispatch(_)));
        assert_eq!(c.begin_search("Ал"), BeginOutcome::Busy);
        assert_eq!(c.begin_search(""), BeginOutcome::Busy);
        assert_eq!(c.current_token(), 1);
    }

    #[test]
    fn test_loading_clears_previous_error() {
        let mut c = controller();
        c.begin_search("");
        assert!(c.error_message().is_some());
        c.begin_search("Ан");
        assert_eq!(c.error_message(), None);
        assert!(c.suggestions().is_empty());
    }

    #[test]
    fn test_failure_messages() {
        let mut c = controller();
        let cases = vec![
            (
                LookupError::Transport("refused".into()),
                "Ошибка соединения с сервером",
            ),
            (
                LookupError::Service {
                    status: 500,
                    message: Some("db unavailable".into()),
                },
                "db unavailable",
            ),
            (
                LookupError::Service {
                    status: 502,
                    message: None,
                },
                "Ошибка при получении данных",
            ),
            (
                LookupError::Decode("expected value".into()),
                "Некорректный ответ сервера",
            ),
        ];

        for (err, expected) in cases {
            let BeginOutcome::Dispatch(ticket) = c.begin_search("Ан") else {
                panic!("expected dispatch");
            };
            assert!(c.complete_search(&ticket, Err(err)));
            assert_eq!(c.state(), &SearchState::Failed(expected.to_string()));
        }
    }

    #[test]
    fn test_cancel_discards_late_result() {
        let mut c = controller();
        let BeginOutcome::Dispatch(ticket) = c.begin_search("Ан") else {
            panic!("expected dispatch");
        };
        c.cancel();
        assert_eq!(c.state(), &SearchState::Idle);
        assert!(!c.complete_search(&ticket, Ok(vec!["Анна".into()])));
        assert_eq!(c.state(), &SearchState::Idle);
    }

    #[test]
    fn test_old_ticket_cannot_overwrite_new_search() {
        let mut c = controller();
        let BeginOutcome::Dispatch(first) = c.begin_search("Ан") else {
            panic!("expected dispatch");
        };
        c.cancel();
        let BeginOutcome::Dispatch(second) = c.begin_search("Ал") else {
            panic!("expected dispatch");
        };
        assert!(second.token > first.token);

        assert!(!c.complete_search(&first, Ok(vec!["Анна".into()])));
        assert!(c.is_loading());
        assert!(c.complete_search(&second, Ok(vec!["Алина".into()])));
        assert_eq!(c.suggestions(), ["Алина".to_string()]);
    }

    #[test]
    fn test_cancel_outside_loading_is_noop() {
        let mut c = controller();
        c.begin_search("");
        c.cancel();
        assert!(c.error_message().is_some());
        assert_eq!(c.current_token(), 0);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut c = controller();
        c.begin_search("");
        c.reset();
        assert_eq!(c.state(), &SearchState::Idle);
        assert_eq!(c.current_token(), 1);
    }

    #[test]
    fn test_state_json_shape() {
        let json = serde_json::to_value(SearchState::Success(vec!["Анна".into()])).unwrap();
        assert_eq!(json, serde_json::json!({"state": "success", "value": ["Анна"]}));
        let json = serde_json::to_value(SearchState::Idle).unwrap();
        assert_eq!(json, serde_json::json!({"state": "idle"}));
    }

    #[tokio::test]
    async fn test_submit_search_round_trip() {
        let mut c = controller();
        let state = c.submit_search("Ан").await.clone();
        assert_eq!(state, SearchState::Success(vec!["Анна".to_string()]));
    }
}
