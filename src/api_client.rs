use crate::config::config::EndpointConfig;
use crate::error::LookupError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Successful response body of the autocomplete service.
///
/// Only `suggestions` drives the controller; `query` and `count` are
/// informational and may be absent.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SuggestionResponse {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub suggestions: Option<Vec<String>>,
    #[serde(default)]
    pub count: Option<u64>,
}

impl SuggestionResponse {
    /// Suggestions in service order, with a missing or null list read as empty
    pub fn into_suggestions(self) -> Vec<String> {
        self.suggestions.unwrap_or_default()
    }
}

/// Error body of the autocomplete service
#[derive(Debug, Deserialize, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// Anything that can resolve a query into an ordered list of suggestions.
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    async fn lookup(&self, query: &str) -> Result<Vec<String>, LookupError>;
}

/// HTTP client for the remote name-autocomplete endpoint
#[derive(Clone)]
pub struct AutocompleteClient {
    endpoint: String,
    client: reqwest::Client,
}

impl AutocompleteClient {
    pub fn new(endpoint: &EndpointConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = endpoint.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if !endpoint.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            endpoint: endpoint.url.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build `GET <endpoint>?query=<text>` with the text percent-encoded as is
    pub fn build_request(&self, query: &str) -> Result<reqwest::Request, LookupError> {
        self.client
            .get(&self.endpoint)
            .query(&[("query", query)])
            .build()
            .map_err(LookupError::from)
    }
}

#[async_trait]
impl SuggestionSource for AutocompleteClient {
    async fn lookup(&self, query: &str) -> Result<Vec<String>, LookupError> {
        let request = self.build_request(query)?;
        debug!(target: "api", "GET {}", request.url());

        let response = self.client.execute(request).await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = parse_error_message(&body);
            warn!(target: "api", "Service returned {} ({:?})", status, message);
            return Err(LookupError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let suggestions = parse_suggestions(&body)?;
        debug!(target: "api", "Received {} suggestions", suggestions.len());
        Ok(suggestions)
    }
}

/// Parse a 2xx body into the suggestion list.
/// Only a JSON object is accepted; serde would otherwise read an array positionally.
pub fn parse_suggestions(body: &[u8]) -> Result<Vec<String>, LookupError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| LookupError::Decode(e.to_string()))?;
    if !value.is_object() {
        return Err(LookupError::Decode(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    }

    serde_json::from_value::<SuggestionResponse>(value)
        .map(SuggestionResponse::into_suggestions)
        .map_err(|e| LookupError::Decode(e.to_string()))
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Pull the optional `error` string out of a non-2xx body.
/// Bodies that are not JSON, or whose `error` is not a non-empty string, yield `None`.
pub fn parse_error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|message| !message.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(url: &str) -> AutocompleteClient {
        AutocompleteClient::new(&EndpointConfig {
            url: url.to_string(),
            ..EndpointConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_parse_suggestions_in_order() {
        let body = r#"{"query":"Ал","suggestions":["Александр","Алексей"],"count":2}"#;
        let parsed = parse_suggestions(body.as_bytes()).unwrap();
        assert_eq!(parsed, vec!["Александр", "Алексей"]);
    }

    #[test]
    fn test_missing_or_null_suggestions_are_empty() {
        assert!(parse_suggestions(br#"{"query":"Zz","count":0}"#)
            .unwrap()
            .is_empty());
        assert!(parse_suggestions(br#"{"suggestions":null}"#)
            .unwrap()
            .is_empty());
        assert!(parse_suggestions(b"{}").unwrap().is_empty());
    }

    #[test]
    fn test_count_is_not_trusted() {
        let body = r#"{"suggestions":["Анна"],"count":10}"#;
        assert_eq!(parse_suggestions(body.as_bytes()).unwrap(), vec!["Анна"]);
    }

    #[test]
    fn test_malformed_success_body() {
        assert!(matches!(
            parse_suggestions(b"<html>oops</html>"),
            Err(LookupError::Decode(_))
        ));
        assert!(matches!(
            parse_suggestions(br#"{"suggestions":[1,2]}"#),
            Err(LookupError::Decode(_))
        ));
        assert!(matches!(
            parse_suggestions(b"null"),
            Err(LookupError::Decode(_))
        ));
    }

    #[test]
    fn test_array_body_is_not_a_response() {
        for body in ["[\"Анна\"]", "[\"Ал\",[\"Александр\"],1]", "[]", "\"Анна\""] {
            assert!(
                matches!(parse_suggestions(body.as_bytes()), Err(LookupError::Decode(_))),
                "body {}",
                body
            );
        }
    }

    #[test]
    fn test_parse_error_message() {
        assert_eq!(
            parse_error_message(br#"{"error":"db unavailable"}"#),
            Some("db unavailable".to_string())
        );
        assert_eq!(parse_error_message(br#"{"detail":"x"}"#), None);
        assert_eq!(parse_error_message(br#"{"error":{"code":1}}"#), None);
        assert_eq!(parse_error_message(b"Bad Gateway"), None);
        assert_eq!(parse_error_message(b""), None);
    }

    #[test]
    fn test_empty_error_text_is_absent() {
        assert_eq!(parse_error_message(br#"{"error":""}"#), None);
        assert_eq!(parse_error_message(br#"{"error":null}"#), None);
    }

    #[test]
    fn test_request_url_encodes_cyrillic() {
        let client = client_for("http://localhost:9000/autocomplete");
        let request = client.build_request("Ал").unwrap();
        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(request.url().query(), Some("query=%D0%90%D0%BB"));
    }

    #[test]
    fn test_request_url_encodes_reserved_characters() {
        let client = client_for("http://localhost:9000/autocomplete");
        let request = client.build_request("a&b=c?#").unwrap();
        assert_eq!(request.url().query(), Some("query=a%26b%3Dc%3F%23"));
    }

    #[test]
    fn test_request_keeps_untrimmed_text() {
        let client = client_for("http://localhost:9000/autocomplete");
        let request = client.build_request(" Ан ").unwrap();
        assert_eq!(request.url().query(), Some("query=+%D0%90%D0%BD+"));
    }

    #[test]
    fn test_invalid_endpoint_is_transport_error() {
        let client = client_for("not a url");
        assert!(matches!(
            client.build_request("Ал"),
            Err(LookupError::Transport(_))
        ));
    }
}
