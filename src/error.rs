//! Errors produced while looking up suggestions

/// Failure of a single lookup against the autocomplete service.
///
/// Every variant is recoverable: the controller turns it into a
/// `Failed` state and the user retries by searching again.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// No response was received (DNS, connect, timeout, TLS).
    #[error("transport: {0}")]
    Transport(String),

    /// The service answered with a non-2xx status.
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("<no message>"))]
    Service { status: u16, message: Option<String> },

    /// The service answered 2xx but the body was not a suggestion list.
    #[error("decode: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        LookupError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_service_error() {
        let err = LookupError::Service {
            status: 500,
            message: Some("db unavailable".to_string()),
        };
        assert_eq!(err.to_string(), "HTTP 500: db unavailable");

        let err = LookupError::Service {
            status: 404,
            message: None,
        };
        assert_eq!(err.to_string(), "HTTP 404: <no message>");
    }
}
