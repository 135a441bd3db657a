use reqwest::StatusCode;
use tokio::task::JoinError;

/// A consolidated login handshake failure.
///
/// Carries the most specific upstream explanation available; see
/// [`AuthError::from_failure_parts`] for the preference order.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Authentication failed: {0}")]
pub struct AuthError(pub String);

impl AuthError {
    /// Build an error message from an identity-provider failure response,
    /// preferring `error_description`, then `message`, then the HTTP status
    /// line, then the raw body.
    pub(crate) fn from_failure_parts(status: StatusCode, body: &str) -> Self {
        let from_json = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json| {
                json.get("error_description")
                    .or_else(|| json.get("message"))
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
            });
        let message = match from_json {
            Some(message) => message,
            None if status.is_client_error() || status.is_server_error() => status.to_string(),
            None => body.to_string(),
        };
        Self(message)
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self(error.to_string())
    }
}

/// An error from a data call through the gateway
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// HTTP 401 on a data call. Distinct from [`GatewayError::Transport`] so
    /// callers can produce an actionable message about credentials.
    #[error("Upstream rejected the session token - check the account credentials")]
    InvalidCredentials,

    /// HTTP 429 on a data call.
    #[error("Rate limited by the upstream service - wait before retrying")]
    RateLimited,

    /// Any other non-2xx HTTP outcome.
    #[error("Upstream request failed: {0}")]
    Transport(StatusCode),

    #[error("Failed to send GraphQL request: {0}")]
    Request(#[from] reqwest::Error),

    /// HTTP succeeded but the response body carried a GraphQL error list.
    #[error("GraphQL errors: {0}")]
    GraphQl(String),

    #[error("Unexpected response shape: {0}")]
    MalformedResponse(String),

    /// Detected locally before any upstream call is attempted.
    #[error("{0}")]
    Precondition(String),

    /// A typed error result from the upstream service, as opposed to a
    /// transport failure. Order creation reports out-of-stock item ids here.
    #[error("{message}")]
    Rejected {
        message: String,
        out_of_stock: Vec<String>,
    },
}

/// An error in server startup
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start server")]
    Startup(#[from] JoinError),

    #[error("MCP transport error: {0}")]
    Transport(String),
}

/// An MCP tool error
pub type McpError = rmcp::model::ErrorData;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_prefers_error_description() {
        let body = r#"{"error":"access_denied","error_description":"Wrong email or password.","message":"denied"}"#;
        let error = AuthError::from_failure_parts(StatusCode::FORBIDDEN, body);
        assert_eq!(error.0, "Wrong email or password.");
    }

    #[test]
    fn it_falls_back_to_message_field() {
        let body = r#"{"message":"account locked"}"#;
        let error = AuthError::from_failure_parts(StatusCode::FORBIDDEN, body);
        assert_eq!(error.0, "account locked");
    }

    #[test]
    fn it_falls_back_to_status_line() {
        let error = AuthError::from_failure_parts(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert_eq!(error.0, "502 Bad Gateway");
    }

    #[test]
    fn it_uses_raw_text_for_non_error_statuses() {
        let error = AuthError::from_failure_parts(StatusCode::OK, "ticket missing");
        assert_eq!(error.0, "ticket missing");
    }
}
