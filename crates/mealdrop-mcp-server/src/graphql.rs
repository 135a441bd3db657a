//! Execute GraphQL operations against the Mealdrop upstream services

use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::errors::GatewayError;
use crate::session::SessionManager;

/// Menu-oriented service (meals, chefs, categories).
pub const DEFAULT_MENU_URL: &str = "https://menu.mealdrop.com/graphql";
/// Account- and subscription-oriented service (profile, orders, carts, skips).
pub const DEFAULT_SUBSCRIPTION_URL: &str = "https://subscription.mealdrop.com/graphql";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Which upstream service an operation targets.
#[derive(Clone, Copy, Debug)]
pub enum Service {
    Menu,
    Subscription,
}

/// Issues GraphQL operations with a bearer token from the session manager and
/// classifies failures. Raw payloads are handed back to the caller to
/// normalize; nothing is cached here.
pub struct Gateway {
    client: reqwest::Client,
    session: Arc<SessionManager>,
    menu_url: Url,
    subscription_url: Url,
}

impl Gateway {
    pub fn new(
        session: Arc<SessionManager>,
        menu_url: Url,
        subscription_url: Url,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            session,
            menu_url,
            subscription_url,
        })
    }

    /// Execute one named operation and return its `data` payload.
    ///
    /// Obtaining the token may suspend for the duration of a full login
    /// handshake if the cached token has expired.
    pub async fn execute(
        &self,
        service: Service,
        query: &str,
        operation_name: &str,
        variables: Value,
    ) -> Result<Value, GatewayError> {
        let token = self.session.access_token().await?;
        let endpoint = match service {
            Service::Menu => &self.menu_url,
            Service::Subscription => &self.subscription_url,
        };
        debug!(operation = operation_name, ?service, "executing GraphQL operation");

        let response = self
            .client
            .post(endpoint.clone())
            .bearer_auth(token)
            .json(&json!({
                "query": query,
                "variables": variables,
                "operationName": operation_name,
            }))
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(GatewayError::InvalidCredentials),
            StatusCode::TOO_MANY_REQUESTS => Err(GatewayError::RateLimited),
            status if !status.is_success() => Err(GatewayError::Transport(status)),
            _ => {
                let body = response.json::<Value>().await?;
                if let Some(errors) = body
                    .get("errors")
                    .and_then(Value::as_array)
                    .filter(|errors| !errors.is_empty())
                {
                    let message = errors
                        .iter()
                        .map(|error| {
                            error
                                .get("message")
                                .and_then(Value::as_str)
                                .unwrap_or("unknown error")
                        })
                        .collect::<Vec<_>>()
                        .join("; ");
                    return Err(GatewayError::GraphQl(message));
                }
                body.get("data")
                    .filter(|data| !data.is_null())
                    .cloned()
                    .ok_or_else(|| {
                        GatewayError::MalformedResponse(
                            "response carried neither data nor errors".to_string(),
                        )
                    })
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::session::{Credentials, SessionToken};
    use chrono::{Duration, Utc};

    /// A gateway whose session manager already holds a valid token, with both
    /// services pointed at the mock server.
    pub(crate) async fn test_gateway(server: &mockito::ServerGuard) -> Gateway {
        let base = Url::parse(&server.url()).expect("server url");
        let session = SessionManager::new(
            Credentials::new("user@example.com", "hunter2"),
            base.clone(),
        )
        .expect("session manager");
        let now = Utc::now();
        session
            .install_token(SessionToken::new(
                "test-token".to_string(),
                now,
                now + Duration::hours(1),
            ))
            .await;
        Gateway::new(Arc::new(session), base.clone(), base).expect("gateway")
    }

    #[tokio::test]
    async fn it_returns_the_data_payload() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_body(r#"{"data":{"ping":"pong"}}"#)
            .create_async()
            .await;

        let gateway = test_gateway(&server).await;
        let data = gateway
            .execute(Service::Menu, "query Ping { ping }", "Ping", json!({}))
            .await
            .expect("data");
        assert_eq!(data, json!({"ping": "pong"}));
    }

    #[tokio::test]
    async fn http_401_is_classified_as_invalid_credentials() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(401)
            .create_async()
            .await;

        let gateway = test_gateway(&server).await;
        let error = gateway
            .execute(Service::Subscription, "query Q { q }", "Q", json!({}))
            .await
            .expect_err("must fail");
        assert!(matches!(error, GatewayError::InvalidCredentials));
    }

    #[tokio::test]
    async fn http_429_is_classified_as_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(429)
            .create_async()
            .await;

        let gateway = test_gateway(&server).await;
        let error = gateway
            .execute(Service::Menu, "query Q { q }", "Q", json!({}))
            .await
            .expect_err("must fail");
        assert!(matches!(error, GatewayError::RateLimited));
    }

    #[tokio::test]
    async fn other_http_failures_keep_their_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(500)
            .create_async()
            .await;

        let gateway = test_gateway(&server).await;
        let error = gateway
            .execute(Service::Menu, "query Q { q }", "Q", json!({}))
            .await
            .expect_err("must fail");
        assert!(matches!(
            error,
            GatewayError::Transport(StatusCode::INTERNAL_SERVER_ERROR)
        ));
    }

    #[tokio::test]
    async fn graphql_errors_are_joined() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                r#"{"data":null,"errors":[{"message":"first thing broke"},{"message":"second thing broke"}]}"#,
            )
            .create_async()
            .await;

        let gateway = test_gateway(&server).await;
        let error = gateway
            .execute(Service::Menu, "query Q { q }", "Q", json!({}))
            .await
            .expect_err("must fail");
        match error {
            GatewayError::GraphQl(message) => {
                assert_eq!(message, "first thing broke; second thing broke");
            }
            other => panic!("expected GraphQl error, got {other:?}"),
        }
    }
}
