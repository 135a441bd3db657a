//! Account session management: credentials, the cached bearer token, and the
//! three-step login handshake against the Mealdrop identity provider.

use chrono::{DateTime, Duration, Utc};
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use crate::errors::AuthError;

/// Identity provider used by the Mealdrop apps.
pub const DEFAULT_IDENTITY_URL: &str = "https://auth.mealdrop.com";

/// Public client identifier registered for the consumer apps.
const CLIENT_ID: &str = "wXg4LkzPq9vThbM2cRfD81yUjKoEnZ5a";
const REALM: &str = "Username-Password-Authentication";
const CREDENTIAL_TYPE: &str = "http://auth0.com/oauth/grant-type/password-realm";
const REDIRECT_URI: &str = "https://app.mealdrop.com/auth/callback";
const SCOPE: &str = "openid profile email offline_access";

/// The provider normally resolves in 2-3 hops; this only guards termination.
const MAX_REDIRECT_HOPS: usize = 10;

/// Tokens within this many seconds of expiry are treated as expired, guarding
/// against races with in-flight requests.
const EXPIRY_MARGIN_SECS: i64 = 60;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// The account credentials, supplied once at startup and held for the process
/// lifetime. Never persisted, never logged.
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// An opaque bearer token with its issuance and expiry instants. Replaced
/// wholesale by the next handshake, never mutated in place.
#[derive(Clone, Debug)]
pub struct SessionToken {
    access_token: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn new(
        access_token: String,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            issued_at,
            expires_at,
        }
    }

    /// Whether the token is still usable at `now`, i.e. strictly more than
    /// the safety margin before expiry.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS)
    }

    pub fn bearer(&self) -> &str {
        &self.access_token
    }
}

/// Owns the credentials and the single cached token, and runs the login
/// handshake when no valid token exists. One instance per process; renewal is
/// always lazy, triggered by the next caller.
pub struct SessionManager {
    credentials: Credentials,
    identity_url: Url,
    /// Redirects disabled and cookies enabled: the authorize chain is walked
    /// manually and the provider's session state lives in cookies set along
    /// the way.
    client: reqwest::Client,
    token: Mutex<Option<SessionToken>>,
}

impl SessionManager {
    pub fn new(credentials: Credentials, identity_url: Url) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .cookie_store(true)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            credentials,
            identity_url,
            client,
            token: Mutex::new(None),
        })
    }

    /// Return a valid bearer token, running the login handshake first if the
    /// cached token is missing or past its validity margin.
    ///
    /// The token slot lock is held across the handshake, so concurrent
    /// callers racing on an expired token trigger a single login.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref() {
            if token.is_valid_at(Utc::now()) {
                return Ok(token.bearer().to_string());
            }
            debug!("session token past validity margin, re-authenticating");
        }
        let token = self.login().await?;
        let bearer = token.bearer().to_string();
        *slot = Some(token);
        Ok(bearer)
    }

    /// The three-step handshake: login ticket, authorization code from the
    /// redirect chain, then the code-for-token exchange.
    async fn login(&self) -> Result<SessionToken, AuthError> {
        let ticket = self.fetch_login_ticket().await?;
        let code = self.fetch_authorization_code(&ticket).await?;
        let token = self.exchange_code(&code).await?;
        info!(
            issued_at = %token.issued_at,
            expires_at = %token.expires_at,
            "login handshake complete"
        );
        Ok(token)
    }

    async fn fetch_login_ticket(&self) -> Result<String, AuthError> {
        let endpoint = self.identity_url.join("/co/authenticate")?;
        let response = self
            .client
            .post(endpoint)
            .json(&json!({
                "client_id": CLIENT_ID,
                "username": self.credentials.email,
                "password": self.credentials.password.expose_secret(),
                "realm": REALM,
                "credential_type": CREDENTIAL_TYPE,
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::from_failure_parts(status, &body));
        }
        serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|json| {
                json.get("login_ticket")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .ok_or_else(|| AuthError("identity provider returned no login ticket".to_string()))
    }

    /// Walk the authorize redirect chain by hand, carrying cookies from hop
    /// to hop, until a hop's target URL carries a `code` query parameter.
    async fn fetch_authorization_code(&self, ticket: &str) -> Result<String, AuthError> {
        let mut next = self.identity_url.join("/authorize")?;
        next.query_pairs_mut()
            .append_pair("client_id", CLIENT_ID)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", REDIRECT_URI)
            .append_pair("scope", SCOPE)
            .append_pair("realm", REALM)
            .append_pair("login_ticket", ticket);

        let mut hops = 0;
        loop {
            if let Some(code) = authorization_code(&next) {
                return Ok(code);
            }
            if hops >= MAX_REDIRECT_HOPS {
                return Err(AuthError(format!(
                    "no authorization code after {MAX_REDIRECT_HOPS} redirects"
                )));
            }
            let response = self.client.get(next.clone()).send().await?;
            let status = response.status();
            if !status.is_redirection() {
                let body = response.text().await.unwrap_or_default();
                return Err(AuthError::from_failure_parts(status, &body));
            }
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| AuthError("redirect response without a Location".to_string()))?;
            // Locations may be relative; resolve against the current hop.
            next = next.join(location)?;
            hops += 1;
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<SessionToken, AuthError> {
        let endpoint = self.identity_url.join("/oauth/token")?;
        let response = self
            .client
            .post(endpoint)
            .json(&json!({
                "grant_type": "authorization_code",
                "client_id": CLIENT_ID,
                "code": code,
                "redirect_uri": REDIRECT_URI,
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::from_failure_parts(status, &body));
        }
        let json = serde_json::from_str::<Value>(&body)
            .map_err(|_| AuthError("token endpoint returned a non-JSON body".to_string()))?;
        let access_token = json
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| AuthError("token endpoint returned no access token".to_string()))?
            .to_string();
        let expires_in = json
            .get("expires_in")
            .and_then(Value::as_i64)
            .unwrap_or(3600);

        let now = Utc::now();
        Ok(SessionToken::new(
            access_token,
            now,
            now + Duration::seconds(expires_in),
        ))
    }

    #[cfg(test)]
    pub(crate) async fn install_token(&self, token: SessionToken) {
        *self.token.lock().await = Some(token);
    }
}

impl From<url::ParseError> for AuthError {
    fn from(error: url::ParseError) -> Self {
        Self(error.to_string())
    }
}

fn authorization_code(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
}
