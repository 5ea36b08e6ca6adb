//! Session management for the tado° API.
//!
//! - OAuth2 password grant on login, refresh-token grant on demand.
//! - Two request shapes selected by [`AuthFlow`]: the legacy web-app flow (username and
//!   password only) and the client-secret flow against `auth.tado.com`.
//! - The home id is resolved once per login from the first entry of `GET me` `homes`.
//! - Each [`Session`] owns its header map; nothing is shared between sessions.

use core::fmt;
use core::str::FromStr;
use http::header::{AUTHORIZATION, REFERER};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use log::{debug, info};
use serde_json::Value;
use std::error::Error;
use std::time::{Duration, Instant};

use crate::client::{self, ApiError, paths};
use crate::models::tado::{HomeId, User};
use crate::transport::{HttpRequest, HttpResponse, RequestBody, Transport, TransportError};
use crate::utils::decode;

pub const REFERER_URL: &str = "https://my.tado.com/";
pub const OAUTH_SCOPE: &str = "home.user";

pub const LEGACY_TOKEN_URL: &str = "https://my.tado.com/oauth/token";
pub const LEGACY_CLIENT_ID: &str = "tado-webapp";
pub const CLIENT_SECRET_TOKEN_URL: &str = "https://auth.tado.com/oauth/token";
pub const CLIENT_SECRET_CLIENT_ID: &str = "tado-web-app";

#[derive(Debug)]
pub enum AuthError {
    Transport(TransportError),
    Http { status: StatusCode, body: String },
    Json(serde_json::Error),
    /// Client-secret flow selected but the credentials carry no secret
    MissingClientSecret,
    /// Refresh requested on a session without a token
    NotLoggedIn,
    /// Access token cannot be used as a header value
    InvalidToken,
    /// Profile lookup after the token exchange failed
    Profile(ApiError),
    /// Profile lists no home with an id
    NoHomes,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Transport(e) => write!(f, "auth {}", e),
            AuthError::Http { status, body } => write!(f, "auth http {}: {}", status.as_u16(), body),
            AuthError::Json(e) => write!(f, "malformed auth response: {}", e),
            AuthError::MissingClientSecret => write!(f, "client-secret flow requires a client secret"),
            AuthError::NotLoggedIn => write!(f, "session holds no token to refresh"),
            AuthError::InvalidToken => write!(f, "access token is not a valid header value"),
            AuthError::Profile(e) => write!(f, "profile lookup failed: {}", e),
            AuthError::NoHomes => write!(f, "account has no homes"),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AuthError::Transport(e) => Some(e),
            AuthError::Json(e) => Some(e),
            AuthError::Profile(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    password: String,
    client_secret: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
            client_secret: None,
        }
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum AuthFlow {
    /// `my.tado.com/oauth/token`, username and password only
    #[default]
    Legacy,
    /// `auth.tado.com/oauth/token`, additionally sends the client secret
    ClientSecret,
}

impl AuthFlow {
    pub fn endpoint(self) -> AuthEndpoint {
        match self {
            AuthFlow::Legacy => AuthEndpoint {
                flow: self,
                token_url: LEGACY_TOKEN_URL.to_string(),
                client_id: LEGACY_CLIENT_ID.to_string(),
            },
            AuthFlow::ClientSecret => AuthEndpoint {
                flow: self,
                token_url: CLIENT_SECRET_TOKEN_URL.to_string(),
                client_id: CLIENT_SECRET_CLIENT_ID.to_string(),
            },
        }
    }
}

impl FromStr for AuthFlow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(AuthFlow::Legacy),
            "client-secret" | "client_secret" => Ok(AuthFlow::ClientSecret),
            other => Err(format!("unknown auth flow {:?} (expected legacy or client-secret)", other)),
        }
    }
}

impl fmt::Display for AuthFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFlow::Legacy => f.write_str("legacy"),
            AuthFlow::ClientSecret => f.write_str("client-secret"),
        }
    }
}

/// Where and as whom the token exchange happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEndpoint {
    pub flow: AuthFlow,
    pub token_url: String,
    pub client_id: String,
}

#[derive(Clone)]
struct Token {
    refresh_token: String,
    expires_at: Option<Instant>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TokenState {
    Missing,
    Expired,
    Valid,
}

pub struct Session {
    credentials: Credentials,
    flow: AuthFlow,
    token: Option<Token>,
    home_id: Option<HomeId>,
    headers: HeaderMap,
}

impl Session {
    fn new(credentials: Credentials, flow: AuthFlow) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(REFERER_URL));
        Session {
            credentials,
            flow,
            token: None,
            home_id: None,
            headers,
        }
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    pub fn flow(&self) -> AuthFlow {
        self.flow
    }

    pub fn home_id(&self) -> Option<HomeId> {
        self.home_id
    }

    /// Headers sent with every resource request: `Referer` and, once logged in, `Authorization`.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn token_state(&self) -> TokenState {
        self.token_state_at(Instant::now())
    }

    fn token_state_at(&self, now: Instant) -> TokenState {
        match &self.token {
            None => TokenState::Missing,
            Some(Token {
                expires_at: Some(at), ..
            }) if now >= *at => TokenState::Expired,
            Some(_) => TokenState::Valid,
        }
    }

    /// True when the token is gone, expired, or expires within `margin`.
    pub fn expires_within(&self, margin: Duration) -> bool {
        self.token_state_at(Instant::now() + margin) != TokenState::Valid
    }

    /// Forget the tokens. Later requests fail with a missing-token error.
    pub fn clear_token(&mut self) {
        self.token = None;
        let _ = self.headers.remove(AUTHORIZATION);
    }

    fn install(&mut self, grant: TokenGrant) -> Result<(), AuthError> {
        let mut bearer =
            HeaderValue::from_str(&format!("Bearer {}", grant.access_token)).map_err(|_| AuthError::InvalidToken)?;
        bearer.set_sensitive(true);
        let _ = self.headers.insert(AUTHORIZATION, bearer);
        self.token = Some(Token {
            refresh_token: grant.refresh_token,
            expires_at: grant.expires_in.map(|secs| Instant::now() + Duration::from_secs(secs)),
        });
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.credentials.username)
            .field("flow", &self.flow)
            .field("home_id", &self.home_id)
            .field("token", &self.token_state())
            .finish()
    }
}

#[derive(serde::Deserialize)]
struct TokenGrant {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Performs token exchanges and owns the transport shared with the resource client.
pub struct SessionManager<T: Transport> {
    transport: T,
    endpoint: AuthEndpoint,
    api_url: String,
}

impl<T: Transport> SessionManager<T> {
    pub fn new(transport: T, endpoint: AuthEndpoint, api_url: impl Into<String>) -> Self {
        SessionManager {
            transport,
            endpoint,
            api_url: api_url.into(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Password grant, then resolve the home id from the profile.
    pub fn login(&self, credentials: Credentials) -> Result<Session, AuthError> {
        let mut session = Session::new(credentials, self.endpoint.flow);

        let mut form = self.base_form(&session.credentials, "password")?;
        form.push(("password", session.credentials.password.clone()));
        form.push(("username", session.credentials.username.clone()));
        let grant = self.exchange(form)?;
        session.install(grant)?;

        let profile = client::dispatch(&self.transport, &self.api_url, &session, Method::GET, paths::ME, None, None)
            .map_err(AuthError::Profile)?
            .unwrap_or_default();
        let home_id = first_home(profile)?;
        session.home_id = Some(home_id);

        info!(
            "Logged in as {} via {} flow (home {})",
            session.username(),
            session.flow(),
            home_id
        );
        Ok(session)
    }

    /// Exchange the refresh token for a new pair. The home id is left untouched.
    pub fn refresh(&self, session: &mut Session) -> Result<(), AuthError> {
        let refresh_token = session
            .token
            .as_ref()
            .map(|t| t.refresh_token.clone())
            .ok_or(AuthError::NotLoggedIn)?;

        let mut form = self.base_form(&session.credentials, "refresh_token")?;
        form.push(("refresh_token", refresh_token));
        let grant = self.exchange(form)?;
        session.install(grant)?;
        info!("Refreshed access token for {}", session.username());
        Ok(())
    }

    fn base_form(&self, credentials: &Credentials, grant_type: &str) -> Result<Vec<(&'static str, String)>, AuthError> {
        let mut form = vec![
            ("client_id", self.endpoint.client_id.clone()),
            ("grant_type", grant_type.to_string()),
            ("scope", OAUTH_SCOPE.to_string()),
        ];
        if self.endpoint.flow == AuthFlow::ClientSecret {
            let secret = credentials.client_secret.clone().ok_or(AuthError::MissingClientSecret)?;
            form.push(("client_secret", secret));
        }
        Ok(form)
    }

    fn exchange(&self, form: Vec<(&'static str, String)>) -> Result<TokenGrant, AuthError> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(REFERER_URL));
        let request = HttpRequest {
            method: Method::POST,
            url: self.endpoint.token_url.clone(),
            headers,
            body: RequestBody::Form(form),
        };
        debug!("POST {} ({} flow)", self.endpoint.token_url, self.endpoint.flow);
        let response = self.transport.send(&request).map_err(AuthError::Transport)?;
        parse_token_response(response)
    }
}

fn parse_token_response(response: HttpResponse) -> Result<TokenGrant, AuthError> {
    if !response.status.is_success() {
        return Err(AuthError::Http {
            status: response.status,
            body: response.body_text(),
        });
    }
    serde_json::from_slice(&response.body).map_err(AuthError::Json)
}

fn first_home(profile: Value) -> Result<HomeId, AuthError> {
    let user: User = decode(profile).map_err(|e| AuthError::Json(e.into_inner()))?;
    user.homes
        .unwrap_or_default()
        .first()
        .and_then(|home| home.id)
        .ok_or(AuthError::NoHomes)
}
