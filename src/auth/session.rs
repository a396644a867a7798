//! Session lifecycle management.
//!
//! `SessionManager` owns the credential pair and everything that moves it:
//! login, token refresh, startup initialization, and logout. It also owns
//! the auth-event broadcast channel and the optional navigator used to
//! route the user back to the login view when recovery fails.
//!
//! The session is authenticated only while both tokens are stored; a
//! one-sided pair is resolved during `initialize` (one refresh attempt, or
//! clearing both).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::auth::claims::{decode_claims, Role};
use crate::auth::store::{TokenKind, TokenStore};
use crate::config::Config;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Broadcast channel capacity for auth events.
/// Sign-in/sign-out transitions are rare; 16 covers slow subscribers.
const AUTH_EVENT_CAPACITY: usize = 16;

/// Authentication state derived from the stored credential pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated { role: Role },
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            SessionState::Authenticated { role } => Some(*role),
            SessionState::Unauthenticated => None,
        }
    }
}

/// Session transitions broadcast to interested subscribers.
///
/// Events carry no payload; receivers re-read [`SessionManager::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
}

/// Host-supplied navigation capability.
///
/// Invoked when an unrecoverable authentication failure ends the session;
/// the host decides what routing to the login view means for its UI.
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self);
}

#[derive(Error, Debug)]
pub enum LoginError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Login rejected with status {0}")]
    Rejected(reqwest::StatusCode),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed login response: {0}")]
    MalformedResponse(String),
}

#[derive(Error, Debug)]
enum RefreshError {
    #[error("Refresh rejected with status {0}")]
    Rejected(reqwest::StatusCode),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed refresh response: {0}")]
    MalformedResponse(String),
}

type SharedRefresh = Shared<BoxFuture<'static, bool>>;

/// Owns the credential pair, the derived session state, and the auth event
/// channel. Shared across tasks behind an `Arc`.
pub struct SessionManager {
    http: Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
    state: RwLock<SessionState>,
    events: broadcast::Sender<AuthEvent>,
    navigator: Option<Arc<dyn Navigator>>,
    // In-flight refresh shared by concurrent callers, keyed on the refresh
    // token that started it
    refresh_gate: Mutex<Option<(String, SharedRefresh)>>,
}

impl SessionManager {
    /// Create a session manager against the given API base URL.
    pub fn new(base_url: impl Into<String>, store: Arc<dyn TokenStore>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
            state: RwLock::new(SessionState::Unauthenticated),
            events,
            navigator: None,
            refresh_gate: Mutex::new(None),
        })
    }

    /// Create a session manager from the loaded configuration
    pub fn from_config(config: &Config, store: Arc<dyn TokenStore>) -> Result<Self> {
        Self::new(config.base_url(), store)
    }

    /// Attach a navigation capability for login redirects
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Subscribe to sign-in/sign-out events
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Stored access token, if any.
    /// Empty strings count as absent; an interrupted writer can leave one.
    pub fn access_token(&self) -> Option<String> {
        self.stored(TokenKind::Access)
    }

    fn stored(&self, kind: TokenKind) -> Option<String> {
        self.store.get(kind).filter(|token| !token.is_empty())
    }

    pub(crate) fn http_client(&self) -> &Client {
        &self.http
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    // ===== Login =====

    /// Authenticate with username and password.
    ///
    /// On success both tokens are stored, the role is resolved, and a
    /// `SignedIn` event is broadcast. On failure the store is untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionState, LoginError> {
        let url = format!("{}/api/token/", self.base_url);
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });

        let response = self.http.post(&url).json(&body).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(LoginError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(LoginError::Rejected(status));
        }

        let pair: TokenPairResponse = response
            .json()
            .await
            .map_err(|e| LoginError::MalformedResponse(e.to_string()))?;

        self.store.set(TokenKind::Access, &pair.access);
        self.store.set(TokenKind::Refresh, &pair.refresh);

        let role = self.resolve_role(&pair.access).await;
        let state = SessionState::Authenticated { role };
        *self.state.write() = state;
        let _ = self.events.send(AuthEvent::SignedIn);
        debug!(username, "Signed in");
        Ok(state)
    }

    // ===== Refresh =====

    /// Exchange the refresh token for a new access token.
    ///
    /// Returns true when the store now holds a fresh access token. Returns
    /// false, with the store untouched, when no refresh token exists or the
    /// exchange fails; the caller decides whether to tear the session down.
    ///
    /// Concurrent callers holding the same refresh token share one upstream
    /// request instead of issuing one each.
    pub async fn refresh(&self) -> bool {
        let Some(refresh_token) = self.stored(TokenKind::Refresh) else {
            debug!("No refresh token stored, skipping refresh");
            return false;
        };

        let flight = {
            let mut gate = self.refresh_gate.lock();
            match gate.as_ref() {
                Some((token, flight)) if *token == refresh_token => flight.clone(),
                _ => {
                    let flight = Self::start_refresh_flight(
                        self.http.clone(),
                        self.base_url.clone(),
                        Arc::clone(&self.store),
                        refresh_token.clone(),
                    );
                    *gate = Some((refresh_token.clone(), flight.clone()));
                    flight
                }
            }
        };

        let renewed = flight.clone().await;

        // Retire the completed flight so the next expiry starts a new one
        let mut gate = self.refresh_gate.lock();
        if let Some((_, existing)) = gate.as_ref() {
            if existing.ptr_eq(&flight) {
                *gate = None;
            }
        }

        renewed
    }

    /// Build the shared future for one refresh exchange. Captures owned
    /// handles so waiters can outlive the call that started the flight.
    fn start_refresh_flight(
        http: Client,
        base_url: String,
        store: Arc<dyn TokenStore>,
        refresh_token: String,
    ) -> SharedRefresh {
        async move {
            match Self::perform_refresh(&http, &base_url, &refresh_token).await {
                Ok(access) => {
                    store.set(TokenKind::Access, &access);
                    debug!("Access token refreshed");
                    true
                }
                Err(e) => {
                    warn!(error = %e, "Token refresh failed");
                    false
                }
            }
        }
        .boxed()
        .shared()
    }

    async fn perform_refresh(
        http: &Client,
        base_url: &str,
        refresh_token: &str,
    ) -> Result<String, RefreshError> {
        let url = format!("{}/api/token/refresh/", base_url);
        let body = serde_json::json!({ "refresh": refresh_token });

        let response = http.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Rejected(status));
        }

        let parsed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| RefreshError::MalformedResponse(e.to_string()))?;

        Ok(parsed.access)
    }

    // ===== Initialization =====

    /// Rebuild the session state from stored credentials.
    ///
    /// Called at startup, and again whenever the host observes an auth
    /// event. Resolves half-states: a refresh-only pair gets one refresh
    /// attempt, an access-only pair is cleared outright. Success paths stay
    /// quiet; only a failed refresh triggers the teardown broadcast.
    pub async fn initialize(&self) -> SessionState {
        let access = self.stored(TokenKind::Access);
        let refresh = self.stored(TokenKind::Refresh);

        let state = match (access, refresh) {
            (None, None) => SessionState::Unauthenticated,
            (Some(_), None) => {
                // Without a refresh token the pair can never recover from
                // expiry, so drop it now rather than fail later
                self.store.clear_all();
                SessionState::Unauthenticated
            }
            (None, Some(_)) => {
                if self.refresh().await {
                    self.authenticated_state().await
                } else {
                    self.teardown();
                    SessionState::Unauthenticated
                }
            }
            (Some(access), Some(_)) => {
                let usable = match decode_claims(&access) {
                    Ok(claims) => claims.is_valid_now(),
                    Err(_) => false,
                };
                if usable {
                    self.authenticated_state_for(&access).await
                } else if self.refresh().await {
                    self.authenticated_state().await
                } else {
                    self.teardown();
                    SessionState::Unauthenticated
                }
            }
        };

        *self.state.write() = state;
        state
    }

    async fn authenticated_state(&self) -> SessionState {
        match self.access_token() {
            Some(access) => self.authenticated_state_for(&access).await,
            // A concurrent teardown emptied the store between refresh and here
            None => SessionState::Unauthenticated,
        }
    }

    async fn authenticated_state_for(&self, access: &str) -> SessionState {
        let role = self.resolve_role(access).await;
        SessionState::Authenticated { role }
    }

    // ===== Role resolution =====

    async fn resolve_role(&self, access: &str) -> Role {
        match decode_claims(access) {
            Ok(claims) => match claims.role_hint() {
                Some(role) => role,
                None => self.resolve_role_by_probe().await,
            },
            Err(e) => {
                warn!(error = %e, "Could not decode access token for role");
                self.resolve_role_by_probe().await
            }
        }
    }

    /// Determine the role by asking the server.
    ///
    /// Stand-in for a first-class role field on the user endpoint: fetch the
    /// current user, then probe the admin-only activity log listing. A 200
    /// from the probe means admin; anything else means contributor. Only
    /// reached when the token claims carry no recognized role field.
    pub async fn resolve_role_by_probe(&self) -> Role {
        // The identity call's body does not decide the role; the probe's
        // status does
        if let Err(e) = self.bearer_get("/api/users/me/").await {
            warn!(error = %e, "Current-user lookup failed during role resolution");
        }

        match self.bearer_get("/api/activity-logs/").await {
            Ok(status) if status.is_success() => Role::Admin,
            Ok(_) => Role::Contributor,
            Err(e) => {
                warn!(error = %e, "Role probe failed, assuming contributor");
                Role::Contributor
            }
        }
    }

    /// Fire a bare authenticated GET and report only the status
    async fn bearer_get(&self, path: &str) -> Result<reqwest::StatusCode, reqwest::Error> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.get(&url);
        if let Some(token) = self.access_token() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        Ok(response.status())
    }

    // ===== Teardown =====

    /// End the session: clear both tokens, broadcast a sign-out, and route
    /// to the login view. Safe to call repeatedly.
    pub fn logout(&self) {
        self.teardown();
    }

    /// Clear credentials and notify the application. Shared by `logout` and
    /// the request path that hits an unrecoverable authentication failure.
    pub(crate) fn teardown(&self) {
        self.store.clear_all();
        *self.state.write() = SessionState::Unauthenticated;
        let _ = self.events.send(AuthEvent::SignedOut);
        if let Some(ref navigator) = self.navigator {
            navigator.redirect_to_login();
        }
        debug!("Session ended");
    }
}

// Internal API response types for parsing

#[derive(Debug, Deserialize)]
struct TokenPairResponse {
    access: String,
    refresh: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}
