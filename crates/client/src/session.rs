//! Authenticated session management.
//!
//! [`AuthSession`] owns the session lifecycle against the backend: login,
//! logout, token refresh, and the transparent retry of requests that fail
//! with 401. Refresh is single-flight: the coordinator state lives behind an
//! async mutex whose guard spans the refresh network call, so concurrent
//! callers queue on the lock and are then served from the cooldown window
//! without issuing a second call.

use crate::client::ApiClient;
use crate::config::RefreshConfig;
use crate::error::ClientError;
use crate::types::{LoginRequest, LogoutRequest, RefreshRequest, TokenResponse, paths};
use bookswap_core::{
    AuthEvent, AuthEventBus, MemorySessionStore, Session, SessionStore, UserInfo,
};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Authenticated session manager.
///
/// Cheap to clone; all clones share the same store, event bus, and refresh
/// coordinator. Create one per application and hand out clones.
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    client: ApiClient,
    store: Arc<dyn SessionStore>,
    events: AuthEventBus,
    config: RefreshConfig,
    refresh_guard: Mutex<RefreshState>,
}

#[derive(Default)]
struct RefreshState {
    /// Completion instant of the most recent refresh attempt, successful or not
    last_attempt: Option<Instant>,
}

impl AuthSession {
    /// Create a new session builder
    pub fn builder() -> AuthSessionBuilder {
        AuthSessionBuilder::default()
    }

    /// The auth event bus shared by this session
    pub fn events(&self) -> &AuthEventBus {
        &self.inner.events
    }

    /// The underlying API client
    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    /// The refresh timing configuration
    pub fn config(&self) -> &RefreshConfig {
        &self.inner.config
    }

    /// Load the current session, if any
    pub async fn current_session(&self) -> Result<Option<Session>, ClientError> {
        Ok(self.inner.store.load().await?)
    }

    /// The current access token, if a session exists
    pub async fn access_token(&self) -> Result<Option<String>, ClientError> {
        Ok(self.current_session().await?.map(|s| s.access_token))
    }

    /// The cached user profile, if any
    pub async fn current_user(&self) -> Result<Option<UserInfo>, ClientError> {
        Ok(self.current_session().await?.and_then(|s| s.user))
    }

    /// Whether a session is present
    pub async fn is_authenticated(&self) -> Result<bool, ClientError> {
        Ok(self.current_session().await?.is_some())
    }

    /// Whether the current session belongs to an administrator
    pub async fn is_admin(&self) -> Result<bool, ClientError> {
        Ok(self
            .current_session()
            .await?
            .is_some_and(|s| s.is_admin))
    }

    /// Authenticate with username and password.
    ///
    /// On success the session is persisted and [`AuthEvent::LoggedIn`] is
    /// emitted. Returns the user profile when the backend includes one.
    pub async fn login(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Option<UserInfo>, ClientError> {
        let request = self
            .inner
            .client
            .request(Method::POST, paths::TOKEN)
            .json(&LoginRequest {
                username: username.into(),
                password: password.into(),
            });
        let tokens: TokenResponse = self.inner.client.execute(request).await?;

        if !tokens.authenticated {
            return Err(ClientError::AuthenticationFailed(
                "login was not accepted".to_string(),
            ));
        }

        let session = Session::from_tokens(
            tokens.access_token,
            tokens.refresh_token,
            tokens.expires_in,
            tokens.user_info,
        );
        let user = session.user.clone();
        self.inner.store.save(&session).await?;
        self.inner
            .events
            .emit(AuthEvent::LoggedIn { user: user.clone() });
        tracing::info!("login succeeded");
        Ok(user)
    }

    /// End the session.
    ///
    /// The backend logout call revokes the refresh token and is best effort;
    /// local state clears and [`AuthEvent::LoggedOut`] fires even when the
    /// network call fails.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let Some(session) = self.inner.store.load().await? else {
            return Ok(());
        };

        let request = self
            .inner
            .client
            .request(Method::POST, paths::LOGOUT)
            .json(&LogoutRequest {
                token: session.refresh_token.clone(),
            });
        if let Err(err) = self.inner.client.execute_unit(request).await {
            tracing::warn!(error = %err, "logout request failed");
        }

        self.inner.store.clear().await?;
        self.inner.events.emit(AuthEvent::LoggedOut);
        tracing::info!("logged out");
        Ok(())
    }

    /// Fetch the user profile and update the cached session.
    ///
    /// Emits [`AuthEvent::UserUpdated`] so navigation shells can re-render.
    pub async fn my_info(&self) -> Result<UserInfo, ClientError> {
        if !self.is_authenticated().await? {
            return Err(ClientError::NotAuthenticated);
        }

        let user: UserInfo = self.get(paths::MY_INFO).await?;

        if let Some(mut session) = self.inner.store.load().await? {
            session.is_admin = user.has_admin_role();
            session.user = Some(user.clone());
            self.inner.store.save(&session).await?;
        }
        self.inner
            .events
            .emit(AuthEvent::UserUpdated { user: user.clone() });
        Ok(user)
    }

    /// Refresh the access token.
    ///
    /// Single-flight: at most one network call to the refresh endpoint is in
    /// flight at any time; concurrent callers observe the same outcome.
    ///
    /// - `Ok(Some(token))` — refreshed, or served from the cooldown window
    /// - `Ok(None)` — the session is unrecoverable (no stored refresh token,
    ///   or the refresh endpoint rejected it); the store has been cleared and
    ///   [`AuthEvent::SessionExpired`] emitted where a session existed
    /// - `Err(_)` — transient failure; the session is preserved
    pub async fn refresh(&self) -> Result<Option<String>, ClientError> {
        let mut state = self.inner.refresh_guard.lock().await;

        if let Some(last) = state.last_attempt {
            if last.elapsed() < self.inner.config.cooldown {
                tracing::debug!("refresh within cooldown, serving stored token");
                let session = self.inner.store.load().await?;
                return Ok(session.map(|s| s.access_token));
            }
        }

        let Some(current) = self.inner.store.load().await? else {
            tracing::warn!("refresh requested without a stored session");
            state.last_attempt = Some(Instant::now());
            return Ok(None);
        };

        // The refresh call authenticates with the refresh token in the body,
        // never with a bearer header.
        let request = self
            .inner
            .client
            .request(Method::POST, paths::REFRESH)
            .json(&RefreshRequest {
                token: current.refresh_token.clone(),
            });
        let result = self.inner.client.execute::<TokenResponse>(request).await;
        state.last_attempt = Some(Instant::now());

        match result {
            Ok(tokens) => {
                let user = tokens.user_info.or(current.user);
                let session = Session::from_tokens(
                    tokens.access_token,
                    tokens.refresh_token,
                    tokens.expires_in,
                    user,
                );
                let access = session.access_token.clone();
                self.inner.store.save(&session).await?;
                self.inner.events.emit(AuthEvent::TokenRefreshed);
                tracing::debug!("token refresh succeeded");
                Ok(Some(access))
            }
            Err(err) if err.is_unauthorized() => {
                tracing::warn!("refresh token rejected, ending session");
                self.expire("refresh token rejected").await?;
                Ok(None)
            }
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed transiently");
                Err(err)
            }
        }
    }

    /// Execute a request with bearer attachment and 401 retry.
    ///
    /// Auth endpoints are sent without credentials and never retried. Other
    /// requests carry the current access token; a 401 triggers one refresh
    /// and one replay with the new token.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let mut request = request.build()?;
        let auth_endpoint = paths::is_auth_endpoint(request.url().path());

        if auth_endpoint {
            // Never send a possibly-expired access token to the auth endpoints
            request.headers_mut().remove(AUTHORIZATION);
        } else if let Some(token) = self.access_token().await? {
            insert_bearer(&mut request, &token)?;
        }

        let retry = if auth_endpoint {
            None
        } else {
            request.try_clone()
        };

        match self.inner.client.execute_request(request).await {
            Err(err) if err.is_unauthorized() && !auth_endpoint => {
                self.retry_unauthorized(err, retry).await
            }
            other => other,
        }
    }

    /// Create an uncredentialed request builder for this session's backend
    pub fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.inner.client.request(method, path)
    }

    /// Authenticated GET
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(self.request(Method::GET, path)).await
    }

    /// Authenticated POST with a JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.execute(self.request(Method::POST, path).json(body)).await
    }

    /// Authenticated PUT with a JSON body
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.execute(self.request(Method::PUT, path).json(body)).await
    }

    /// Authenticated DELETE
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(self.request(Method::DELETE, path)).await
    }

    async fn retry_unauthorized<T: DeserializeOwned>(
        &self,
        original: ClientError,
        retry: Option<reqwest::Request>,
    ) -> Result<T, ClientError> {
        match self.refresh().await {
            Ok(Some(token)) => {
                let Some(mut request) = retry else {
                    // Body could not be cloned for a replay
                    return Err(original);
                };
                insert_bearer(&mut request, &token)?;
                tracing::debug!(path = %request.url().path(), "replaying request after refresh");
                self.inner.client.execute_request(request).await
            }
            Ok(None) => Err(ClientError::SessionExpired(
                "authentication required".to_string(),
            )),
            Err(refresh_err) => {
                tracing::debug!(error = %refresh_err, "refresh failed, propagating original error");
                Err(original)
            }
        }
    }

    /// Clear the session and announce that it expired
    async fn expire(&self, reason: &str) -> Result<(), ClientError> {
        self.inner.store.clear().await?;
        self.inner.events.emit(AuthEvent::SessionExpired {
            reason: reason.to_string(),
        });
        Ok(())
    }
}

fn insert_bearer(request: &mut reqwest::Request, token: &str) -> Result<(), ClientError> {
    let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
        ClientError::Configuration("access token contains invalid header characters".into())
    })?;
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(())
}

/// Builder for [`AuthSession`]
#[derive(Default)]
pub struct AuthSessionBuilder {
    client: Option<ApiClient>,
    store: Option<Arc<dyn SessionStore>>,
    events: Option<AuthEventBus>,
    config: Option<RefreshConfig>,
}

impl AuthSessionBuilder {
    /// Set the API client (required)
    pub fn client(mut self, client: ApiClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the session store; defaults to an in-memory store
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the event bus; defaults to a fresh bus
    pub fn events(mut self, events: AuthEventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Set the refresh timing configuration
    pub fn config(mut self, config: RefreshConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the session manager
    pub fn build(self) -> Result<AuthSession, ClientError> {
        let client = self
            .client
            .ok_or_else(|| ClientError::Configuration("client is required".into()))?;

        Ok(AuthSession {
            inner: Arc::new(SessionInner {
                client,
                store: self
                    .store
                    .unwrap_or_else(|| Arc::new(MemorySessionStore::new())),
                events: self.events.unwrap_or_default(),
                config: self.config.unwrap_or_default(),
                refresh_guard: Mutex::new(RefreshState::default()),
            }),
        })
    }
}
