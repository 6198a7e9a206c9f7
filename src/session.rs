//! Process-wide session state.
//!
//! One [`SessionContext`] per app. It owns the answer to "who is logged in",
//! derives it from the [`TokenStore`], and publishes every change through a
//! `watch` channel so views can re-render.

use std::sync::Arc;

use tokio::sync::watch;

use crate::api::{AuthApi, ProfileUpdate};
use crate::client::{ReqwestTransport, Transport};
use crate::error::Error;
use crate::store::TokenStore;
use crate::types::{AuthTokens, AuthUser};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Not derived yet (startup, or a profile fetch in flight).
    Loading,
    Anonymous,
    Authenticated(AuthUser),
}

impl SessionState {
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

pub struct SessionContext<T: Transport = ReqwestTransport> {
    api: AuthApi<T>,
    state: Arc<watch::Sender<SessionState>>,
}

impl<T: Transport> Clone for SessionContext<T> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            state: self.state.clone(),
        }
    }
}

impl<T: Transport> SessionContext<T> {
    /// Starts in [`SessionState::Loading`]; call [`check_auth`](Self::check_auth)
    /// (or [`on_route_change`](Self::on_route_change)) to settle it.
    #[must_use]
    pub fn new(api: AuthApi<T>) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self {
            api,
            state: Arc::new(state),
        }
    }

    #[must_use]
    pub fn api(&self) -> &AuthApi<T> {
        &self.api
    }

    fn store(&self) -> &Arc<TokenStore> {
        self.api.client().store()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.state.borrow().is_logged_in()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    #[must_use]
    pub fn user(&self) -> Option<AuthUser> {
        self.state.borrow().user().cloned()
    }

    /// Cached user, read synchronously (cookie copy, then storage copy).
    #[must_use]
    pub fn get_auth_user(&self) -> Option<AuthUser> {
        self.store().cached_user()
    }

    /// Re-derive the session after navigation.
    pub async fn on_route_change(&self, path: &str) {
        tracing::debug!(path, "Route changed, re-deriving session");
        self.check_auth().await;
    }

    /// Derive the state from the token store, fetching the profile only when
    /// a token exists but no user is cached.
    pub async fn check_auth(&self) -> SessionState {
        if !self.store().is_authenticated() {
            self.publish(SessionState::Anonymous);
            return SessionState::Anonymous;
        }

        if let Some(user) = self.store().cached_user() {
            let state = SessionState::Authenticated(user);
            self.publish(state.clone());
            return state;
        }

        self.publish(SessionState::Loading);
        match self.api.profile().await {
            Ok(user) => {
                self.store().cache_user(&user);
                let state = SessionState::Authenticated(user);
                self.publish(state.clone());
                state
            }
            Err(Error::SessionExpired) => {
                self.publish(SessionState::Anonymous);
                SessionState::Anonymous
            }
            Err(e) => {
                // The token is kept and the route gate still admits the user,
                // so the session stays unresolved until the next check.
                tracing::warn!(error = %e, "Profile fetch failed during auth check");
                SessionState::Loading
            }
        }
    }

    /// Adopt a freshly minted session. No backend call.
    pub fn login_success(&self, tokens: &AuthTokens, user: AuthUser) {
        self.store().set_auth_tokens(tokens);
        tracing::info!(user_id = %user.id, "Session established");
        self.adopt_user(user);
    }

    /// Best-effort backend logout, then unconditional local teardown and a
    /// redirect to the login route.
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            tracing::warn!(error = %e, "Backend logout failed, clearing local session anyway");
        }
        let store = self.store();
        store.clear_auth_tokens();
        store.clear_refresh_token();
        store.clear_user();
        self.publish(SessionState::Anonymous);
        tracing::info!("Logged out");

        let client = self.api.client();
        client.navigator().navigate(&client.config().routes().login);
    }

    /// Re-fetch the profile and replace the cached user.
    pub async fn refresh_user(&self) -> Result<AuthUser, Error> {
        let user = self.settle(self.api.profile().await)?;
        self.adopt_user(user.clone());
        Ok(user)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<AuthUser, Error> {
        let user = self.settle(self.api.update_profile(update).await)?;
        self.adopt_user(user.clone());
        Ok(user)
    }

    /// Turn MFA on; returns the backup codes to show once.
    pub async fn enable_mfa(&self, code: &str) -> Result<Vec<String>, Error> {
        let enabled = self.settle(self.api.enable_mfa(code).await)?;
        match enabled.user {
            Some(user) => self.adopt_user(user),
            None => {
                self.refresh_user().await?;
            }
        }
        Ok(enabled.backup_codes)
    }

    pub async fn disable_mfa(&self, code: &str) -> Result<AuthUser, Error> {
        self.settle(self.api.disable_mfa(code).await)?;
        self.refresh_user().await
    }

    fn adopt_user(&self, user: AuthUser) {
        self.store().cache_user(&user);
        self.publish(SessionState::Authenticated(user));
    }

    /// The interceptor already tore the session down; mirror that here.
    fn settle<R>(&self, result: Result<R, Error>) -> Result<R, Error> {
        if matches!(result, Err(Error::SessionExpired)) {
            self.publish(SessionState::Anonymous);
        }
        result
    }

    fn publish(&self, state: SessionState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}
