//! API client with the credential interceptor.
//!
//! Every request gets the bearer token and the cookie jar attached. A 401 on
//! an ordinary request triggers one refresh (shared with any concurrent 401s)
//! and one retry; if that is impossible the local session is torn down and the
//! navigator is pointed at the login route.

mod refresh;
mod transport;

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, COOKIE, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};

use self::refresh::{RefreshCoordinator, Settled};
use crate::api::{self, TokenGrant};
use crate::config::ClientConfig;
use crate::envelope;
use crate::error::Error;
use crate::navigator::{Navigator, NullNavigator};
use crate::secret::SecretString;
use crate::store::TokenStore;

/// HTTP client for the Spaces backend.
///
/// Cheap to clone; clones share the token store and the refresh coordinator.
pub struct ApiClient<T: Transport = ReqwestTransport> {
    config: Arc<ClientConfig>,
    transport: Arc<T>,
    store: Arc<TokenStore>,
    refresh: Arc<RefreshCoordinator>,
    navigator: Arc<dyn Navigator>,
}

// Manual Clone: avoid derive adding a `T: Clone` bound.
impl<T: Transport> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            transport: self.transport.clone(),
            store: self.store.clone(),
            refresh: self.refresh.clone(),
            navigator: self.navigator.clone(),
        }
    }
}

impl ApiClient<ReqwestTransport> {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, ReqwestTransport::new())
    }
}

impl<T: Transport> ApiClient<T> {
    /// Client over a custom transport, with an in-memory token store.
    #[must_use]
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let store = TokenStore::in_memory().with_secure_cookies(config.secure_cookies);
        Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
            store: Arc::new(store),
            refresh: Arc::new(RefreshCoordinator::new()),
            navigator: Arc::new(NullNavigator),
        }
    }

    /// Share an existing token store (e.g. one backed by [`FileStorage`](crate::FileStorage)).
    #[must_use]
    pub fn with_store(mut self, store: Arc<TokenStore>) -> Self {
        self.store = store;
        self
    }

    #[must_use]
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    #[must_use]
    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.config.endpoint(path)
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, Error> {
        let request = ApiRequest::get(self.endpoint(path)?);
        envelope::handle_response(self.execute(request).await?)
    }

    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, Error>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = ApiRequest::post(self.endpoint(path)?).json(serde_json::to_value(body)?);
        envelope::handle_response(self.execute(request).await?)
    }

    pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R, Error>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = ApiRequest::put(self.endpoint(path)?).json(serde_json::to_value(body)?);
        envelope::handle_response(self.execute(request).await?)
    }

    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        let request = ApiRequest::delete(self.endpoint(path)?);
        envelope::handle_empty(self.execute(request).await?)
    }

    /// Send through the interceptor.
    ///
    /// Non-401 statuses come back untouched. A 401 on a refreshable request
    /// that has not been retried yet is refreshed and retried exactly once;
    /// a 401 on the retry is returned as-is.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, Error> {
        let epoch = self.refresh.epoch();
        let sent_with = self.store.access_token();
        if let Some(token) = &sent_with {
            set_bearer(&mut request, token);
        }
        self.attach_cookies(&mut request);

        let response = self.dispatch(request.clone()).await?;
        if response.status() != StatusCode::UNAUTHORIZED
            || request.retried
            || !request.refreshable
        {
            return Ok(response);
        }

        request.retried = true;
        tracing::debug!(url = %request.url, "Access token rejected, refreshing");

        let token = match self
            .refresh
            .refresh(epoch, || self.request_new_token())
            .await
        {
            Settled::Ran(Ok(token)) => token,
            Settled::Ran(Err(e)) => {
                tracing::warn!(error = %e, "Token refresh failed, ending session");
                self.expire_session();
                return Err(Error::SessionExpired);
            }
            // The store holds whatever session is current now: a refreshed
            // token, a fresh login, or nothing if the refresh failed.
            Settled::Shared => match self.store.access_token() {
                Some(current) if Some(&current) != sent_with.as_ref() => current,
                Some(_) => return Ok(response),
                None => return Err(Error::SessionExpired),
            },
        };

        set_bearer(&mut request, &token);
        self.attach_cookies(&mut request);
        self.dispatch(request).await
    }

    /// Send without the 401 handling; cookies from the response are still kept.
    pub(crate) async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        let response = self.transport.send(request).await?;
        for header in response.set_cookies() {
            self.store.absorb_set_cookie(header);
        }
        Ok(response)
    }

    /// Trade the refresh-token cookie for a new access token.
    async fn request_new_token(&self) -> Result<SecretString, Error> {
        let Some(refresh_token) = self.store.refresh_token() else {
            tracing::debug!("No refresh token cookie, cannot refresh");
            return Err(Error::SessionExpired);
        };

        let mut request = api::refresh_request(self.config.refresh_endpoint()?, &refresh_token);
        self.attach_cookies(&mut request);

        let grant: TokenGrant = envelope::handle_response(self.dispatch(request).await?)?;
        let tokens = grant.into_tokens();
        self.store.set_auth_tokens(&tokens);
        tracing::info!("Access token refreshed");
        Ok(tokens.access_token)
    }

    fn attach_cookies(&self, request: &mut ApiRequest) {
        request.headers.remove(COOKIE);
        if let Some(header) = self.store.cookie_header() {
            match HeaderValue::from_str(&header) {
                Ok(value) => {
                    request.headers.insert(COOKIE, value);
                }
                Err(e) => tracing::warn!(error = %e, "Cookie jar is not a valid header"),
            }
        }
    }

    /// Forced logout: drop every local credential and go to the login page.
    fn expire_session(&self) {
        self.store.clear_auth_tokens();
        self.store.clear_refresh_token();
        self.store.clear_user();
        self.navigator.navigate(&self.config.routes.login);
    }
}

fn set_bearer(request: &mut ApiRequest, token: &SecretString) {
    match HeaderValue::from_str(&format!("Bearer {}", token.expose_secret())) {
        Ok(mut value) => {
            value.set_sensitive(true);
            request.headers.insert(AUTHORIZATION, value);
        }
        Err(_) => tracing::warn!("Access token is not a valid header value; sending without it"),
    }
}
