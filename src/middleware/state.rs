use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use crate::client::Transport;
use crate::config::ClientConfig;

/// Shared state for the session-action handlers.
pub(super) struct ActionState<T> {
    pub(super) transport: Arc<T>,
    pub(super) client: Arc<ClientConfig>,
    pub(super) cookie_key: Key,
}

// Manual Clone: avoid derive adding a `T: Clone` bound.
impl<T> Clone for ActionState<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            client: self.client.clone(),
            cookie_key: self.cookie_key.clone(),
        }
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl<T: Transport> FromRef<ActionState<T>> for Key {
    fn from_ref(state: &ActionState<T>) -> Self {
        state.cookie_key.clone()
    }
}
