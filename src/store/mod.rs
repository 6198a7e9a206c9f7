//! Single source of truth for "do we think the user is logged in".
//!
//! Bridges the local-storage copy of the access token (what client code reads)
//! and the cookie jar (what the route gate and the session-action layer read).

mod storage;

use std::sync::{PoisonError, RwLock};

use cookie::{Cookie, CookieJar};

pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};

use crate::cookies::{
    self, AUTH_TOKEN_COOKIE, AUTH_USER_COOKIE, HAS_SESSION_COOKIE, REFRESH_TOKEN_COOKIE,
};
use crate::secret::SecretString;
use crate::types::{AuthTokens, AuthUser};

const ACCESS_TOKEN_KEY: &str = "accessToken";
const AUTH_USER_KEY: &str = "authUser";

/// Token store shared by the API client and the session context.
///
/// None of the operations fail: storage errors are logged and swallowed, and a
/// store built with [`TokenStore::unavailable`] (server rendering, no storage)
/// reads as empty and ignores writes.
pub struct TokenStore {
    storage: Option<Box<dyn Storage>>,
    jar: RwLock<CookieJar>,
    secure_cookies: bool,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("storage", &self.storage.as_ref().map(|_| "Storage"))
            .field("secure_cookies", &self.secure_cookies)
            .finish_non_exhaustive()
    }
}

impl TokenStore {
    #[must_use]
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            storage: Some(Box::new(storage)),
            jar: RwLock::new(CookieJar::new()),
            secure_cookies: false,
        }
    }

    /// In-memory store; the common case for tests and short-lived clients.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    /// A store with no storage behind it.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            storage: None,
            jar: RwLock::new(CookieJar::new()),
            secure_cookies: false,
        }
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    // ── Access token ───────────────────────────────────────────────────

    pub fn set_auth_tokens(&self, tokens: &AuthTokens) {
        self.set_access_token(&tokens.access_token);
        if let Some(refresh) = &tokens.refresh_token {
            self.set_refresh_token(refresh);
        }
    }

    pub fn set_access_token(&self, token: &SecretString) {
        if self.storage.is_none() {
            return;
        }
        self.storage_set(ACCESS_TOKEN_KEY, token.expose_secret());
        self.assert_session_cookies(token);
    }

    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.storage
            .as_ref()?
            .get(ACCESS_TOKEN_KEY)
            .filter(|t| !t.is_empty())
            .map(SecretString::from)
    }

    /// True iff storage holds a token. Re-asserts the mirror cookies so the
    /// gate keeps seeing the session even if they were dropped.
    pub fn is_authenticated(&self) -> bool {
        match self.access_token() {
            Some(token) => {
                self.assert_session_cookies(&token);
                true
            }
            None => false,
        }
    }

    pub fn clear_auth_tokens(&self) {
        self.storage_remove(ACCESS_TOKEN_KEY);
        let mut jar = self.jar_mut();
        jar.remove(Cookie::from(HAS_SESSION_COOKIE));
        jar.remove(Cookie::from(AUTH_TOKEN_COOKIE));
    }

    // ── Refresh token (HTTP-only cookie) ───────────────────────────────

    pub fn set_refresh_token(&self, token: &SecretString) {
        self.jar_mut().add(cookies::refresh_token_cookie(
            token.expose_secret(),
            self.secure_cookies,
        ));
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<SecretString> {
        self.cookie_value(REFRESH_TOKEN_COOKIE).map(SecretString::from)
    }

    pub fn clear_refresh_token(&self) {
        self.jar_mut().remove(Cookie::from(REFRESH_TOKEN_COOKIE));
    }

    // ── Cached user ────────────────────────────────────────────────────

    pub fn cache_user(&self, user: &AuthUser) {
        let json = match serde_json::to_string(user) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize user for cache");
                return;
            }
        };
        self.storage_set(AUTH_USER_KEY, &json);
        let encoded = urlencoding::encode(&json).into_owned();
        self.jar_mut()
            .add(cookies::auth_user_cookie(encoded, self.secure_cookies));
    }

    /// Cookie copy first, storage copy as fallback.
    #[must_use]
    pub fn cached_user(&self) -> Option<AuthUser> {
        let from_cookie: Option<AuthUser> = self.cookie_value(AUTH_USER_COOKIE).and_then(|raw| {
            let json = urlencoding::decode(&raw).ok()?;
            serde_json::from_str(&json).ok()
        });
        from_cookie.or_else(|| {
            let json = self.storage.as_ref()?.get(AUTH_USER_KEY)?;
            serde_json::from_str(&json)
                .inspect_err(|e| tracing::warn!(error = %e, "Discarding unreadable cached user"))
                .ok()
        })
    }

    pub fn clear_user(&self) {
        self.storage_remove(AUTH_USER_KEY);
        self.jar_mut().remove(Cookie::from(AUTH_USER_COOKIE));
    }

    // ── Cookie bridge ──────────────────────────────────────────────────

    #[must_use]
    pub fn has_cookie(&self, name: &str) -> bool {
        self.jar().get(name).is_some()
    }

    #[must_use]
    pub fn cookie_value(&self, name: &str) -> Option<String> {
        self.jar()
            .get(name)
            .map(|c| c.value().to_owned())
            .filter(|v| !v.is_empty())
    }

    /// Snapshot of the jar.
    #[must_use]
    pub fn cookies(&self) -> Vec<Cookie<'static>> {
        self.jar().iter().cloned().collect()
    }

    /// Jar rendered as a `Cookie` request header, `None` when empty.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        let jar = self.jar();
        let pairs: Vec<String> = jar
            .iter()
            .map(|c| format!("{}={}", c.name(), c.value()))
            .collect();
        (!pairs.is_empty()).then(|| pairs.join("; "))
    }

    /// Apply one `Set-Cookie` response header.
    pub fn absorb_set_cookie(&self, header: &str) {
        let cookie = match Cookie::parse(header.to_owned()) {
            Ok(cookie) => cookie,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unparseable Set-Cookie");
                return;
            }
        };
        let mut jar = self.jar_mut();
        if cookies::is_removal(&cookie) {
            jar.remove(Cookie::from(cookie.name().to_owned()));
        } else {
            jar.add(cookie);
        }
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn assert_session_cookies(&self, token: &SecretString) {
        let mut jar = self.jar_mut();
        jar.add(cookies::has_session_cookie(self.secure_cookies));
        jar.add(cookies::auth_token_cookie(
            token.expose_secret(),
            self.secure_cookies,
        ));
    }

    fn storage_set(&self, key: &str, value: &str) {
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.set(key, value) {
                tracing::warn!(error = %e, key, "Token storage write failed");
            }
        }
    }

    fn storage_remove(&self, key: &str) {
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.remove(key) {
                tracing::warn!(error = %e, key, "Token storage delete failed");
            }
        }
    }

    fn jar(&self) -> std::sync::RwLockReadGuard<'_, CookieJar> {
        self.jar.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn jar_mut(&self) -> std::sync::RwLockWriteGuard<'_, CookieJar> {
        self.jar.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn user() -> AuthUser {
        AuthUser::new(
            "u-1",
            "ada@example.com",
            "ada; lovelace",
            datetime!(2024-03-01 10:00:00 UTC),
        )
        .with_mfa_enabled(true)
    }

    #[test]
    fn set_then_clear_leaves_no_session() {
        let store = TokenStore::in_memory();
        store.set_auth_tokens(&AuthTokens::new("tok-1").with_refresh_token("ref-1"));
        assert!(store.is_authenticated());
        assert_eq!(store.cookie_value(HAS_SESSION_COOKIE).as_deref(), Some("true"));
        assert_eq!(store.cookie_value(AUTH_TOKEN_COOKIE).as_deref(), Some("tok-1"));

        store.clear_auth_tokens();
        assert!(!store.is_authenticated());
        assert!(!store.has_cookie(HAS_SESSION_COOKIE));
        assert!(!store.has_cookie(AUTH_TOKEN_COOKIE));
        // Refresh cookie has its own lifecycle.
        assert!(store.refresh_token().is_some());
    }

    #[test]
    fn repeated_set_clear_sequences_end_logged_out() {
        let store = TokenStore::in_memory();
        for i in 0..3 {
            store.set_access_token(&SecretString::new(format!("tok-{i}")));
            store.set_access_token(&SecretString::new(format!("tok-{i}b")));
            store.clear_auth_tokens();
        }
        assert!(!store.is_authenticated());
        assert!(store.cookie_header().is_none());
    }

    #[test]
    fn is_authenticated_resyncs_dropped_cookies() {
        let store = TokenStore::in_memory();
        store.set_access_token(&"tok".into());
        store.absorb_set_cookie("has-session=; Max-Age=0; Path=/");
        store.absorb_set_cookie("auth-token=; Max-Age=0; Path=/");
        assert!(!store.has_cookie(HAS_SESSION_COOKIE));

        assert!(store.is_authenticated());
        assert!(store.has_cookie(HAS_SESSION_COOKIE));
        assert_eq!(store.cookie_value(AUTH_TOKEN_COOKIE).as_deref(), Some("tok"));
    }

    #[test]
    fn unavailable_store_reads_empty_and_ignores_writes() {
        let store = TokenStore::unavailable();
        store.set_access_token(&"tok".into());
        assert!(store.access_token().is_none());
        assert!(!store.is_authenticated());
        assert!(!store.has_cookie(HAS_SESSION_COOKIE));
        store.clear_auth_tokens();
    }

    #[test]
    fn cached_user_round_trips_through_cookie() {
        let store = TokenStore::in_memory();
        store.cache_user(&user());
        let raw = store.cookie_value(AUTH_USER_COOKIE).unwrap();
        assert!(!raw.contains(';'), "cookie value must be encoded: {raw}");
        assert_eq!(store.cached_user(), Some(user()));
    }

    #[test]
    fn cached_user_falls_back_to_storage() {
        let store = TokenStore::in_memory();
        store.cache_user(&user());
        store.absorb_set_cookie("auth-user=; Max-Age=0");
        assert_eq!(store.cached_user(), Some(user()));

        store.clear_user();
        assert_eq!(store.cached_user(), None);
    }

    #[test]
    fn set_cookie_headers_update_the_jar() {
        let store = TokenStore::in_memory();
        store.absorb_set_cookie("refreshToken=abc; HttpOnly; Path=/; Max-Age=604800");
        assert_eq!(
            store.refresh_token().map(|t| t.expose_secret().to_owned()),
            Some("abc".to_owned())
        );
        assert_eq!(store.cookie_header().as_deref(), Some("refreshToken=abc"));

        store.absorb_set_cookie("refreshToken=; Path=/; Max-Age=0");
        assert!(store.refresh_token().is_none());
    }

    #[test]
    fn garbage_set_cookie_is_ignored() {
        let store = TokenStore::in_memory();
        store.absorb_set_cookie("");
        assert!(store.cookies().is_empty());
    }
}
