//! Names and shapes of the cookies that carry session state.
//!
//! The same builders serve the client-side jar in [`TokenStore`](crate::TokenStore)
//! and the axum session-action layer, so both sides agree on attributes.

use cookie::{Cookie, SameSite};
use time::Duration;

pub const HAS_SESSION_COOKIE: &str = "has-session";
pub const AUTH_TOKEN_COOKIE: &str = "auth-token";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";
pub const AUTH_USER_COOKIE: &str = "auth-user";

pub(crate) const SESSION_TTL_DAYS: i64 = 7;

/// Script-readable "logged in" flag the route gate looks at.
pub(crate) fn has_session_cookie(secure: bool) -> Cookie<'static> {
    mirror_cookie(HAS_SESSION_COOKIE, "true".to_owned(), secure)
}

/// Copy of the access token for the route gate. Not HTTP-only.
pub(crate) fn auth_token_cookie(token: &str, secure: bool) -> Cookie<'static> {
    mirror_cookie(AUTH_TOKEN_COOKIE, token.to_owned(), secure)
}

/// Cached profile; the value is JSON, percent-encoded on the wire.
pub(crate) fn auth_user_cookie(value: String, secure: bool) -> Cookie<'static> {
    mirror_cookie(AUTH_USER_COOKIE, value, secure)
}

pub(crate) fn refresh_token_cookie(value: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_TOKEN_COOKIE, value.to_owned()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(Duration::days(SESSION_TTL_DAYS))
        .build()
}

/// Removal cookie: empty value, zero max-age, same path.
#[cfg_attr(not(feature = "server"), allow(dead_code))]
pub(crate) fn removal(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

fn mirror_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(Duration::days(SESSION_TTL_DAYS))
        .build()
}

/// A `Set-Cookie` that tells the browser to drop the cookie.
pub(crate) fn is_removal(cookie: &Cookie<'_>) -> bool {
    cookie.value().is_empty() || cookie.max_age().is_some_and(|age| age <= Duration::ZERO)
}
