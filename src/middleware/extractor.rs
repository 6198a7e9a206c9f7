use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use crate::cookies::{AUTH_TOKEN_COOKIE, HAS_SESSION_COOKIE};

/// The two session cookies as the route gate sees them.
///
/// Presence only: the token is never decoded or checked for expiry here.
///
/// ```rust,ignore
/// async fn landing(cookies: SessionCookies) -> impl IntoResponse {
///     if cookies.is_authenticated() { "welcome back" } else { "hello" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCookies {
    pub auth_token: Option<String>,
    pub has_session: bool,
}

impl SessionCookies {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let jar = CookieJar::from_headers(headers);
        Self {
            auth_token: jar
                .get(AUTH_TOKEN_COOKIE)
                .map(|c| c.value().to_owned())
                .filter(|v| !v.is_empty()),
            has_session: jar.get(HAS_SESSION_COOKIE).is_some_and(|c| c.value() == "true"),
        }
    }

    /// Token cookie present, or `has-session` is exactly `"true"`.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some() || self.has_session
    }
}

impl<S: Send + Sync> FromRequestParts<S> for SessionCookies {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum::http::header::COOKIE;

    fn cookies(header: &'static str) -> SessionCookies {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static(header));
        SessionCookies::from_headers(&headers)
    }

    #[test]
    fn token_alone_is_enough() {
        let c = cookies("auth-token=abc");
        assert_eq!(c.auth_token.as_deref(), Some("abc"));
        assert!(c.is_authenticated());
    }

    #[test]
    fn has_session_must_be_exactly_true() {
        assert!(cookies("has-session=true").is_authenticated());
        assert!(!cookies("has-session=1").is_authenticated());
        assert!(!cookies("has-session=TRUE").is_authenticated());
    }

    #[test]
    fn empty_token_is_absent() {
        assert!(!cookies("auth-token=; theme=dark").is_authenticated());
        assert!(!SessionCookies::from_headers(&HeaderMap::new()).is_authenticated());
    }
}
