use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{Next, from_fn_with_state};
use axum::response::{IntoResponse, Redirect, Response};

use super::config::GateConfig;
use super::extractor::SessionCookies;
use crate::paths::under_prefix;

/// What the gate does with one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    /// 307 to this path.
    Redirect(String),
}

/// Route decision from the path and the session cookies; first matching rule wins.
///
/// 1. ignored prefix: pass
/// 2. protected prefix while anonymous: to login
/// 3. exact auth page while authenticated: to dashboard
/// 4. `/` while authenticated: to dashboard
/// 5. anything else: pass
#[must_use]
pub fn decide(config: &GateConfig, path: &str, cookies: &SessionCookies) -> GateDecision {
    if config.ignored_prefixes.iter().any(|p| under_prefix(path, p)) {
        return GateDecision::Pass;
    }

    let authenticated = cookies.is_authenticated();
    let routes = &config.routes;

    if !authenticated && config.protected_prefixes.iter().any(|p| under_prefix(path, p)) {
        return GateDecision::Redirect(routes.login.clone());
    }

    if authenticated && routes.auth_pages().contains(&path) {
        return GateDecision::Redirect(routes.dashboard.clone());
    }

    if authenticated && path == routes.home {
        return GateDecision::Redirect(routes.dashboard.clone());
    }

    GateDecision::Pass
}

/// Axum middleware running [`decide`] on every request.
///
/// Mount with [`apply_route_gate`] or directly:
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/dashboard", get(dashboard))
///     .layer(from_fn_with_state(Arc::new(GateConfig::default()), route_gate));
/// ```
pub async fn route_gate(
    State(config): State<Arc<GateConfig>>,
    cookies: SessionCookies,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    match decide(&config, &path, &cookies) {
        GateDecision::Pass => next.run(request).await,
        GateDecision::Redirect(to) => {
            tracing::debug!(from = %path, to = %to, "Route gate redirect");
            Redirect::temporary(&to).into_response()
        }
    }
}

/// Wrap every route of `router` in the gate.
pub fn apply_route_gate<S>(router: Router<S>, config: GateConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(from_fn_with_state(Arc::new(config), route_gate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anon() -> SessionCookies {
        SessionCookies::default()
    }

    fn flagged() -> SessionCookies {
        SessionCookies {
            auth_token: None,
            has_session: true,
        }
    }

    fn with_token() -> SessionCookies {
        SessionCookies {
            auth_token: Some("tok".into()),
            has_session: false,
        }
    }

    fn to(path: &str) -> GateDecision {
        GateDecision::Redirect(path.into())
    }

    #[test]
    fn protected_paths_need_a_session() {
        let gate = GateConfig::default();
        assert_eq!(decide(&gate, "/dashboard", &anon()), to("/login"));
        assert_eq!(decide(&gate, "/spaces/42/documents", &anon()), to("/login"));
        assert_eq!(decide(&gate, "/dashboard", &flagged()), GateDecision::Pass);
        assert_eq!(decide(&gate, "/chat/7", &with_token()), GateDecision::Pass);
    }

    #[test]
    fn auth_pages_bounce_signed_in_users() {
        let gate = GateConfig::default();
        assert_eq!(decide(&gate, "/login", &flagged()), to("/dashboard"));
        assert_eq!(decide(&gate, "/auth/callback", &with_token()), to("/dashboard"));
        assert_eq!(decide(&gate, "/login", &anon()), GateDecision::Pass);
        // Exact match only.
        assert_eq!(decide(&gate, "/login/help", &flagged()), GateDecision::Pass);
    }

    #[test]
    fn home_goes_to_dashboard_when_signed_in() {
        let gate = GateConfig::default();
        assert_eq!(decide(&gate, "/", &flagged()), to("/dashboard"));
        assert_eq!(decide(&gate, "/", &anon()), GateDecision::Pass);
    }

    #[test]
    fn ignored_prefixes_win() {
        let gate = GateConfig::default().with_ignored_prefix("/dashboard/public");
        assert_eq!(decide(&gate, "/_next/static/chunk.js", &anon()), GateDecision::Pass);
        assert_eq!(decide(&gate, "/api/auth/login", &flagged()), GateDecision::Pass);
        assert_eq!(decide(&gate, "/dashboard/public/x", &anon()), GateDecision::Pass);
    }

    #[test]
    fn prefix_match_is_segment_aware() {
        let gate = GateConfig::default();
        assert_eq!(decide(&gate, "/chatter", &anon()), GateDecision::Pass);
        assert_eq!(decide(&gate, "/profile", &anon()), to("/login"));
    }
}
