use axum_extra::extract::cookie::Key;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::paths::AppRoutes;

const DEFAULT_PROTECTED: [&str; 5] = ["/dashboard", "/profile", "/spaces", "/settings", "/chat"];
const DEFAULT_IGNORED: [&str; 4] = ["/_next", "/api", "/favicon.ico", "/static"];
const DEFAULT_ACTIONS_PATH: &str = "/api/session";

/// Which paths the route gate protects, skips, and redirects between.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct GateConfig {
    pub(crate) protected_prefixes: Vec<String>,
    pub(crate) ignored_prefixes: Vec<String>,
    pub(crate) routes: AppRoutes,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            protected_prefixes: DEFAULT_PROTECTED.iter().map(|&p| p.to_owned()).collect(),
            ignored_prefixes: DEFAULT_IGNORED.iter().map(|&p| p.to_owned()).collect(),
            routes: AppRoutes::default(),
        }
    }
}

impl GateConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_protected_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.protected_prefixes.push(prefix.into());
        self
    }

    #[must_use]
    pub fn with_ignored_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ignored_prefixes.push(prefix.into());
        self
    }

    #[must_use]
    pub fn with_routes(mut self, routes: AppRoutes) -> Self {
        self.routes = routes;
        self
    }

    #[must_use]
    pub fn protected_prefixes(&self) -> &[String] {
        &self.protected_prefixes
    }

    #[must_use]
    pub fn ignored_prefixes(&self) -> &[String] {
        &self.ignored_prefixes
    }

    #[must_use]
    pub fn routes(&self) -> &AppRoutes {
        &self.routes
    }
}

/// Settings for the session-action router.
///
/// Required field (`client`) is a constructor parameter; the cookie key
/// defaults to an ephemeral one, which logs everybody out on restart.
#[derive(Clone)]
pub struct ActionsConfig {
    pub(crate) client: ClientConfig,
    pub(crate) cookie_key: Key,
    pub(crate) base_path: String,
}

impl std::fmt::Debug for ActionsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionsConfig")
            .field("client", &self.client)
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

impl ActionsConfig {
    #[must_use]
    pub fn new(client: ClientConfig) -> Self {
        Self {
            client,
            cookie_key: Key::generate(),
            base_path: DEFAULT_ACTIONS_PATH.into(),
        }
    }

    /// Create config from environment variables.
    ///
    /// Everything [`ClientConfig::from_env`] reads, plus:
    /// - `SESSION_ACTIONS_PATH`: mount point of the action routes (default `/api/session`)
    /// - `COOKIE_KEY`: private-jar key bytes (at least 64); ephemeral when unset
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Self::new(ClientConfig::from_env()?);

        if let Ok(path) = std::env::var("SESSION_ACTIONS_PATH") {
            config = config.with_base_path(path);
        }

        match std::env::var("COOKIE_KEY") {
            Ok(raw) => {
                let key = Key::try_from(raw.as_bytes()).map_err(|_| {
                    Error::Config(
                        "COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                         Remove the env var to use an ephemeral key, or provide a valid key."
                            .into(),
                    )
                })?;
                config = config.with_cookie_key(key);
            }
            Err(_) => tracing::warn!("COOKIE_KEY not set, using an ephemeral key"),
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.base_path = format!("/{}", path.trim_matches('/'));
        self
    }

    #[must_use]
    pub fn client(&self) -> &ClientConfig {
        &self.client
    }

    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_defaults() {
        let gate = GateConfig::new();
        assert!(gate.protected_prefixes().iter().any(|p| p == "/spaces"));
        assert!(gate.ignored_prefixes().iter().any(|p| p == "/_next"));
        assert_eq!(gate.routes().login, "/login");
    }

    #[test]
    fn base_path_is_normalised() {
        let config = ActionsConfig::new(ClientConfig::new("https://api.example.com".parse().unwrap()))
            .with_base_path("internal/session/");
        assert_eq!(config.base_path(), "/internal/session");
    }
}
