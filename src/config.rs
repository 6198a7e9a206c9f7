use url::Url;

use crate::error::Error;
use crate::paths::AppRoutes;

const DEFAULT_API_VERSION: &str = "v1";

/// Where the backend lives and how the session layer behaves.
///
/// Required field (`api_url`) is a constructor parameter; everything else has
/// a default and a `with_*` override.
///
/// ```rust,ignore
/// use spaces_session::ClientConfig;
///
/// let config = ClientConfig::new("https://api.spaces.example".parse()?)
///     .with_api_version("v2")
///     .with_secure_cookies(true);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) api_url: Url,
    pub(crate) api_version: String,
    pub(crate) google_client_id: Option<String>,
    pub(crate) secure_cookies: bool,
    pub(crate) routes: AppRoutes,
    pub(crate) refresh_url: Option<Url>,
}

impl ClientConfig {
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            api_version: DEFAULT_API_VERSION.into(),
            google_client_id: None,
            secure_cookies: false,
            routes: AppRoutes::default(),
            refresh_url: None,
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `API_URL`: backend origin (must be a valid URL)
    ///
    /// # Optional env vars
    /// - `API_VERSION`: path version segment (default `v1`)
    /// - `GOOGLE_CLIENT_ID`: enables Google sign-in
    /// - `APP_ENV`: `production` turns on secure cookies
    /// - `COOKIE_SECURE`: explicit override for the secure flag
    /// - `SESSION_REFRESH_URL`: absolute URL of the refresh endpoint, when
    ///   refresh goes through the session-action layer instead of the backend
    pub fn from_env() -> Result<Self, Error> {
        let api_url: Url = std::env::var("API_URL")
            .map_err(|_| Error::Config("API_URL is required".into()))?
            .parse()
            .map_err(|e| Error::Config(format!("API_URL: {e}")))?;

        let mut config = Self::new(api_url).with_secure_cookies(secure_cookies_from_env());

        if let Ok(version) = std::env::var("API_VERSION") {
            config = config.with_api_version(version);
        }
        if let Ok(client_id) = std::env::var("GOOGLE_CLIENT_ID") {
            if !client_id.trim().is_empty() {
                config = config.with_google_client_id(client_id.trim());
            }
        }
        if let Ok(url_str) = std::env::var("SESSION_REFRESH_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| Error::Config(format!("SESSION_REFRESH_URL: {e}")))?;
            config = config.with_refresh_url(url);
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    #[must_use]
    pub fn with_google_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.google_client_id = Some(client_id.into());
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_routes(mut self, routes: AppRoutes) -> Self {
        self.routes = routes;
        self
    }

    #[must_use]
    pub fn with_refresh_url(mut self, url: Url) -> Self {
        self.refresh_url = Some(url);
        self
    }

    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    #[must_use]
    pub fn google_client_id(&self) -> Option<&str> {
        self.google_client_id.as_deref()
    }

    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }

    #[must_use]
    pub fn routes(&self) -> &AppRoutes {
        &self.routes
    }

    /// `{api_url}/api/{version}/{path}`.
    pub fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let raw = format!(
            "{}/api/{}/{}",
            self.api_url.as_str().trim_end_matches('/'),
            self.api_version.trim_matches('/'),
            path.trim_start_matches('/'),
        );
        raw.parse()
            .map_err(|e| Error::Config(format!("endpoint {path}: {e}")))
    }

    /// Refresh endpoint: the override if set, else the backend's `auth/refresh`.
    pub fn refresh_endpoint(&self) -> Result<Url, Error> {
        match &self.refresh_url {
            Some(url) => Ok(url.clone()),
            None => self.endpoint("auth/refresh"),
        }
    }
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

/// `COOKIE_SECURE` wins; otherwise secure only when `APP_ENV=production`.
pub(crate) fn secure_cookies_from_env() -> bool {
    if let Some(value) = env_bool("COOKIE_SECURE") {
        return value;
    }
    std::env::var("APP_ENV").is_ok_and(|env| env.trim().eq_ignore_ascii_case("production"))
}
