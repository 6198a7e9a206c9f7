/// Canonical application paths the session layer redirects between.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct AppRoutes {
    pub home: String,
    pub login: String,
    pub register: String,
    pub forgot_password: String,
    pub dashboard: String,
    pub profile: String,
    pub auth_callback: String,
    pub auth_success: String,
}

impl Default for AppRoutes {
    fn default() -> Self {
        Self {
            home: "/".into(),
            login: "/login".into(),
            register: "/register".into(),
            forgot_password: "/forgot-password".into(),
            dashboard: "/dashboard".into(),
            profile: "/profile".into(),
            auth_callback: "/auth/callback".into(),
            auth_success: "/auth/success".into(),
        }
    }
}

impl AppRoutes {
    #[must_use]
    pub fn with_login(mut self, path: impl Into<String>) -> Self {
        self.login = path.into();
        self
    }

    #[must_use]
    pub fn with_dashboard(mut self, path: impl Into<String>) -> Self {
        self.dashboard = path.into();
        self
    }

    /// Pages an authenticated user gets bounced away from (exact match).
    #[must_use]
    pub fn auth_pages(&self) -> [&str; 5] {
        [
            &self.login,
            &self.register,
            &self.forgot_password,
            &self.auth_callback,
            &self.auth_success,
        ]
    }
}

/// `path` equals `prefix` or lives underneath it.
#[cfg_attr(not(feature = "server"), allow(dead_code))]
pub(crate) fn under_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return path.starts_with('/');
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}
