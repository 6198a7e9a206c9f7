use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::secret::SecretString;

/// Backend user identifier (opaque string).
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct UserId(pub String);

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// How the account signs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum AuthProvider {
    Local,
    Google,
    #[serde(other)]
    Other,
}

/// Profile of the signed-in user, as cached next to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
    pub username: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfa_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_provider: Option<AuthProvider>,
}

impl AuthUser {
    #[must_use]
    pub fn new(
        id: impl Into<UserId>,
        email: impl Into<String>,
        username: impl Into<String>,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            username: username.into(),
            created_at,
            mfa_enabled: None,
            auth_provider: None,
        }
    }

    #[must_use]
    pub fn with_mfa_enabled(mut self, enabled: bool) -> Self {
        self.mfa_enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn with_auth_provider(mut self, provider: AuthProvider) -> Self {
        self.auth_provider = Some(provider);
        self
    }

    #[must_use]
    pub fn mfa_enabled(&self) -> bool {
        self.mfa_enabled.unwrap_or(false)
    }
}

/// Credentials minted by a login, an MFA verification or a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTokens {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
}

impl AuthTokens {
    #[must_use]
    pub fn new(access_token: impl Into<SecretString>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, token: impl Into<SecretString>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn user_parses_backend_shape() {
        let json = r#"{
            "id": "u-1",
            "email": "ada@example.com",
            "username": "ada",
            "created_at": "2024-03-01T10:00:00Z",
            "mfa_enabled": true,
            "auth_provider": "google"
        }"#;
        let user: AuthUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, UserId::from("u-1"));
        assert_eq!(user.created_at, datetime!(2024-03-01 10:00:00 UTC));
        assert!(user.mfa_enabled());
        assert_eq!(user.auth_provider, Some(AuthProvider::Google));
    }

    #[test]
    fn optional_fields_may_be_missing() {
        let json = r#"{"id":"u-2","email":"b@example.com","username":"b","created_at":"2024-03-01T10:00:00Z"}"#;
        let user: AuthUser = serde_json::from_str(json).unwrap();
        assert!(!user.mfa_enabled());
        assert!(user.auth_provider.is_none());
    }

    #[test]
    fn unknown_provider_is_tolerated() {
        let json = r#"{"id":"u-3","email":"c@example.com","username":"c","created_at":"2024-03-01T10:00:00Z","auth_provider":"github"}"#;
        let user: AuthUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.auth_provider, Some(AuthProvider::Other));
    }
}
