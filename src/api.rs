//! Typed calls to the backend's `auth/*` endpoints.
//!
//! Request builders and response parsers are crate-visible so the session
//! action layer forwards exactly what this client would send.

use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::client::{ApiClient, ApiRequest, ReqwestTransport, Transport};
use crate::config::ClientConfig;
use crate::envelope;
use crate::error::Error;
use crate::secret::SecretString;
use crate::types::{AuthTokens, AuthUser};
use crate::validators;

/// Token payload of a refresh (and of a completed login).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    #[serde(alias = "accessToken", alias = "access_token")]
    pub token: SecretString,
    #[serde(default, rename = "refreshToken", alias = "refresh_token")]
    pub refresh_token: Option<SecretString>,
}

impl TokenGrant {
    #[must_use]
    pub fn into_tokens(self) -> AuthTokens {
        AuthTokens {
            access_token: self.token,
            refresh_token: self.refresh_token,
        }
    }
}

/// What a password (or Google) login produced.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Credentials accepted and no second factor needed.
    Session { tokens: AuthTokens, user: AuthUser },
    /// Password accepted; a TOTP or backup code must follow.
    MfaRequired { temp_token: SecretString },
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginPayload {
    #[serde(default, alias = "requiresMfa")]
    requires_mfa: bool,
    #[serde(default, alias = "tempToken")]
    temp_token: Option<SecretString>,
    #[serde(default, alias = "accessToken", alias = "access_token")]
    token: Option<SecretString>,
    #[serde(default, rename = "refreshToken", alias = "refresh_token")]
    refresh_token: Option<SecretString>,
    #[serde(default)]
    user: Option<AuthUser>,
}

impl LoginPayload {
    pub(crate) fn into_outcome(self) -> Result<LoginOutcome, Error> {
        if self.requires_mfa {
            let temp_token = self
                .temp_token
                .ok_or_else(|| Error::Decode("MFA required but no temp_token".into()))?;
            return Ok(LoginOutcome::MfaRequired { temp_token });
        }
        let (Some(token), Some(user)) = (self.token, self.user) else {
            return Err(Error::Decode("login response lacks token or user".into()));
        };
        Ok(LoginOutcome::Session {
            tokens: AuthTokens {
                access_token: token,
                refresh_token: self.refresh_token,
            },
            user,
        })
    }

    /// MFA verification must end in a session, never in another challenge.
    pub(crate) fn into_session(self) -> Result<(AuthTokens, AuthUser), Error> {
        match self.into_outcome()? {
            LoginOutcome::Session { tokens, user } => Ok((tokens, user)),
            LoginOutcome::MfaRequired { .. } => {
                Err(Error::Decode("verification answered with a new challenge".into()))
            }
        }
    }
}

/// Profile responses come either bare or as `{ "user": ... }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum UserPayload {
    Wrapped { user: AuthUser },
    Bare(AuthUser),
}

impl From<UserPayload> for AuthUser {
    fn from(payload: UserPayload) -> Self {
        match payload {
            UserPayload::Wrapped { user } | UserPayload::Bare(user) => user,
        }
    }
}

/// Fields of the profile form; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProfileUpdate {
    fn validate(&self) -> Result<(), Error> {
        if let Some(email) = &self.email {
            validators::validate_email(email)?;
        }
        if let Some(username) = &self.username {
            validators::validate_username(username)?;
        }
        Ok(())
    }
}

/// Result of turning MFA on.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MfaEnabled {
    #[serde(default, alias = "backupCodes")]
    pub backup_codes: Vec<String>,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

// ── Requests shared with the session-action layer ──────────────────────

pub(crate) fn login_request(
    config: &ClientConfig,
    email: &str,
    password: &str,
) -> Result<ApiRequest, Error> {
    validators::validate_email(email)?;
    validators::validate_login_password(password)?;
    Ok(ApiRequest::post(config.endpoint("auth/login")?)
        .json(json!({ "email": email.trim(), "password": password }))
        .without_refresh())
}

pub(crate) fn verify_mfa_request(
    config: &ClientConfig,
    code: &str,
    temp_token: &SecretString,
    use_backup_code: bool,
) -> Result<ApiRequest, Error> {
    validators::validate_mfa_code(code, use_backup_code)?;
    Ok(ApiRequest::post(config.endpoint("auth/mfa/verify")?)
        .json(json!({
            "code": code.trim(),
            "tempToken": temp_token.expose_secret(),
            "useBackupCode": use_backup_code,
        }))
        .without_refresh())
}

pub(crate) fn refresh_request(url: Url, refresh_token: &SecretString) -> ApiRequest {
    ApiRequest::post(url)
        .json(json!({ "refreshToken": refresh_token.expose_secret() }))
        .without_refresh()
}

pub(crate) fn logout_request(config: &ClientConfig) -> Result<ApiRequest, Error> {
    // An expired session must not bounce a logout through refresh.
    Ok(ApiRequest::post(config.endpoint("auth/logout")?)
        .json(json!({}))
        .without_refresh())
}

/// Backend auth endpoints on top of the intercepting client.
pub struct AuthApi<T: Transport = ReqwestTransport> {
    client: ApiClient<T>,
}

impl<T: Transport> Clone for AuthApi<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}

impl<T: Transport> AuthApi<T> {
    #[must_use]
    pub fn new(client: ApiClient<T>) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn client(&self) -> &ApiClient<T> {
        &self.client
    }

    /// Password login. Validation failures return before any request is made.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, Error> {
        let request = login_request(self.client.config(), email, password)?;
        let payload: LoginPayload = envelope::handle_response(self.client.execute(request).await?)?;
        payload.into_outcome()
    }

    /// Second factor for a pending login.
    pub async fn verify_mfa(
        &self,
        code: &str,
        temp_token: &SecretString,
        use_backup_code: bool,
    ) -> Result<(AuthTokens, AuthUser), Error> {
        let request = verify_mfa_request(self.client.config(), code, temp_token, use_backup_code)?;
        let payload: LoginPayload = envelope::handle_response(self.client.execute(request).await?)?;
        payload.into_session()
    }

    /// Exchange a Google authorization code (with its PKCE verifier).
    pub async fn google_login(
        &self,
        code: &str,
        code_verifier: &SecretString,
        redirect_uri: &str,
    ) -> Result<LoginOutcome, Error> {
        let request = ApiRequest::post(self.client.endpoint("auth/google")?)
            .json(json!({
                "code": code,
                "codeVerifier": code_verifier.expose_secret(),
                "redirectUri": redirect_uri,
            }))
            .without_refresh();
        let payload: LoginPayload = envelope::handle_response(self.client.execute(request).await?)?;
        payload.into_outcome()
    }

    pub async fn logout(&self) -> Result<(), Error> {
        let request = logout_request(self.client.config())?;
        envelope::handle_empty(self.client.execute(request).await?)
    }

    pub async fn register(&self, email: &str, username: &str, password: &str) -> Result<(), Error> {
        validators::validate_email(email)?;
        validators::validate_username(username)?;
        validators::validate_new_password(password)?;
        let request = ApiRequest::post(self.client.endpoint("auth/register")?)
            .json(json!({
                "email": email.trim(),
                "username": username.trim(),
                "password": password,
            }))
            .without_refresh();
        envelope::handle_empty(self.client.execute(request).await?)
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), Error> {
        validators::validate_email(email)?;
        let request = ApiRequest::post(self.client.endpoint("auth/forgot-password")?)
            .json(json!({ "email": email.trim() }))
            .without_refresh();
        envelope::handle_empty(self.client.execute(request).await?)
    }

    pub async fn profile(&self) -> Result<AuthUser, Error> {
        let payload: UserPayload = self.client.get("auth/profile").await?;
        Ok(payload.into())
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<AuthUser, Error> {
        update.validate()?;
        let payload: UserPayload = self.client.put("auth/profile", update).await?;
        Ok(payload.into())
    }

    pub async fn enable_mfa(&self, code: &str) -> Result<MfaEnabled, Error> {
        validators::validate_mfa_code(code, false)?;
        self.client
            .post("auth/mfa/enable", &json!({ "code": code.trim() }))
            .await
    }

    pub async fn disable_mfa(&self, code: &str) -> Result<(), Error> {
        validators::validate_mfa_code(code, false)?;
        let request = ApiRequest::post(self.client.endpoint("auth/mfa/disable")?)
            .json(json!({ "code": code.trim() }));
        envelope::handle_empty(self.client.execute(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedTransport, envelope_ok, failure, test_config, user_json};
    use crate::validators::ValidationError;
    use reqwest::StatusCode;

    fn api(transport: ScriptedTransport) -> AuthApi<ScriptedTransport> {
        AuthApi::new(ApiClient::with_transport(test_config(), transport))
    }

    #[tokio::test]
    async fn invalid_email_never_reaches_the_network() {
        let api = api(ScriptedTransport::new(|_| envelope_ok(json!({}))));
        let err = api.login("not-an-email", "pw").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::EmailInvalidFormat)
        ));
        assert!(api.client().transport().requests().is_empty());
    }

    #[tokio::test]
    async fn login_without_mfa_yields_a_session() {
        let api = api(ScriptedTransport::new(|_| {
            envelope_ok(json!({ "token": "t1", "refreshToken": "r1", "user": user_json(false) }))
        }));
        match api.login("ada@example.com", "pw").await.unwrap() {
            LoginOutcome::Session { tokens, user } => {
                assert_eq!(tokens.access_token.expose_secret(), "t1");
                assert_eq!(tokens.refresh_token.unwrap().expose_secret(), "r1");
                assert_eq!(user.email, "ada@example.com");
            }
            other => panic!("expected session, got {other:?}"),
        }
        let sent = api.client().transport().requests();
        assert_eq!(sent[0].body().unwrap()["email"], "ada@example.com");
        assert!(!sent[0].refreshable);
    }

    #[tokio::test]
    async fn login_with_mfa_yields_a_challenge() {
        let api = api(ScriptedTransport::new(|_| {
            envelope_ok(json!({ "requires_mfa": true, "temp_token": "abc" }))
        }));
        match api.login("ada@example.com", "pw").await.unwrap() {
            LoginOutcome::MfaRequired { temp_token } => {
                assert_eq!(temp_token.expose_secret(), "abc");
            }
            other => panic!("expected challenge, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn verify_sends_code_and_temp_token() {
        let api = api(ScriptedTransport::new(|_| {
            envelope_ok(json!({ "token": "t2", "user": user_json(true) }))
        }));
        let (tokens, user) = api
            .verify_mfa("123456", &"abc".into(), false)
            .await
            .unwrap();
        assert_eq!(tokens.access_token.expose_secret(), "t2");
        assert!(user.mfa_enabled());

        let sent = api.client().transport().requests();
        let body = sent[0].body().unwrap();
        assert_eq!(body["code"], "123456");
        assert_eq!(body["tempToken"], "abc");
        assert_eq!(body["useBackupCode"], false);
    }

    #[tokio::test]
    async fn wrong_password_is_an_api_error_not_a_refresh() {
        let api = api(ScriptedTransport::new(|_| {
            failure(StatusCode::UNAUTHORIZED, "Invalid credentials")
        }));
        let err = api.login("ada@example.com", "nope").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(api.client().transport().requests().len(), 1);
    }

    #[tokio::test]
    async fn profile_accepts_wrapped_and_bare_users() {
        let wrapped = api(ScriptedTransport::new(|_| {
            envelope_ok(json!({ "user": user_json(false) }))
        }));
        assert_eq!(wrapped.profile().await.unwrap().username, "ada");

        let bare = api(ScriptedTransport::new(|_| envelope_ok(user_json(false))));
        assert_eq!(bare.profile().await.unwrap().username, "ada");
    }

    #[tokio::test]
    async fn profile_update_sends_only_set_fields() {
        let api = api(ScriptedTransport::new(|_| envelope_ok(user_json(false))));
        let update = ProfileUpdate {
            username: Some("ada2".into()),
            email: None,
        };
        api.update_profile(&update).await.unwrap();
        let sent = api.client().transport().requests();
        assert_eq!(*sent[0].method(), reqwest::Method::PUT);
        assert_eq!(sent[0].body().unwrap(), &json!({ "username": "ada2" }));
    }

    #[tokio::test]
    async fn short_registration_password_is_rejected_locally() {
        let api = api(ScriptedTransport::new(|_| envelope_ok(json!({}))));
        let err = api
            .register("ada@example.com", "ada", "short")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::PasswordTooShort)
        ));
        assert!(api.client().transport().requests().is_empty());
    }

    #[test]
    fn grant_accepts_token_aliases() {
        let grant: TokenGrant =
            serde_json::from_value(json!({ "accessToken": "a", "refresh_token": "r" })).unwrap();
        let tokens = grant.into_tokens();
        assert_eq!(tokens.access_token.expose_secret(), "a");
        assert_eq!(tokens.refresh_token.unwrap().expose_secret(), "r");
    }
}
