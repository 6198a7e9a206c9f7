//! Login with optional MFA step-up.
//!
//! ```text
//! Credentials ──password ok──▶ Established
//!      │
//!      └──password ok, MFA on──▶ MfaRequired{temp_token} ──code ok──▶ Established
//! ```
//!
//! The temp token only lives in the flow value; dropping the flow (leaving the
//! page) loses it and login starts over.

use url::Url;

use crate::api::LoginOutcome;
use crate::client::{ReqwestTransport, Transport};
use crate::error::Error;
use crate::oauth::{AuthorizationRequest, CallbackParams, GoogleSignIn};
use crate::secret::SecretString;
use crate::session::SessionContext;
use crate::types::{AuthTokens, AuthUser};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStep {
    Credentials,
    MfaRequired { temp_token: SecretString },
    Established,
}

pub struct LoginFlow<T: Transport = ReqwestTransport> {
    session: SessionContext<T>,
    step: LoginStep,
    last_error: Option<String>,
}

impl<T: Transport> LoginFlow<T> {
    #[must_use]
    pub fn new(session: SessionContext<T>) -> Self {
        Self {
            session,
            step: LoginStep::Credentials,
            last_error: None,
        }
    }

    #[must_use]
    pub fn step(&self) -> &LoginStep {
        &self.step
    }

    #[must_use]
    pub fn is_mfa_required(&self) -> bool {
        matches!(self.step, LoginStep::MfaRequired { .. })
    }

    /// Message for the form, from the last failed submission.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub fn session(&self) -> &SessionContext<T> {
        &self.session
    }

    /// Email and password. Invalid input is rejected before any request and
    /// leaves the step unchanged.
    pub async fn submit_credentials(&mut self, email: &str, password: &str) -> Result<&LoginStep, Error> {
        self.last_error = None;
        let outcome = self.session.api().login(email, password).await;
        let outcome = self.record(outcome)?;
        self.advance(outcome);
        Ok(&self.step)
    }

    /// TOTP or backup code for the pending challenge. A rejected code keeps
    /// the challenge so the user can try again.
    pub async fn submit_code(&mut self, code: &str, use_backup_code: bool) -> Result<&LoginStep, Error> {
        let LoginStep::MfaRequired { temp_token } = &self.step else {
            return Err(Error::NoChallenge);
        };
        let temp_token = temp_token.clone();
        self.last_error = None;

        let verified = self
            .session
            .api()
            .verify_mfa(code, &temp_token, use_backup_code)
            .await;
        let (tokens, user) = self.record(verified)?;
        self.establish(&tokens, user);
        Ok(&self.step)
    }

    /// Finish a Google sign-in from the callback URL and the request saved
    /// before redirecting. A Google account with MFA on lands in `MfaRequired`.
    pub async fn complete_google_callback(
        &mut self,
        callback: &Url,
        pending: &AuthorizationRequest,
        google: &GoogleSignIn,
    ) -> Result<&LoginStep, Error> {
        self.last_error = None;
        let params = CallbackParams::from_url(callback);
        let code = self.record(params.verified_code(&pending.state).map(str::to_owned))?;

        let outcome = self
            .session
            .api()
            .google_login(&code, &pending.code_verifier, google.redirect_uri().as_str())
            .await;
        let outcome = self.record(outcome)?;
        self.advance(outcome);
        Ok(&self.step)
    }

    /// Drop any challenge and go back to the credentials form.
    pub fn restart(&mut self) {
        self.step = LoginStep::Credentials;
        self.last_error = None;
    }

    fn advance(&mut self, outcome: LoginOutcome) {
        match outcome {
            LoginOutcome::Session { tokens, user } => self.establish(&tokens, user),
            LoginOutcome::MfaRequired { temp_token } => {
                tracing::info!("Password accepted, second factor required");
                self.step = LoginStep::MfaRequired { temp_token };
            }
        }
    }

    fn establish(&mut self, tokens: &AuthTokens, user: AuthUser) {
        self.session.login_success(tokens, user);
        self.step = LoginStep::Established;

        let client = self.session.api().client();
        client.navigator().navigate(&client.config().routes().dashboard);
    }

    fn record<R>(&mut self, result: Result<R, Error>) -> Result<R, Error> {
        result.inspect_err(|e| {
            self.last_error = Some(match e {
                Error::Api { message, .. } => message.clone(),
                other => other.to_string(),
            });
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AuthApi;
    use crate::client::ApiClient;
    use crate::navigator::RecordingNavigator;
    use crate::test_support::{ScriptedTransport, envelope_ok, failure, test_config, user_json};
    use reqwest::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    /// Password "pw" needs MFA (temp token "abc"), code "123456" passes.
    fn mfa_backend() -> ScriptedTransport {
        ScriptedTransport::new(|request| {
            let body = request.body().cloned().unwrap_or_default();
            let path = request.url().path();
            if path.ends_with("/auth/login") {
                envelope_ok(json!({ "requires_mfa": true, "temp_token": "abc" }))
            } else if path.ends_with("/auth/mfa/verify")
                && body["code"] == "123456"
                && body["tempToken"] == "abc"
            {
                envelope_ok(json!({ "token": "t1", "refreshToken": "r1", "user": user_json(true) }))
            } else if path.ends_with("/auth/google") {
                envelope_ok(json!({ "token": "g1", "user": user_json(false) }))
            } else {
                failure(StatusCode::UNAUTHORIZED, "Invalid verification code")
            }
        })
    }

    fn flow(transport: ScriptedTransport) -> (LoginFlow<ScriptedTransport>, Arc<RecordingNavigator>) {
        let navigator = Arc::new(RecordingNavigator::new());
        let client =
            ApiClient::with_transport(test_config(), transport).with_navigator(navigator.clone());
        (LoginFlow::new(SessionContext::new(AuthApi::new(client))), navigator)
    }

    fn sent(flow: &LoginFlow<ScriptedTransport>) -> usize {
        flow.session().api().client().transport().requests().len()
    }

    #[tokio::test]
    async fn invalid_email_stays_on_credentials_without_network() {
        let (mut flow, _) = flow(mfa_backend());
        let err = flow.submit_credentials("not-an-email", "pw").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(flow.step(), &LoginStep::Credentials);
        assert_eq!(flow.last_error(), Some("Please enter a valid email address"));
        assert_eq!(sent(&flow), 0);
    }

    #[tokio::test]
    async fn mfa_challenge_then_code_logs_in() {
        let (mut flow, navigator) = flow(mfa_backend());

        flow.submit_credentials("ada@example.com", "pw").await.unwrap();
        assert!(flow.is_mfa_required());
        assert!(!flow.session().api().client().store().is_authenticated());

        let step = flow.submit_code("123456", false).await.unwrap();
        assert_eq!(step, &LoginStep::Established);

        let session = flow.session();
        assert!(session.is_logged_in());
        let user = session.get_auth_user().unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert!(user.mfa_enabled());
        assert_eq!(
            session.api().client().store().access_token().unwrap().expose_secret(),
            "t1"
        );
        assert_eq!(navigator.last().as_deref(), Some("/dashboard"));
    }

    #[tokio::test]
    async fn wrong_code_keeps_the_challenge() {
        let (mut flow, _) = flow(mfa_backend());
        flow.submit_credentials("ada@example.com", "pw").await.unwrap();

        let err = flow.submit_code("654321", false).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(flow.is_mfa_required());
        assert_eq!(flow.last_error(), Some("Invalid verification code"));
        assert!(!flow.session().is_logged_in());

        flow.submit_code("123456", false).await.unwrap();
        assert_eq!(flow.step(), &LoginStep::Established);
        assert_eq!(flow.last_error(), None);
    }

    #[tokio::test]
    async fn malformed_code_is_rejected_locally() {
        let (mut flow, _) = flow(mfa_backend());
        flow.submit_credentials("ada@example.com", "pw").await.unwrap();
        let before = sent(&flow);

        assert!(flow.submit_code("12ab", false).await.is_err());
        assert_eq!(sent(&flow), before);
        assert!(flow.is_mfa_required());
    }

    #[tokio::test]
    async fn code_without_challenge_is_refused() {
        let (mut flow, _) = flow(mfa_backend());
        let err = flow.submit_code("123456", false).await.unwrap_err();
        assert!(matches!(err, Error::NoChallenge));
    }

    #[tokio::test]
    async fn restart_drops_the_challenge() {
        let (mut flow, _) = flow(mfa_backend());
        flow.submit_credentials("ada@example.com", "pw").await.unwrap();
        flow.restart();
        assert_eq!(flow.step(), &LoginStep::Credentials);
        assert!(matches!(
            flow.submit_code("123456", false).await,
            Err(Error::NoChallenge)
        ));
    }

    #[tokio::test]
    async fn login_without_mfa_goes_straight_to_session() {
        let (mut flow, _) = flow(ScriptedTransport::new(|_| {
            envelope_ok(json!({ "token": "t9", "user": user_json(false) }))
        }));
        let step = flow.submit_credentials("ada@example.com", "pw").await.unwrap();
        assert_eq!(step, &LoginStep::Established);
        assert!(flow.session().is_logged_in());
    }

    #[tokio::test]
    async fn google_callback_checks_state() {
        let (mut flow, _) = flow(mfa_backend());
        let google = GoogleSignIn::new(
            "gid",
            "https://app.example.com/auth/callback".parse().unwrap(),
        );
        let pending = google.authorization_url();

        let forged: Url = "https://app.example.com/auth/callback?code=c1&state=forged"
            .parse()
            .unwrap();
        let err = flow
            .complete_google_callback(&forged, &pending, &google)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StateMismatch));
        assert_eq!(sent(&flow), 0);

        let mut callback: Url = "https://app.example.com/auth/callback".parse().unwrap();
        callback
            .query_pairs_mut()
            .append_pair("code", "c1")
            .append_pair("state", &pending.state);
        let step = flow
            .complete_google_callback(&callback, &pending, &google)
            .await
            .unwrap();
        assert_eq!(step, &LoginStep::Established);

        let requests = flow.session().api().client().transport().requests();
        let body = requests[0].body().unwrap();
        assert_eq!(body["code"], "c1");
        assert_eq!(body["codeVerifier"], pending.code_verifier.expose_secret());
    }
}
