use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};
use url::Url;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::secret::SecretString;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google sign-in for the `/auth/callback` route.
///
/// The browser is sent to Google with a random `state` and a PKCE challenge;
/// the code that comes back is exchanged by the backend (`auth/google`), never
/// here, so no client secret lives in the front-end.
///
/// ```rust,ignore
/// use spaces_session::GoogleSignIn;
///
/// let google = GoogleSignIn::new("client-id", "https://app.example/auth/callback".parse()?);
/// let request = google.authorization_url();
/// // keep request.state and request.code_verifier until the callback
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct GoogleSignIn {
    pub(crate) client_id: String,
    pub(crate) auth_url: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) scopes: Vec<String>,
}

impl GoogleSignIn {
    #[must_use]
    pub fn new(client_id: impl Into<String>, redirect_uri: Url) -> Self {
        Self {
            client_id: client_id.into(),
            auth_url: GOOGLE_AUTH_URL.parse().expect("valid default URL"),
            redirect_uri,
            scopes: vec!["openid".into(), "email".into(), "profile".into()],
        }
    }

    /// Build from the client config; fails when `GOOGLE_CLIENT_ID` was not set.
    pub fn from_config(config: &ClientConfig, redirect_uri: Url) -> Result<Self, Error> {
        let client_id = config
            .google_client_id()
            .ok_or_else(|| Error::Config("GOOGLE_CLIENT_ID is not configured".into()))?;
        Ok(Self::new(client_id, redirect_uri))
    }

    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Fresh authorization URL; state and verifier differ on every call.
    #[must_use]
    pub fn authorization_url(&self) -> AuthorizationRequest {
        let state = random_token::<16>();
        let code_verifier = random_token::<48>();
        let code_challenge = code_challenge(&code_verifier);

        let mut url = self.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", &state)
            .append_pair("code_challenge", &code_challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("prompt", "select_account");

        AuthorizationRequest {
            url,
            state,
            code_verifier: SecretString::new(code_verifier),
        }
    }
}

/// Where to send the browser, plus what to keep until the callback.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: Url,
    pub state: String,
    pub code_verifier: SecretString,
}

/// Query parameters Google appends to the callback URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => params.code = Some(value.into_owned()),
                "state" => params.state = Some(value.into_owned()),
                "error" => params.error = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }

    /// The authorization code, once `state` matched what was sent.
    pub fn verified_code(&self, expected_state: &str) -> Result<&str, Error> {
        if let Some(error) = &self.error {
            return Err(Error::Api {
                status: 400,
                message: format!("Google sign-in failed: {error}"),
            });
        }
        let returned = self.state.as_deref().unwrap_or_default();
        if !constant_time_eq(returned.as_bytes(), expected_state.as_bytes()) {
            tracing::warn!("OAuth state mismatch on Google callback");
            return Err(Error::StateMismatch);
        }
        self.code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::Decode("callback has no authorization code".into()))
    }
}

/// `N` random bytes, base64url without padding.
fn random_token<const N: usize>() -> String {
    let bytes: [u8; N] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256: `BASE64URL(SHA256(verifier))`.
fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
