use std::sync::Arc;

use axum::extract::State;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use axum_extra::extract::{CookieJar, PrivateCookieJar};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use super::config::ActionsConfig;
use super::error::ActionError;
use super::state::ActionState;
use crate::api::{self, LoginOutcome, LoginPayload, TokenGrant};
use crate::client::{ApiRequest, ApiResponse, Transport};
use crate::cookies::{
    self, AUTH_TOKEN_COOKIE, AUTH_USER_COOKIE, HAS_SESSION_COOKIE, REFRESH_TOKEN_COOKIE,
};
use crate::envelope;
use crate::secret::SecretString;
use crate::types::{AuthTokens, AuthUser};

type SessionReply = (PrivateCookieJar, CookieJar, Json<JsonValue>);

/// Router for the session-action layer, mounted under the configured base
/// path (default `/api/session`):
///
/// - `POST {base}/login`
/// - `POST {base}/mfa/verify`
/// - `POST {base}/refresh`
/// - `POST {base}/logout`
///
/// The backend's refresh token never reaches script: it is kept in an
/// encrypted, HTTP-only cookie and only decrypted here.
pub fn session_actions<T: Transport>(config: ActionsConfig, transport: T) -> Router {
    let base = config.base_path.clone();

    let state = ActionState {
        transport: Arc::new(transport),
        client: Arc::new(config.client),
        cookie_key: config.cookie_key,
    };

    Router::new()
        .route(&format!("{base}/login"), post(login::<T>))
        .route(&format!("{base}/mfa/verify"), post(verify_mfa::<T>))
        .route(&format!("{base}/refresh"), post(refresh::<T>))
        .route(&format!("{base}/logout"), post(logout::<T>))
        .with_state(state)
}

// ── Login ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login<T: Transport>(
    State(state): State<ActionState<T>>,
    private: PrivateCookieJar,
    plain: CookieJar,
    Json(body): Json<LoginBody>,
) -> Result<SessionReply, ActionError> {
    let request = api::login_request(&state.client, &body.email, &body.password)?;
    let payload: LoginPayload = envelope::handle_response(forward(&state, request).await?)?;

    match payload.into_outcome()? {
        LoginOutcome::MfaRequired { temp_token } => {
            tracing::info!("Login needs a second factor");
            let data = json!({ "requires_mfa": true, "temp_token": temp_token.expose_secret() });
            Ok((
                private,
                plain,
                Json(envelope::success("MFA verification required", data)),
            ))
        }
        LoginOutcome::Session { tokens, user } => Ok(establish(
            &state,
            private,
            plain,
            &tokens,
            &user,
            "Login successful",
        )),
    }
}

// ── MFA verification ───────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyBody {
    code: String,
    temp_token: String,
    #[serde(default)]
    use_backup_code: bool,
}

async fn verify_mfa<T: Transport>(
    State(state): State<ActionState<T>>,
    private: PrivateCookieJar,
    plain: CookieJar,
    Json(body): Json<VerifyBody>,
) -> Result<SessionReply, ActionError> {
    let temp_token = SecretString::new(body.temp_token);
    let request =
        api::verify_mfa_request(&state.client, &body.code, &temp_token, body.use_backup_code)?;
    let payload: LoginPayload = envelope::handle_response(forward(&state, request).await?)?;
    let (tokens, user) = payload.into_session()?;

    Ok(establish(
        &state,
        private,
        plain,
        &tokens,
        &user,
        "Verification successful",
    ))
}

// ── Refresh ────────────────────────────────────────────────────────

async fn refresh<T: Transport>(
    State(state): State<ActionState<T>>,
    private: PrivateCookieJar,
    plain: CookieJar,
) -> Response {
    let Some(refresh_token) = private
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| SecretString::new(c.value()))
        .filter(|t| !t.is_empty())
    else {
        tracing::debug!("Refresh requested without a refresh cookie");
        let (private, plain) = clear_session(private, plain);
        return (private, plain, ActionError::MissingRefreshToken).into_response();
    };

    match refresh_upstream(&state, &refresh_token).await {
        Ok(tokens) => {
            let secure = state.client.secure_cookies;
            let private = match &tokens.refresh_token {
                Some(rotated) => {
                    private.add(cookies::refresh_token_cookie(rotated.expose_secret(), secure))
                }
                None => private,
            };
            let plain = plain
                .add(cookies::has_session_cookie(secure))
                .add(cookies::auth_token_cookie(
                    tokens.access_token.expose_secret(),
                    secure,
                ));
            tracing::info!("Session refreshed via action layer");
            let data = json!({ "token": tokens.access_token.expose_secret() });
            (private, plain, Json(envelope::success("Token refreshed", data))).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Refresh rejected, clearing session cookies");
            let (private, plain) = clear_session(private, plain);
            (private, plain, e).into_response()
        }
    }
}

async fn refresh_upstream<T: Transport>(
    state: &ActionState<T>,
    refresh_token: &SecretString,
) -> Result<AuthTokens, ActionError> {
    let url = state.client.endpoint("auth/refresh")?;
    let request = with_refresh_cookie(api::refresh_request(url, refresh_token), refresh_token);
    let grant: TokenGrant = envelope::handle_response(forward(state, request).await?)?;
    Ok(grant.into_tokens())
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<T: Transport>(
    State(state): State<ActionState<T>>,
    headers: HeaderMap,
    private: PrivateCookieJar,
    plain: CookieJar,
) -> SessionReply {
    match api::logout_request(&state.client) {
        Ok(mut request) => {
            let bearer = headers.get(AUTHORIZATION).cloned().or_else(|| {
                plain
                    .get(AUTH_TOKEN_COOKIE)
                    .and_then(|c| HeaderValue::from_str(&format!("Bearer {}", c.value())).ok())
            });
            if let Some(value) = bearer {
                request = request.header(AUTHORIZATION, value);
            }
            if let Some(cookie) = private.get(REFRESH_TOKEN_COOKIE) {
                request = with_refresh_cookie(request, &SecretString::new(cookie.value()));
            }

            let outcome = match forward(&state, request).await {
                Ok(response) => envelope::handle_empty(response).map_err(ActionError::from),
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                tracing::warn!(error = %e, "Backend logout failed, clearing cookies anyway");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Cannot build backend logout request"),
    }

    let (private, plain) = clear_session(private, plain);
    tracing::info!("Session cleared via action layer");
    (
        private,
        plain,
        Json(envelope::success("Logged out", JsonValue::Null)),
    )
}

// ── Helpers ────────────────────────────────────────────────────────

async fn forward<T: Transport>(
    state: &ActionState<T>,
    request: ApiRequest,
) -> Result<ApiResponse, ActionError> {
    Ok(state.transport.send(request).await?)
}

fn with_refresh_cookie(request: ApiRequest, refresh_token: &SecretString) -> ApiRequest {
    match HeaderValue::from_str(&format!(
        "{REFRESH_TOKEN_COOKIE}={}",
        refresh_token.expose_secret()
    )) {
        Ok(mut value) => {
            value.set_sensitive(true);
            request.header(COOKIE, value)
        }
        Err(_) => request,
    }
}

/// Set the encrypted refresh cookie and the script-readable mirrors.
fn establish<T>(
    state: &ActionState<T>,
    private: PrivateCookieJar,
    plain: CookieJar,
    tokens: &AuthTokens,
    user: &AuthUser,
    message: &str,
) -> SessionReply {
    let secure = state.client.secure_cookies;
    let access = tokens.access_token.expose_secret();

    let private = match &tokens.refresh_token {
        Some(refresh) => private.add(cookies::refresh_token_cookie(refresh.expose_secret(), secure)),
        None => private,
    };

    let mut plain = plain
        .add(cookies::has_session_cookie(secure))
        .add(cookies::auth_token_cookie(access, secure));
    match serde_json::to_string(user) {
        // axum-extra percent-encodes cookie values on the way out.
        Ok(json) => plain = plain.add(cookies::auth_user_cookie(json, secure)),
        Err(e) => tracing::warn!(error = %e, "Failed to serialize user for cookie"),
    }

    tracing::info!(user_id = %user.id, "Session established via action layer");
    let data = json!({ "token": access, "user": user });
    (private, plain, Json(envelope::success(message, data)))
}

fn clear_session(private: PrivateCookieJar, plain: CookieJar) -> (PrivateCookieJar, CookieJar) {
    (
        private.remove(cookies::removal(REFRESH_TOKEN_COOKIE)),
        plain
            .remove(cookies::removal(HAS_SESSION_COOKIE))
            .remove(cookies::removal(AUTH_TOKEN_COOKIE))
            .remove(cookies::removal(AUTH_USER_COOKIE)),
    )
}
