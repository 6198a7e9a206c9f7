use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::envelope;
use crate::validators::ValidationError;

/// Failures of the session-action routes, answered in the error envelope.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// Request body failed the client-side schema; the backend was not called.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backend said no; its status and message are passed on.
    #[error("{message}")]
    Backend { status: u16, message: String },

    #[error("No refresh token")]
    MissingRefreshToken,

    /// Backend unreachable or answered something unreadable.
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            Self::Backend { status, message } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                message.clone(),
            ),
            Self::MissingRefreshToken => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::Upstream(_) => {
                tracing::error!(error = %self, "Session action failed upstream");
                (StatusCode::BAD_GATEWAY, "Authentication service unavailable".to_owned())
            }
        };
        (status, Json(envelope::failure(status.as_u16(), &message))).into_response()
    }
}

impl From<crate::error::Error> for ActionError {
    fn from(e: crate::error::Error) -> Self {
        use crate::error::Error;
        match e {
            Error::Validation(v) => Self::Validation(v),
            Error::Api { status, message } => Self::Backend { status, message },
            Error::SessionExpired => Self::MissingRefreshToken,
            other => Self::Upstream(other.to_string()),
        }
    }
}
