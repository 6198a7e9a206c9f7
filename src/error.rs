use crate::validators::ValidationError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Client-side schema check failed; nothing was sent.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with the error envelope or a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Authorization could not be recovered by a refresh; local session was cleared.
    #[error("Session expired")]
    SessionExpired,

    #[error("No MFA challenge in progress")]
    NoChallenge,

    #[error("OAuth state mismatch")]
    StateMismatch,

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status carried by an API error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the error is the backend rejecting credentials or a code.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}
