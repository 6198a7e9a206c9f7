use std::sync::{Mutex, PoisonError};

/// Where the session layer sends the user when it forces a route change
/// (after logout, or when a refresh fails).
///
/// A browser front-end implements this with a hard location change; a native
/// client switches screens.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Does nothing beyond a debug log.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNavigator;

impl Navigator for NullNavigator {
    fn navigate(&self, path: &str) {
        tracing::debug!(path, "Navigation requested with no navigator attached");
    }
}

/// Keeps every requested path, oldest first.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    history: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_owned());
    }
}
