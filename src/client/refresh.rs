//! Coalesces concurrent token refreshes into one backend call.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

use crate::error::Error;
use crate::secret::SecretString;

/// How a caller's refresh attempt was settled.
#[derive(Debug)]
pub(crate) enum Settled {
    /// This caller ran the refresh; the outcome is its own.
    Ran(Result<SecretString, Error>),
    /// Another caller refreshed after this request was sent. Whatever the
    /// token store holds now is the current session.
    Shared,
}

/// One refresh at a time; requests that were already in flight when a refresh
/// finished do not start another.
///
/// Callers read [`epoch`](Self::epoch) before sending and hand it back to
/// [`refresh`](Self::refresh) after a 401. If the epoch moved in between,
/// somebody else refreshed on their behalf.
#[derive(Debug)]
pub(crate) struct RefreshCoordinator {
    epoch: AtomicU64,
    running: Mutex<()>,
}

impl RefreshCoordinator {
    pub(crate) fn new() -> Self {
        Self {
            epoch: AtomicU64::new(0),
            running: Mutex::new(()),
        }
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub(crate) async fn refresh<F, Fut>(&self, seen_epoch: u64, run: F) -> Settled
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SecretString, Error>>,
    {
        let _running = self.running.lock().await;

        if self.epoch() != seen_epoch {
            tracing::debug!("Refresh already settled by a concurrent request");
            return Settled::Shared;
        }

        let outcome = run().await;
        self.epoch.fetch_add(1, Ordering::AcqRel);
        Settled::Ran(outcome)
    }
}
