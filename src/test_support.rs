//! Shared fixtures for unit tests.

use std::sync::{Mutex, PoisonError};

use reqwest::StatusCode;
use serde_json::{Value as JsonValue, json};

use crate::client::{ApiRequest, ApiResponse, Transport};
use crate::config::ClientConfig;
use crate::envelope;
use crate::error::Error;

type Handler = Box<dyn Fn(&ApiRequest) -> ApiResponse + Send + Sync>;

/// Transport answering from a closure and logging every request it saw.
///
/// Yields once per request so that joined futures actually interleave.
pub(crate) struct ScriptedTransport {
    handler: Handler,
    log: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(handler: impl Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            log: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn count_path(&self, suffix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.url().path().ends_with(suffix))
            .count()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        tokio::task::yield_now().await;
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        Ok((self.handler)(&request))
    }
}

pub(crate) fn test_config() -> ClientConfig {
    ClientConfig::new("https://api.example.com".parse().expect("static url"))
}

pub(crate) fn envelope_ok(data: JsonValue) -> ApiResponse {
    ApiResponse::json(StatusCode::OK, &envelope::success("ok", data))
}

pub(crate) fn failure(status: StatusCode, message: &str) -> ApiResponse {
    ApiResponse::json(status, &envelope::failure(status.as_u16(), message))
}

pub(crate) fn unauthorized() -> ApiResponse {
    failure(StatusCode::UNAUTHORIZED, "Unauthorized")
}

pub(crate) fn user_json(mfa_enabled: bool) -> JsonValue {
    json!({
        "id": "u-1",
        "email": "ada@example.com",
        "username": "ada",
        "created_at": "2024-03-01T10:00:00Z",
        "mfa_enabled": mfa_enabled,
    })
}
