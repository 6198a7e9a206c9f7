//! The backend's JSON envelope.
//!
//! Success: `{"status": "success", "message": "...", "data": ...}`.
//! Failure: `{"error": true, "status": 401, "message": "..."}`.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Value as JsonValue, json};

use crate::client::ApiResponse;
use crate::error::Error;

/// Throw on the error shape or a non-success status, unwrap `data` otherwise.
pub fn handle_response<T: DeserializeOwned>(response: ApiResponse) -> Result<T, Error> {
    let mut body = checked_body(&response)?;
    let data = body
        .get_mut("data")
        .map(JsonValue::take)
        .ok_or_else(|| Error::Decode("response has no data".into()))?;
    serde_json::from_value(data).map_err(Into::into)
}

/// Like [`handle_response`] for endpoints whose `data` is irrelevant.
pub fn handle_empty(response: ApiResponse) -> Result<(), Error> {
    checked_body(&response).map(|_| ())
}

fn checked_body(response: &ApiResponse) -> Result<JsonValue, Error> {
    let status = response.status();
    let body: JsonValue = if response.body().is_empty() {
        JsonValue::Null
    } else {
        match serde_json::from_slice(response.body()) {
            Ok(value) => value,
            Err(_) if !status.is_success() => {
                return Err(Error::Api {
                    status: status.as_u16(),
                    message: String::from_utf8_lossy(response.body()).trim().to_owned(),
                });
            }
            Err(e) => return Err(e.into()),
        }
    };

    if status.is_success() && !is_error_shape(&body) {
        return Ok(body);
    }

    let reported = body
        .get("status")
        .and_then(JsonValue::as_u64)
        .and_then(|s| u16::try_from(s).ok());
    let status = if status.is_success() {
        reported.unwrap_or(StatusCode::BAD_REQUEST.as_u16())
    } else {
        status.as_u16()
    };
    Err(Error::Api {
        status,
        message: error_message(&body, status),
    })
}

fn is_error_shape(body: &JsonValue) -> bool {
    match body.get("error") {
        None | Some(JsonValue::Null | JsonValue::Bool(false)) => false,
        Some(JsonValue::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn error_message(body: &JsonValue, status: u16) -> String {
    body.get("message")
        .and_then(JsonValue::as_str)
        .or_else(|| body.get("error").and_then(JsonValue::as_str))
        .map(str::to_owned)
        .or_else(|| {
            StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| "Request failed".to_owned())
}

/// Success envelope around `data`.
#[cfg_attr(not(feature = "server"), allow(dead_code))]
pub(crate) fn success(message: &str, data: JsonValue) -> JsonValue {
    json!({ "status": "success", "message": message, "data": data })
}

/// Error envelope, as the backend would send it.
#[cfg_attr(not(feature = "server"), allow(dead_code))]
pub(crate) fn failure(status: u16, message: &str) -> JsonValue {
    json!({ "error": true, "status": status, "message": message })
}
