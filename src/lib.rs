#![doc = include_str!("../README.md")]

pub mod api;
pub mod client;
pub mod config;
pub mod cookies;
pub mod envelope;
pub mod error;
pub mod login;
#[cfg(feature = "server")]
pub mod middleware;
pub mod navigator;
pub mod oauth;
pub mod paths;
pub mod secret;
pub mod session;
pub mod store;
pub mod types;
pub mod validators;

#[cfg(test)]
mod test_support;

// Re-exports for convenient access
pub use api::{AuthApi, LoginOutcome, MfaEnabled, ProfileUpdate, TokenGrant};
pub use client::{ApiClient, ApiRequest, ApiResponse, ReqwestTransport, Transport};
pub use config::ClientConfig;
pub use error::Error;
pub use login::{LoginFlow, LoginStep};
pub use navigator::{Navigator, NullNavigator, RecordingNavigator};
pub use oauth::{AuthorizationRequest, CallbackParams, GoogleSignIn};
pub use paths::AppRoutes;
pub use secret::SecretString;
pub use session::{SessionContext, SessionState};
pub use store::{FileStorage, MemoryStorage, Storage, StorageError, TokenStore};
pub use types::{AuthProvider, AuthTokens, AuthUser, UserId};
pub use validators::ValidationError;
