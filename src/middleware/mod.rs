//! Axum side of the session lifecycle.
//!
//! Two pieces, usable separately:
//!
//! - the **route gate**, a presence-only cookie check that redirects between
//!   protected pages and the auth pages;
//! - the **session actions**, server routes that proxy login, MFA
//!   verification, refresh and logout to the backend and own the encrypted
//!   HTTP-only refresh cookie.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use spaces_session::middleware::{ActionsConfig, GateConfig, apply_route_gate, session_actions};
//! use spaces_session::ReqwestTransport;
//!
//! let actions = session_actions(ActionsConfig::from_env()?, ReqwestTransport::new());
//! let app = apply_route_gate(pages_router(), GateConfig::default()).merge(actions);
//! ```

mod actions;
mod config;
mod error;
mod extractor;
mod gate;
mod state;

pub use actions::session_actions;
pub use config::{ActionsConfig, GateConfig};
pub use error::ActionError;
pub use extractor::SessionCookies;
pub use gate::{GateDecision, apply_route_gate, decide, route_gate};

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
