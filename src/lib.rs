//! Session initialization middleware for `tower-sessions` stores.
//!
//! [`SessionContextLayer`] makes sure every request carries an initialized session: a random
//! CSRF `state` token and an `authenticated` flag (initially `false`). The session is persisted
//! before the inner service runs, its id is carried in a signed (or private) cookie, and a typed
//! [`SessionContext`] snapshot is inserted into the request extensions for downstream handlers.
//!
//! Once an external identity check has succeeded, [`save_session`] marks the session
//! authenticated, merges identity attributes such as `name` and `email`, and returns a request
//! carrying a fresh context for the rest of the chain.
//!
//! # Concurrency
//! The layer takes no locks. Two requests for the same session that both save are
//! last-write-wins on the whole record: the final record is exactly one of the two writes.
//!
//! # Security
//! Session id cookies are signed by default (`signed` feature); `private` encrypts them as well.
//! The `dangerous-plaintext` feature offers **no tamper resistance** and should only be used for
//! **testing and debugging**.

mod config;
mod context;
mod controller;
mod error;
pub mod format;
mod handler;
mod layer;
#[cfg(feature = "redis")]
pub mod redis;
mod state;
mod store;
mod writer;

pub use tower_cookies::cookie::SameSite;
pub use tower_sessions_core::{Session, SessionStore, session::Expiry, session_store};

#[cfg(any(feature = "signed", feature = "private"))]
pub use tower_cookies::Key;

pub use crate::config::{DEFAULT_COOKIE_NAME, SavePolicy, SessionContextConfig};
pub use crate::context::SessionContext;
pub use crate::controller::CookieController;
pub use crate::error::{Error, Result};
pub use crate::handler::{GUEST_NAME, greeting, user_info};
pub use crate::layer::{SessionContextLayer, SessionContextManager};
pub use crate::state::StateToken;
pub use crate::writer::{SaveError, save_session};

#[cfg(any(feature = "signed", feature = "private"))]
pub use crate::controller::key_from_secret;

#[cfg(feature = "signed")]
pub use crate::controller::SignedCookie;

#[cfg(feature = "private")]
pub use crate::controller::PrivateCookie;

#[cfg(feature = "dangerous-plaintext")]
pub use crate::controller::DangerousPlaintextCookie;

/// Session key holding the CSRF state token (string).
pub const STATE_KEY: &str = "state";
/// Session key holding the authentication flag (bool).
pub const AUTHENTICATED_KEY: &str = "authenticated";
pub const NAME_KEY: &str = "name";
pub const EMAIL_KEY: &str = "email";
