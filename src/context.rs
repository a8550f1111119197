//! The typed, request-scoped view of a session.

use std::collections::BTreeMap;

use serde_json::Value;
use tower_sessions_core::{Session, session};

use crate::{AUTHENTICATED_KEY, EMAIL_KEY, NAME_KEY, STATE_KEY};

/// Immutable snapshot of selected session fields, attached to every request that passes through
/// [`SessionContextLayer`](crate::SessionContextLayer).
///
/// The snapshot reflects the session as the middleware last saved it. Writing to the session
/// later in the chain (see [`save_session`](crate::save_session)) produces a *new* context on the
/// returned request; this value is never updated in place.
///
/// Accessors never panic: anything that may be missing, or was stored with an unexpected type, is
/// reported as `None`.
///
/// # Examples
///
/// ```
/// use tower_sessions_context::SessionContext;
///
/// let context = SessionContext::default().with_value("name", "Alice");
/// assert_eq!(context.name(), Some("Alice"));
/// assert_eq!(context.email(), None);
/// assert!(!context.authenticated());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    authenticated: bool,
    state: String,
    name: Option<String>,
    email: Option<String>,
    extra: BTreeMap<String, String>,
}

impl SessionContext {
    /// Snapshot the recognized fields of `session`.
    pub async fn from_session(session: &Session) -> Result<Self, session::Error> {
        Ok(Self::from_values(
            session.get_value(AUTHENTICATED_KEY).await?,
            session.get_value(STATE_KEY).await?,
            session.get_value(NAME_KEY).await?,
            session.get_value(EMAIL_KEY).await?,
        ))
    }

    fn from_values(
        authenticated: Option<Value>,
        state: Option<Value>,
        name: Option<Value>,
        email: Option<Value>,
    ) -> Self {
        Self {
            authenticated: matches!(authenticated, Some(Value::Bool(true))),
            state: string_value(state).unwrap_or_default(),
            name: string_value(name),
            email: string_value(email),
            extra: BTreeMap::new(),
        }
    }

    pub fn authenticated(&self) -> bool {
        self.authenticated
    }

    /// The CSRF state token, or `None` if the session has not been initialized.
    pub fn state(&self) -> Option<&str> {
        Some(self.state.as_str()).filter(|s| !s.is_empty())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Look up any string field by session key, including extension keys added by the writer.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            STATE_KEY => self.state(),
            NAME_KEY => self.name(),
            EMAIL_KEY => self.email(),
            _ => self.extra.get(key).map(String::as_str),
        }
    }

    /// Derive a new context with `key` set to `value`. Other keys are carried over.
    ///
    /// `authenticated` is not a string field and is ignored here; use
    /// [`with_authenticated`](Self::with_authenticated).
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match key.as_str() {
            STATE_KEY => self.state = value,
            NAME_KEY => self.name = Some(value),
            EMAIL_KEY => self.email = Some(value),
            AUTHENTICATED_KEY => {}
            _ => {
                self.extra.insert(key, value);
            }
        }
        self
    }

    #[must_use]
    pub fn with_authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }
}

fn string_value(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

#[cfg(feature = "axum-core")]
impl<S> axum_core::extract::FromRequestParts<S> for SessionContext
where
    S: Sync + Send,
{
    type Rejection = (http::StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<SessionContext>().cloned().ok_or((
            http::StatusCode::INTERNAL_SERVER_ERROR,
            "Can't extract session context. Is `SessionContextLayer` enabled?",
        ))
    }
}

#[cfg(feature = "axum-core")]
impl<S> axum_core::extract::OptionalFromRequestParts<S> for SessionContext
where
    S: Sync + Send,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<SessionContext>().cloned())
    }
}
