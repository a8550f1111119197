//! Marking a session authenticated and merging identity attributes into it.

use std::fmt;

use http::Request;
use serde_json::Value;
use tower_sessions_core::Session;

use crate::{
    AUTHENTICATED_KEY, STATE_KEY,
    context::SessionContext,
    error::Error,
    store::{self, StoreDeadline},
};

/// Mark the request's session authenticated and merge `info` into it.
///
/// Every `(key, value)` pair is written to the session and folded into a new [`SessionContext`]
/// derived from the request's current one. The returned request carries that new context and
/// must be passed to any handler that runs afterwards; the original context is left as it was.
///
/// `state` and `authenticated` cannot be set through `info` and are skipped.
///
/// # Errors
///
/// - [`Error::MissingSession`] if the request did not pass through
///   [`SessionContextLayer`](crate::SessionContextLayer).
/// - [`Error::SessionFetch`] if the session could not be loaded. The request is returned
///   unchanged.
/// - [`Error::SessionSave`] if persisting failed. The request returned inside the error already
///   carries the updated context; the in-memory session has been modified regardless.
///
/// A request is handed back in every case, see [`SaveError::into_parts`].
///
/// # Examples
///
/// ```no_run
/// use axum::{body::Body, http::Request, response::IntoResponse};
/// use tower_sessions_context::{greeting, save_session, SessionContext};
///
/// async fn callback(req: Request<Body>) -> axum::response::Response {
///     // ...after the identity provider vouched for this user...
///     let info = [("name", "Alice"), ("email", "a@x.com")];
///     match save_session(req, info).await {
///         Ok(req) => {
///             let context = req.extensions().get::<SessionContext>().cloned();
///             greeting(&context.unwrap_or_default()).into_response()
///         }
///         Err(err) => err.into_response(),
///     }
/// }
/// ```
pub async fn save_session<B, I, K, V>(
    mut req: Request<B>,
    info: I,
) -> Result<Request<B>, SaveError<B>>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    tracing::debug!("saving identity into session");
    let Some(session) = req.extensions().get::<Session>().cloned() else {
        return Err(SaveError::new(req, Error::MissingSession));
    };
    let deadline = req
        .extensions()
        .get::<StoreDeadline>()
        .copied()
        .unwrap_or_default();

    if let Err(err) = deadline
        .run(session.insert_value(AUTHENTICATED_KEY, Value::Bool(true)))
        .await
    {
        return Err(SaveError::new(req, Error::SessionFetch(err)));
    }

    let mut context = req
        .extensions()
        .get::<SessionContext>()
        .cloned()
        .unwrap_or_default()
        .with_authenticated(true);

    for (key, value) in info {
        let key = key.into();
        let value = value.into();
        if key == STATE_KEY || key == AUTHENTICATED_KEY {
            tracing::warn!(key = %key, "refusing to overwrite reserved session key");
            continue;
        }

        tracing::debug!(key = %key, "saving session key");
        if let Err(err) = session.insert_value(&key, Value::String(value.clone())).await {
            return Err(SaveError::new(req, Error::SessionFetch(err)));
        }
        context = context.with_value(key, value);
    }

    let saved = store::persist(&session, deadline).await;
    req.extensions_mut().insert(context);

    match saved {
        Ok(()) => Ok(req),
        Err(err) => Err(SaveError::new(req, err)),
    }
}

/// A failed [`save_session`] call, holding the request so the chain can continue.
pub struct SaveError<B> {
    request: Request<B>,
    error: Error,
}

impl<B> SaveError<B> {
    fn new(request: Request<B>, error: Error) -> Self {
        Self { request, error }
    }

    pub fn error(&self) -> &Error {
        &self.error
    }

    pub fn request(&self) -> &Request<B> {
        &self.request
    }

    pub fn into_parts(self) -> (Request<B>, Error) {
        (self.request, self.error)
    }

    pub fn into_request(self) -> Request<B> {
        self.request
    }
}

impl<B> fmt::Debug for SaveError<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveError")
            .field("method", self.request.method())
            .field("uri", self.request.uri())
            .field("error", &self.error)
            .finish()
    }
}

impl<B> fmt::Display for SaveError<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<B> std::error::Error for SaveError<B> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(feature = "axum-core")]
impl<B> axum_core::response::IntoResponse for SaveError<B> {
    fn into_response(self) -> axum_core::response::Response {
        self.error.into_response()
    }
}
