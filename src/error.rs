use std::time::Duration;

use tower_sessions_core::{session, session_store};

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the session middleware, the writer and store start-up.
///
/// Every per-request variant renders as a bare `500 Internal Server Error`; the details are only
/// ever logged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The session store could not be reached while starting up.
    #[error("session store at {endpoint} is unavailable: {message}")]
    StoreUnavailable { endpoint: String, message: String },

    #[error("failed to fetch session")]
    SessionFetch(#[source] session::Error),

    #[error("failed to save session")]
    SessionSave(#[source] session::Error),

    /// The request never went through `SessionContextLayer`.
    #[error("request has no session; is `SessionContextLayer` installed?")]
    MissingSession,

    #[error("failed to generate state token: {0}")]
    StateToken(getrandom::Error),
}

pub(crate) fn timed_out(limit: Duration) -> session::Error {
    session::Error::Store(session_store::Error::Backend(format!(
        "session store call timed out after {}ms",
        limit.as_millis()
    )))
}

pub(crate) fn server_error<ResBody: Default>() -> http::Response<ResBody> {
    let mut res = http::Response::default();
    *res.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
    res
}

#[cfg(feature = "axum-core")]
impl axum_core::response::IntoResponse for Error {
    fn into_response(self) -> axum_core::response::Response {
        tracing::error!(
            err = &self as &dyn std::error::Error,
            "session request failed"
        );
        server_error()
    }
}
