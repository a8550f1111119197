use std::{future::Future, sync::Arc, time::Duration};

use serde_json::Value;
use tower_sessions_core::{Session, SessionStore, session, session::Id};

use crate::{
    AUTHENTICATED_KEY, STATE_KEY,
    config::SessionContextConfig,
    error::{Error, timed_out},
    state::StateToken,
};

/// Deadline applied to store calls for the current request.
///
/// Inserted into request extensions next to the [`Session`] so the writer honours the same limit
/// as the middleware.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StoreDeadline(pub(crate) Option<Duration>);

impl StoreDeadline {
    pub(crate) async fn run<T, F>(self, fut: F) -> Result<T, session::Error>
    where
        F: Future<Output = Result<T, session::Error>>,
    {
        match self.0 {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| timed_out(limit))?,
            None => fut.await,
        }
    }
}

/// Fetch-or-create the session addressed by `session_id`.
///
/// Nothing is read from the store yet; the record is loaded by the first access. An id the store
/// does not know yields a fresh, empty session.
pub(crate) fn fetch<Store: SessionStore>(
    store: Arc<Store>,
    session_id: Option<Id>,
    config: &SessionContextConfig,
) -> Session {
    Session::new(session_id, store, config.expiry)
}

/// Populate `state` and `authenticated` when they are missing.
///
/// Values already present are left untouched, so repeated passes are idempotent. A value of the
/// wrong type counts as missing.
pub(crate) async fn initialize(session: &Session, deadline: StoreDeadline) -> Result<(), Error> {
    let state = deadline
        .run(session.get_value(STATE_KEY))
        .await
        .map_err(Error::SessionFetch)?;
    if !matches!(state, Some(Value::String(ref s)) if !s.is_empty()) {
        let token = StateToken::generate()?;
        tracing::debug!("no state in session, assigning a fresh token");
        session
            .insert_value(STATE_KEY, Value::String(token.into()))
            .await
            .map_err(Error::SessionFetch)?;
    }

    let authenticated = session
        .get_value(AUTHENTICATED_KEY)
        .await
        .map_err(Error::SessionFetch)?;
    if !matches!(authenticated, Some(Value::Bool(_))) {
        tracing::debug!("user not previously authenticated");
        session
            .insert_value(AUTHENTICATED_KEY, Value::Bool(false))
            .await
            .map_err(Error::SessionFetch)?;
    }

    Ok(())
}

/// Persist the whole session record.
///
/// Concurrent saves of the same session are last-write-wins at the granularity of this call.
pub(crate) async fn persist(session: &Session, deadline: StoreDeadline) -> Result<(), Error> {
    deadline
        .run(session.save())
        .await
        .map_err(Error::SessionSave)
}
