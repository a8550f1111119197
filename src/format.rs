//! Helpers for encoding/decoding the session cookie value.
//!
//! The cookie only carries the session [`Id`]; the record itself lives in the session store.
//! Integrity (and optionally confidentiality) comes from the cookie controller, not from this
//! format.

use tower_sessions_core::{session::Id, session_store};

/// Encode a session [`Id`] into the cookie value.
pub fn encode_session_id(id: &Id) -> String {
    id.to_string()
}

/// Decode a cookie value into a session [`Id`].
pub fn decode_session_id(value: &str) -> session_store::Result<Id> {
    value
        .parse::<Id>()
        .map_err(|err| session_store::Error::Decode(format!("Invalid session id: {err}")))
}
