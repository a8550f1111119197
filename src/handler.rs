//! A small consumer of [`SessionContext`].

use crate::context::SessionContext;

/// Shown in place of a name when the session has none.
pub const GUEST_NAME: &str = "guest";

/// Render `Hello <name>!` with the name HTML-escaped.
pub fn greeting(context: &SessionContext) -> String {
    let name = context.name().unwrap_or(GUEST_NAME);
    format!("Hello {}!", html_escape::encode_safe(name))
}

/// Handler greeting the session's user by name.
///
/// Usable directly as an axum handler: it extracts the [`SessionContext`] and responds with a
/// `text/plain` body.
pub async fn user_info(context: SessionContext) -> String {
    tracing::debug!(has_name = context.name().is_some(), "user info requested");
    greeting(&context)
}
