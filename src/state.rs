//! CSRF state tokens.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

use crate::error::Error;

const TOKEN_BYTES: usize = 32;

/// An unpredictable token stored in the session under `state`.
///
/// The token is 256 bits from the operating system's CSPRNG, base64url encoded without padding.
#[derive(Clone, PartialEq, Eq)]
pub struct StateToken(String);

impl StateToken {
    pub fn generate() -> Result<Self, Error> {
        let mut buf = [0u8; TOKEN_BYTES];
        getrandom::getrandom(&mut buf).map_err(Error::StateToken)?;
        Ok(Self(URL_SAFE_NO_PAD.encode(buf)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<StateToken> for String {
    fn from(token: StateToken) -> Self {
        token.0
    }
}

// Keep the token out of logs.
impl std::fmt::Debug for StateToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StateToken(..)")
    }
}
