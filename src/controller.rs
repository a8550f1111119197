use std::fmt::Debug;

use tower_cookies::{Cookie, Cookies};

/// How the session id cookie is read from and written to the request's cookie jar.
pub trait CookieController: Debug + Clone + Send + Sync + 'static {
    fn get(&self, cookies: &Cookies, name: &str) -> Option<Cookie<'static>>;
    fn add(&self, cookies: &Cookies, cookie: Cookie<'static>);
}

/// Derive a cookie [`Key`](crate::Key) from a secret of any length.
///
/// The secret is hashed with SHA-256 and the digest is expanded with HKDF into signing and
/// encryption keys. The same secret always yields the same key, so every process sharing the
/// secret accepts the others' cookies.
#[cfg(any(feature = "signed", feature = "private"))]
pub fn key_from_secret(secret: &[u8]) -> crate::Key {
    use sha2::{Digest as _, Sha256};

    let master = Sha256::digest(secret);
    crate::Key::derive_from(master.as_slice())
}

#[cfg(feature = "dangerous-plaintext")]
#[derive(Debug, Clone, Copy, Default)]
pub struct DangerousPlaintextCookie;

#[cfg(feature = "dangerous-plaintext")]
impl CookieController for DangerousPlaintextCookie {
    fn get(&self, cookies: &Cookies, name: &str) -> Option<Cookie<'static>> {
        cookies.get(name).map(Cookie::into_owned)
    }

    fn add(&self, cookies: &Cookies, cookie: Cookie<'static>) {
        cookies.add(cookie);
    }
}

#[cfg(feature = "signed")]
#[derive(Debug, Clone)]
pub struct SignedCookie {
    key: crate::Key,
}

#[cfg(feature = "signed")]
impl SignedCookie {
    pub fn new(key: crate::Key) -> Self {
        Self { key }
    }
}

#[cfg(feature = "signed")]
impl CookieController for SignedCookie {
    fn get(&self, cookies: &Cookies, name: &str) -> Option<Cookie<'static>> {
        cookies.signed(&self.key).get(name).map(Cookie::into_owned)
    }

    fn add(&self, cookies: &Cookies, cookie: Cookie<'static>) {
        cookies.signed(&self.key).add(cookie);
    }
}

#[cfg(feature = "private")]
#[derive(Debug, Clone)]
pub struct PrivateCookie {
    key: crate::Key,
}

#[cfg(feature = "private")]
impl PrivateCookie {
    pub fn new(key: crate::Key) -> Self {
        Self { key }
    }
}

#[cfg(feature = "private")]
impl CookieController for PrivateCookie {
    fn get(&self, cookies: &Cookies, name: &str) -> Option<Cookie<'static>> {
        cookies.private(&self.key).get(name).map(Cookie::into_owned)
    }

    fn add(&self, cookies: &Cookies, cookie: Cookie<'static>) {
        cookies.private(&self.key).add(cookie);
    }
}
