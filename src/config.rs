use std::{borrow::Cow, time::Duration};

use time::OffsetDateTime;
use tower_cookies::Cookie;

use crate::{Expiry, SameSite};

/// Default name of the cookie carrying the session id.
pub const DEFAULT_COOKIE_NAME: &str = "auth_sample";

/// What the middleware does when persisting a freshly initialized session fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SavePolicy {
    /// Log the failure and keep serving the request with the in-memory session. No cookie is
    /// issued for that response.
    #[default]
    BestEffort,
    /// Respond with `500 Internal Server Error` without calling the inner service.
    Strict,
}

#[derive(Debug, Clone)]
pub struct SessionContextConfig {
    pub(crate) name: Cow<'static, str>,
    pub(crate) http_only: bool,
    pub(crate) same_site: SameSite,
    pub(crate) expiry: Option<Expiry>,
    pub(crate) secure: bool,
    pub(crate) path: Cow<'static, str>,
    pub(crate) domain: Option<Cow<'static, str>>,
    pub(crate) save_policy: SavePolicy,
    pub(crate) store_timeout: Option<Duration>,
}

impl Default for SessionContextConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.into(),
            http_only: true,
            // Lax so the cookie survives the top-level redirect back from an identity provider.
            same_site: SameSite::Lax,
            expiry: None,
            secure: true,
            path: "/".into(),
            domain: None,
            save_policy: SavePolicy::BestEffort,
            store_timeout: None,
        }
    }
}

impl SessionContextConfig {
    #[must_use]
    pub fn with_name<N: Into<Cow<'static, str>>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    #[must_use]
    pub fn with_expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = Some(expiry);
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_path<P: Into<Cow<'static, str>>>(mut self, path: P) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_domain<D: Into<Cow<'static, str>>>(mut self, domain: D) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn without_domain(mut self) -> Self {
        self.domain = None;
        self
    }

    #[must_use]
    pub fn with_save_policy(mut self, save_policy: SavePolicy) -> Self {
        self.save_policy = save_policy;
        self
    }

    /// Bound every store call (load and save) made by the middleware and the writer.
    ///
    /// There is no deadline by default.
    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn without_store_timeout(mut self) -> Self {
        self.store_timeout = None;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn build_cookie(
        &self,
        value: String,
        expiry: Option<Expiry>,
        expiry_date: OffsetDateTime,
    ) -> Cookie<'static> {
        let mut cookie_builder = Cookie::build((self.name.clone(), value))
            .http_only(self.http_only)
            .same_site(self.same_site)
            .secure(self.secure)
            .path(self.path.clone());

        match expiry {
            Some(Expiry::OnInactivity(_)) | Some(Expiry::AtDateTime(_)) => {
                let max_age = std::cmp::max(
                    expiry_date - OffsetDateTime::now_utc(),
                    time::Duration::ZERO,
                );
                cookie_builder = cookie_builder.max_age(max_age);
            }
            Some(Expiry::OnSessionEnd) | None => {}
        }

        if let Some(domain) = self.domain.clone() {
            cookie_builder = cookie_builder.domain(domain);
        }

        cookie_builder.build()
    }
}
