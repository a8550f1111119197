use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use http::{Request, Response};
use tower_cookies::{CookieManager, Cookies};
use tower_layer::Layer;
use tower_service::Service;
use tower_sessions_core::{Session, SessionStore, session::Id};

use crate::{
    config::{SavePolicy, SessionContextConfig},
    context::SessionContext,
    controller::CookieController,
    error::{Error, server_error},
    format, store,
    store::StoreDeadline,
};

/// Layer guaranteeing every request carries an initialized session.
///
/// The store is shared by every request the layer serves. It must be safe for concurrent use;
/// the layer takes no locks of its own.
#[derive(Debug)]
pub struct SessionContextLayer<Store: SessionStore, C: CookieController> {
    store: Arc<Store>,
    config: SessionContextConfig,
    controller: C,
}

// Manual impl: `Arc<Store>` is cloneable whether or not `Store` is.
impl<Store: SessionStore, C: CookieController> Clone for SessionContextLayer<Store, C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
            controller: self.controller.clone(),
        }
    }
}

impl<Store: SessionStore, C: CookieController> SessionContextLayer<Store, C> {
    #[must_use]
    pub fn new(store: Store, controller: C) -> Self {
        Self {
            store: Arc::new(store),
            config: SessionContextConfig::default(),
            controller,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: SessionContextConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_controller<C2: CookieController>(
        self,
        controller: C2,
    ) -> SessionContextLayer<Store, C2> {
        SessionContextLayer {
            store: self.store,
            config: self.config,
            controller,
        }
    }
}

#[cfg(feature = "signed")]
impl<Store: SessionStore> SessionContextLayer<Store, crate::SignedCookie> {
    /// Session id cookies signed with `key`.
    #[must_use]
    pub fn signed(store: Store, key: crate::Key) -> Self {
        Self::new(store, crate::SignedCookie::new(key))
    }
}

#[cfg(feature = "private")]
impl<Store: SessionStore> SessionContextLayer<Store, crate::PrivateCookie> {
    /// Session id cookies encrypted and authenticated with `key`.
    #[must_use]
    pub fn private(store: Store, key: crate::Key) -> Self {
        Self::new(store, crate::PrivateCookie::new(key))
    }
}

#[cfg(feature = "dangerous-plaintext")]
impl<Store: SessionStore> SessionContextLayer<Store, crate::DangerousPlaintextCookie> {
    /// Unprotected session id cookies. Testing and debugging only.
    #[must_use]
    pub fn dangerous_plaintext(store: Store) -> Self {
        Self::new(store, crate::DangerousPlaintextCookie)
    }
}

#[derive(Debug)]
pub struct SessionContextManager<S, Store: SessionStore, C: CookieController> {
    pub(crate) inner: S,
    pub(crate) store: Arc<Store>,
    pub(crate) config: SessionContextConfig,
    pub(crate) controller: C,
}

impl<S: Clone, Store: SessionStore, C: CookieController> Clone
    for SessionContextManager<S, Store, C>
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            store: self.store.clone(),
            config: self.config.clone(),
            controller: self.controller.clone(),
        }
    }
}

impl<S, Store: SessionStore, C: CookieController> Layer<S> for SessionContextLayer<Store, C> {
    type Service = CookieManager<SessionContextManager<S, Store, C>>;

    fn layer(&self, inner: S) -> Self::Service {
        CookieManager::new(SessionContextManager {
            inner,
            store: self.store.clone(),
            config: self.config.clone(),
            controller: self.controller.clone(),
        })
    }
}

impl<ReqBody, ResBody, S, Store, C> Service<Request<ReqBody>> for SessionContextManager<S, Store, C>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Default + Send,
    Store: SessionStore,
    C: CookieController,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let session_store = self.store.clone();
        let config = self.config.clone();
        let controller = self.controller.clone();

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let Some(cookies) = req.extensions().get::<Cookies>().cloned() else {
                tracing::error!("cookie jar missing from request extensions");
                return Ok(server_error());
            };

            let session_id = controller
                .get(&cookies, &config.name)
                .and_then(|cookie| match format::decode_session_id(cookie.value()) {
                    Ok(id) => Some(id),
                    Err(err) => {
                        tracing::warn!(err = %err, "ignoring undecodable session cookie");
                        None
                    }
                });

            tracing::debug!(name = %config.name, "getting session");
            let deadline = StoreDeadline(config.store_timeout);
            let session = store::fetch(session_store, session_id, &config);

            if let Err(err) = store::initialize(&session, deadline).await {
                tracing::error!(
                    err = &err as &dyn std::error::Error,
                    "session initialization failed, aborting request"
                );
                return Ok(server_error());
            }

            let issued_id = match store::persist(&session, deadline).await {
                Ok(()) => issue_cookie(&session, &cookies, &controller, &config),
                Err(err) if config.save_policy == SavePolicy::Strict => {
                    tracing::error!(
                        err = &err as &dyn std::error::Error,
                        "session save failed, aborting request"
                    );
                    return Ok(server_error());
                }
                Err(err) => {
                    tracing::warn!(
                        err = &err as &dyn std::error::Error,
                        "session save failed, continuing with in-memory session"
                    );
                    session.id()
                }
            };

            let context = match SessionContext::from_session(&session).await {
                Ok(context) => context,
                Err(err) => {
                    let err = Error::SessionFetch(err);
                    tracing::error!(
                        err = &err as &dyn std::error::Error,
                        "session context unavailable, aborting request"
                    );
                    return Ok(server_error());
                }
            };

            tracing::debug!(
                authenticated = context.authenticated(),
                "adding session data to request for ensuing handlers"
            );
            req.extensions_mut().insert(session.clone());
            req.extensions_mut().insert(context);
            req.extensions_mut().insert(deadline);

            let res = inner.call(req).await?;

            // The writer may have created or re-keyed the record after the initial save.
            if session.id() != issued_id {
                issue_cookie(&session, &cookies, &controller, &config);
            }

            Ok(res)
        })
    }
}

fn issue_cookie<C: CookieController>(
    session: &Session,
    cookies: &Cookies,
    controller: &C,
    config: &SessionContextConfig,
) -> Option<Id> {
    let id = session.id()?;
    let cookie = config.build_cookie(
        format::encode_session_id(&id),
        session.expiry(),
        session.expiry_date(),
    );
    controller.add(cookies, cookie);
    Some(id)
}
