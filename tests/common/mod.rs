#![allow(dead_code)]

// Shared helpers for integration tests.
//
// Cookies are parsed/encoded with `tower_cookies::Cookie` to match what the middleware emits in
// `Set-Cookie` and what browsers send back in `Cookie`. `FaultyStore` wraps the in-memory store
// so tests can make individual store operations fail or stall.
use std::{
    convert::Infallible,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::body::Body;
use http::{HeaderMap, Request, Response, StatusCode, header};
use http_body_util::BodyExt as _;
use tower_cookies::{Cookie, Key, cookie::CookieJar};
use tower_sessions_context::{
    DEFAULT_COOKIE_NAME, SessionContext, SessionContextConfig, SessionContextLayer, SessionStore,
    SignedCookie, format, save_session, session_store,
};
use tower_sessions_core::session::{Id, Record};
use tower_sessions_memory_store::MemoryStore;

#[derive(Debug, Clone, Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    fail_loads: Arc<AtomicBool>,
    stall_loads: Arc<AtomicBool>,
    fail_saves: Arc<AtomicBool>,
}

impl FaultyStore {
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn stall_loads(&self, stall: bool) {
        self.stall_loads.store(stall, Ordering::SeqCst);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Read a record straight from the backing store, bypassing injected faults.
    pub async fn record(&self, id: &Id) -> Option<Record> {
        self.inner.load(id).await.expect("memory store load succeeds")
    }

    pub async fn seed(&self, record: &mut Record) {
        self.inner
            .create(record)
            .await
            .expect("memory store create succeeds");
    }

    fn check_save(&self) -> session_store::Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(session_store::Error::Backend("injected save failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FaultyStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        self.check_save()?;
        self.inner.create(record).await
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.check_save()?;
        self.inner.save(record).await
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        if self.stall_loads.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(session_store::Error::Backend("injected load failure".into()));
        }
        self.inner.load(session_id).await
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.inner.delete(session_id).await
    }
}

pub async fn body_string(body: Body) -> String {
    // Collect an Axum body into a UTF-8 string for assertions.
    let bytes = body
        .collect()
        .await
        .expect("body collects successfully")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub async fn context_handler(req: Request<Body>) -> Result<Response<Body>, Infallible> {
    // Hand the context the handler saw back to the test through the response extensions.
    let context = req
        .extensions()
        .get::<SessionContext>()
        .cloned()
        .expect("request includes SessionContext extension");

    let mut res = Response::new(Body::empty());
    res.extensions_mut().insert(context);
    Ok(res)
}

pub async fn login_handler(req: Request<Body>) -> Result<Response<Body>, Infallible> {
    // Save every `key=value` query pair (no percent-decoding) through the session writer and
    // return the context carried by the request the writer handed back.
    let info: Vec<(String, String)> = req
        .uri()
        .query()
        .unwrap_or_default()
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

    let (req, status) = match save_session(req, info).await {
        Ok(req) => (req, StatusCode::OK),
        Err(err) => (err.into_request(), StatusCode::INTERNAL_SERVER_ERROR),
    };

    let context = req
        .extensions()
        .get::<SessionContext>()
        .cloned()
        .expect("request includes SessionContext extension");

    let mut res = Response::new(Body::empty());
    *res.status_mut() = status;
    res.extensions_mut().insert(context);
    Ok(res)
}

pub fn response_context(res: &Response<Body>) -> SessionContext {
    res.extensions()
        .get::<SessionContext>()
        .cloned()
        .expect("response carries the handler's SessionContext")
}

pub fn make_signed_layer<Store: SessionStore>(
    store: Store,
    config: SessionContextConfig,
) -> (Key, SessionContextLayer<Store, SignedCookie>) {
    // Create a signed-cookie session layer and return both the key and the layer for tests that
    // need to unsign cookie values.
    let key = Key::generate();
    let layer = SessionContextLayer::signed(store, key.clone()).with_config(config);
    (key, layer)
}

pub fn get_session_cookie(res: &Response<Body>) -> Cookie<'static> {
    get_session_cookie_from_headers(res.headers())
}

pub fn get_session_cookie_from_headers(headers: &HeaderMap) -> Cookie<'static> {
    let set_cookie = headers
        .get(header::SET_COOKIE)
        .expect("response includes set-cookie header");
    let set_cookie = set_cookie
        .to_str()
        .expect("set-cookie header is valid utf-8");
    Cookie::parse_encoded(set_cookie)
        .expect("set-cookie parses successfully")
        .into_owned()
}

pub fn cookie_header_value(cookie: &Cookie<'_>) -> String {
    // Encode a cookie for use in a `Cookie` request header.
    cookie.encoded().to_string()
}

pub fn session_id(cookie: Cookie<'static>, key: &Key) -> Id {
    // Unsign a `Set-Cookie` session cookie and decode the session id it carries.
    let mut jar = CookieJar::new();
    jar.add_original(cookie);
    let value = jar
        .signed(key)
        .get(DEFAULT_COOKIE_NAME)
        .expect("signed jar returns session cookie")
        .value()
        .to_string();
    format::decode_session_id(&value).expect("cookie carries a session id")
}

pub fn signed_cookie_for(id: &Id, key: &Key) -> Cookie<'static> {
    // Build the cookie a browser would hold for an existing session.
    let mut jar = CookieJar::new();
    jar.signed_mut(key).add(Cookie::new(
        DEFAULT_COOKIE_NAME,
        format::encode_session_id(id),
    ));
    jar.get(DEFAULT_COOKIE_NAME)
        .cloned()
        .expect("jar holds the signed cookie")
}

pub fn request(uri: &str, cookie: Option<&Cookie<'_>>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie_header_value(cookie));
    }
    builder
        .body(Body::empty())
        .expect("request builds successfully")
}
