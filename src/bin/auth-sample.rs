//! Sample server: the session layer over a Redis store.
//!
//! `GET /` greets the session's user. `GET /login?state=..&name=..&email=..` stands in for the
//! callback of an external identity provider: it checks `state` against the session and then
//! records the identity.
//!
//! The Redis host is `REDIS_HOSTNAME` as given. Managed caches reached through a provider domain
//! need `REDIS_DOMAIN_SUFFIX` as well, e.g. `redis.cache.windows.net`; no suffix is assumed.

use std::{net::SocketAddr, process::ExitCode, time::Duration};

use axum::{
    Router,
    body::Body,
    extract::Query,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::Deserialize;
use tower_sessions_context::{
    Key, SessionContext, SessionContextConfig, SessionContextLayer, greeting, key_from_secret,
    redis::{self, RedisSettings},
    save_session, user_info,
};
use tracing_subscriber::EnvFilter;

/// Used when `COOKIE_KEY` is unset. Anyone who knows it can forge session cookies.
const INSECURE_COOKIE_KEY: &str = "makemerandom";

#[derive(Debug, Parser)]
#[command(name = "auth-sample")]
#[command(about = "Session context middleware demo backed by Redis")]
#[command(version)]
struct Args {
    /// Secret the cookie signing key is derived from
    #[arg(long, env = "COOKIE_KEY", hide_env_values = true)]
    cookie_key: Option<String>,

    /// Redis host name
    #[arg(long, env = "REDIS_HOSTNAME")]
    redis_host: String,

    /// Domain appended to the host name, e.g. `redis.cache.windows.net`
    #[arg(long, env = "REDIS_DOMAIN_SUFFIX")]
    redis_domain_suffix: Option<String>,

    #[arg(long, env = "REDIS_PORT", default_value_t = 6379)]
    redis_port: u16,

    /// Connections kept in the Redis pool
    #[arg(long, env = "REDIS_POOL_SIZE", default_value_t = 10)]
    redis_pool_size: usize,

    /// Redis access key
    #[arg(long, env = "REDIS_KEY", hide_env_values = true)]
    redis_key: Option<String>,

    /// Give up connecting to Redis after this many seconds
    #[arg(long, env = "REDIS_CONNECT_TIMEOUT_SECS", default_value_t = 5)]
    connect_timeout_secs: u64,

    /// Deadline for each session store call, in milliseconds
    #[arg(long, env = "SESSION_STORE_TIMEOUT_MS")]
    store_timeout_ms: Option<u64>,

    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Issue cookies without the `Secure` attribute (local HTTP development)
    #[arg(
        long,
        env = "INSECURE_COOKIES",
        action = clap::ArgAction::SetTrue,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    insecure_cookies: bool,
}

impl Args {
    fn redis_host(&self) -> String {
        match self.redis_domain_suffix.as_deref() {
            Some(suffix) if !suffix.is_empty() => format!("{}.{}", self.redis_host, suffix),
            _ => self.redis_host.clone(),
        }
    }

    fn redis_settings(&self) -> RedisSettings {
        let settings = RedisSettings::new(self.redis_host())
            .with_port(self.redis_port)
            .with_pool_size(self.redis_pool_size)
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs));
        match &self.redis_key {
            Some(key) => settings.with_access_key(key.as_str()),
            None => settings,
        }
    }

    fn cookie_key(&self) -> Key {
        match self.cookie_key.as_deref() {
            Some(secret) if !secret.is_empty() => key_from_secret(secret.as_bytes()),
            _ => {
                tracing::warn!(
                    "COOKIE_KEY is unset, falling back to an insecure built-in cookie key; \
                     set COOKIE_KEY before deploying"
                );
                key_from_secret(INSECURE_COOKIE_KEY.as_bytes())
            }
        }
    }

    fn session_config(&self) -> SessionContextConfig {
        let config = SessionContextConfig::default().with_secure(!self.insecure_cookies);
        match self.store_timeout_ms {
            Some(ms) => config.with_store_timeout(Duration::from_millis(ms)),
            None => config,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Login {
    state: String,
    name: String,
    email: Option<String>,
}

async fn login(
    context: SessionContext,
    Query(login): Query<Login>,
    req: Request<Body>,
) -> Response {
    if context.state() != Some(login.state.as_str()) {
        tracing::warn!("login state does not match session state");
        return StatusCode::FORBIDDEN.into_response();
    }

    let mut info = vec![("name", login.name)];
    if let Some(email) = login.email {
        info.push(("email", email));
    }

    match save_session(req, info).await {
        Ok(req) => {
            let context = req
                .extensions()
                .get::<SessionContext>()
                .cloned()
                .unwrap_or_default();
            greeting(&context).into_response()
        }
        Err(err) => err.into_response(),
    }
}

fn routes() -> Router {
    Router::new()
        .route("/", get(user_info))
        .route("/login", get(login))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(err = %err, "failed to listen for shutdown signal");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let key = args.cookie_key();
    let settings = args.redis_settings();

    let store = match redis::connect(&settings).await {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(err = %err, "failed to create session store");
            return ExitCode::FAILURE;
        }
    };

    let layer = SessionContextLayer::signed(store, key).with_config(args.session_config());
    let app = routes().layer(layer);

    let listener = match tokio::net::TcpListener::bind(args.bind).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(err = %err, addr = %args.bind, "failed to bind");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(addr = %args.bind, "listening");

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(err = %err, "server failed");
        return ExitCode::FAILURE;
    }

    tracing::info!("shut down");
    ExitCode::SUCCESS
}
