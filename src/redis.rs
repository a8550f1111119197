//! Redis-backed session store.
//!
//! The store client is created once at start-up and handed to
//! [`SessionContextLayer`](crate::SessionContextLayer); there is no reconnect loop. An unreachable
//! server is reported as [`Error::StoreUnavailable`] after at most
//! [`RedisSettings::connect_timeout`].

use std::time::Duration;

pub use tower_sessions_redis_store::RedisStore;
use tower_sessions_redis_store::fred::prelude::{ClientLike as _, Config, ConnectionConfig, Pool};

use crate::error::Error;

const DEFAULT_PORT: u16 = 6379;
const DEFAULT_POOL_SIZE: usize = 10;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct RedisSettings {
    host: String,
    port: u16,
    access_key: Option<String>,
    pool_size: usize,
    connect_timeout: Duration,
}

impl RedisSettings {
    pub fn new<H: Into<String>>(host: H) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            access_key: None,
            pool_size: DEFAULT_POOL_SIZE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_access_key<K: Into<String>>(mut self, access_key: K) -> Self {
        self.access_key = Some(access_key.into()).filter(|key| !key.is_empty());
        self
    }

    #[must_use]
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// `host:port`, as named in diagnostics.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn url(&self) -> String {
        match &self.access_key {
            Some(key) => format!(
                "redis://:{}@{}",
                urlencoding::encode(key),
                self.endpoint()
            ),
            None => format!("redis://{}", self.endpoint()),
        }
    }
}

impl std::fmt::Debug for RedisSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("access_key", &self.access_key.as_ref().map(|_| "<redacted>"))
            .field("pool_size", &self.pool_size)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Connect a pool to the configured server and wrap it as a session store.
pub async fn connect(settings: &RedisSettings) -> Result<RedisStore<Pool>, Error> {
    let endpoint = settings.endpoint();
    let unavailable = |message: String| Error::StoreUnavailable {
        endpoint: endpoint.clone(),
        message,
    };

    let config = Config::from_url(&settings.url()).map_err(|err| unavailable(err.to_string()))?;
    let connection = ConnectionConfig {
        connection_timeout: settings.connect_timeout,
        ..Default::default()
    };
    let pool = Pool::new(config, None, Some(connection), None, settings.pool_size)
        .map_err(|err| unavailable(err.to_string()))?;

    tracing::info!(endpoint = %endpoint, "creating session store");
    let _connection = pool.connect();
    match tokio::time::timeout(settings.connect_timeout, pool.wait_for_connect()).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => return Err(unavailable(err.to_string())),
        Err(_) => {
            return Err(unavailable(format!(
                "no connection within {}ms",
                settings.connect_timeout.as_millis()
            )));
        }
    }

    tracing::info!(endpoint = %endpoint, "session store connected");
    Ok(RedisStore::new(pool))
}
