//! Cache backends
//!
//! The store owns exactly one active backend at a time: the remote Redis
//! connection or the in-process fallback map.

use crate::utils::error::{CompareError, Result};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::RwLock;

/// Which backend currently serves reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    FallbackActive,
    RemoteActive,
}

/// Remote backend over a single multiplexed Redis connection.
///
/// The multiplexed connection never reconnects on its own; once it breaks the
/// store stays on the fallback map. Every command is bounded by
/// `operation_timeout`.
#[derive(Clone)]
pub struct RedisBackend {
    connection: MultiplexedConnection,
    operation_timeout: Duration,
}

fn timed_out(what: &str, timeout: Duration) -> CompareError {
    redis::RedisError::from(std::io::Error::new(
        std::io::ErrorKind::TimedOut,
        format!("Redis {} timeout after {:?}", what, timeout),
    ))
    .into()
}

impl RedisBackend {
    pub async fn connect(
        url: &str,
        connect_timeout: Duration,
        operation_timeout: Duration,
    ) -> Result<Self> {
        let client = redis::Client::open(url)?;

        let connection = tokio::time::timeout(
            connect_timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| timed_out("connection", connect_timeout))??;

        Ok(Self {
            connection,
            operation_timeout,
        })
    }

    async fn bounded<T>(
        &self,
        what: &str,
        op: impl Future<Output = redis::RedisResult<T>>,
    ) -> Result<T> {
        let value = tokio::time::timeout(self.operation_timeout, op)
            .await
            .map_err(|_| timed_out(what, self.operation_timeout))??;
        Ok(value)
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut connection = self.connection.clone();
        self.bounded("GET", connection.get::<_, Option<String>>(key))
            .await
    }

    pub async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut connection = self.connection.clone();
        self.bounded("SET", connection.set::<_, _, ()>(key, value))
            .await
    }
}

/// In-process fallback, always available.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn set(&self, key: &str, value: String) {
        self.entries.write().await.insert(key.to_string(), value);
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// The tagged choice between the two backends.
pub(crate) enum ActiveBackend {
    Remote(RedisBackend),
    Fallback,
}

impl ActiveBackend {
    pub(crate) fn state(&self) -> BackendState {
        match self {
            ActiveBackend::Remote(_) => BackendState::RemoteActive,
            ActiveBackend::Fallback => BackendState::FallbackActive,
        }
    }
}
