//! PostgreSQL-backed document store.
//!
//! Documents live in a single JSONB table keyed by `(collection, id)`;
//! equality filters become JSONB containment (`body @> $filter`). A probe task
//! issues `SELECT 1` on an interval and turns failures/recoveries into
//! `Disconnected` / `Reconnected` events, since the pool itself does not
//! report them.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Row;
use std::str::FromStr;
use std::sync::{Mutex, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::WriteConcern;
use crate::db::driver::{ConnectOptions, Document, DriverEvent, Filter, StoreDriver, StoreError};

const EVENT_CAPACITY: usize = 64;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body JSONB NOT NULL,
    PRIMARY KEY (collection, id)
)
"#;

pub struct PostgresDriver {
    pool: RwLock<Option<PgPool>>,
    retry_writes: RwLock<bool>,
    events: broadcast::Sender<DriverEvent>,
    probe_interval: Duration,
    probe: Mutex<Option<JoinHandle<()>>>,
}

impl PostgresDriver {
    pub fn new(probe_interval: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            pool: RwLock::new(None),
            retry_writes: RwLock::new(true),
            events,
            probe_interval,
            probe: Mutex::new(None),
        }
    }

    fn pool(&self) -> Result<PgPool, StoreError> {
        self.pool
            .read()
            .ok()
            .and_then(|guard| guard.clone())
            .ok_or(StoreError::NotConnected)
    }

    fn retry_writes(&self) -> bool {
        self.retry_writes.read().map(|v| *v).unwrap_or(false)
    }

    /// Run a write, retrying once on transport-level failures when enabled.
    async fn write<F, Fut, T>(&self, op: F) -> Result<T, StoreError>
    where
        F: Fn(PgPool) -> Fut,
        Fut: std::future::Future<Output = Result<T, sqlx::Error>>,
    {
        let pool = self.pool()?;
        match op(pool.clone()).await {
            Ok(value) => Ok(value),
            Err(e) if self.retry_writes() && is_transient(&e) => {
                tracing::warn!(error = %e, "Retrying write after transient failure");
                op(pool).await.map_err(query_error)
            }
            Err(e) => Err(query_error(e)),
        }
    }

    fn spawn_probe(&self, pool: PgPool, timeout: Duration) -> JoinHandle<()> {
        let events = self.events.clone();
        let interval = self.probe_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            let mut healthy = true;

            loop {
                ticker.tick().await;
                let probe = sqlx::query("SELECT 1").execute(&pool);
                let ok = match tokio::time::timeout(timeout, probe).await {
                    Ok(Ok(_)) => true,
                    Ok(Err(e)) => {
                        let _ = events.send(DriverEvent::Error(e.to_string()));
                        false
                    }
                    Err(_) => {
                        let _ = events.send(DriverEvent::Error("liveness probe timed out".into()));
                        false
                    }
                };

                match (healthy, ok) {
                    (true, false) => {
                        let _ = events.send(DriverEvent::Disconnected);
                    }
                    (false, true) => {
                        let _ = events.send(DriverEvent::Reconnected);
                    }
                    _ => {}
                }
                healthy = ok;
            }
        })
    }

    fn stop_probe(&self) {
        if let Ok(mut probe) = self.probe.lock() {
            if let Some(handle) = probe.take() {
                handle.abort();
            }
        }
    }
}

fn query_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolClosed => StoreError::NotConnected,
        other => StoreError::Query(other.to_string()),
    }
}

fn is_transient(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut)
}

fn into_document(value: Value) -> Result<Document, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Query(format!(
            "expected a JSON object, found {}",
            other
        ))),
    }
}

#[async_trait]
impl StoreDriver for PostgresDriver {
    async fn connect(&self, uri: &str, options: &ConnectOptions) -> Result<String, StoreError> {
        let synchronous_commit = match options.write_concern {
            WriteConcern::Majority => "on",
            WriteConcern::Acknowledged => "local",
        };
        let statement_timeout = options.socket_timeout.as_millis().to_string();
        let connect_options = PgConnectOptions::from_str(uri)
            .map_err(|e| StoreError::InvalidUri(e.to_string()))?
            .options([
                ("synchronous_commit", synchronous_commit),
                ("statement_timeout", statement_timeout.as_str()),
            ]);
        let host = connect_options.get_host().to_string();

        let connecting = PgPoolOptions::new()
            .min_connections(options.min_pool_size)
            .max_connections(options.max_pool_size)
            .acquire_timeout(options.server_selection_timeout)
            .idle_timeout(Some(options.socket_timeout))
            .connect_with(connect_options);

        let pool = tokio::time::timeout(options.connect_timeout, connecting)
            .await
            .map_err(|_| StoreError::Connection(format!("connect to {} timed out", host)))?
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        self.stop_probe();
        let probe = self.spawn_probe(pool.clone(), options.server_selection_timeout);
        if let Ok(mut slot) = self.probe.lock() {
            *slot = Some(probe);
        }
        if let Ok(mut slot) = self.retry_writes.write() {
            *slot = options.retry_writes;
        }
        if let Ok(mut slot) = self.pool.write() {
            if let Some(previous) = slot.replace(pool) {
                tokio::spawn(async move { previous.close().await });
            }
        }

        let _ = self.events.send(DriverEvent::Connected);
        Ok(host)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.stop_probe();
        let pool = self.pool.write().ok().and_then(|mut slot| slot.take());
        if let Some(pool) = pool {
            pool.close().await;
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let pool = self.pool()?;
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(query_error)?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<DriverEvent> {
        self.events.subscribe()
    }

    fn supports_scheme(&self, scheme: &str) -> bool {
        matches!(scheme, "postgres" | "postgresql")
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<(), StoreError> {
        let id = doc
            .get("_id")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Query("document has no _id".into()))?
            .to_string();
        let body = Value::Object(doc);

        self.write(|pool| {
            let (id, body) = (id.clone(), body.clone());
            async move {
                sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
                    .bind(collection)
                    .bind(id)
                    .bind(body)
                    .execute(&pool)
                    .await
            }
        })
        .await?;
        Ok(())
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let pool = self.pool()?;
        let rows = sqlx::query("SELECT body FROM documents WHERE collection = $1 AND body @> $2")
            .bind(collection)
            .bind(filter.to_json())
            .fetch_all(&pool)
            .await
            .map_err(query_error)?;

        rows.into_iter()
            .map(|row| {
                let body: Value = row.try_get("body").map_err(query_error)?;
                into_document(body)
            })
            .collect()
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let pool = self.pool()?;
        let row = sqlx::query("SELECT body FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&pool)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => {
                let body: Value = row.try_get("body").map_err(query_error)?;
                into_document(body).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn replace(&self, collection: &str, id: &str, doc: Document) -> Result<bool, StoreError> {
        let body = Value::Object(doc);
        let result = self
            .write(|pool| {
                let body = body.clone();
                async move {
                    sqlx::query("UPDATE documents SET body = $3 WHERE collection = $1 AND id = $2")
                        .bind(collection)
                        .bind(id)
                        .bind(body)
                        .execute(&pool)
                        .await
                }
            })
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = self
            .write(|pool| async move {
                sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2 RETURNING body")
                    .bind(collection)
                    .bind(id)
                    .fetch_optional(&pool)
                    .await
            })
            .await?;

        match row {
            Some(row) => {
                let body: Value = row.try_get("body").map_err(query_error)?;
                into_document(body).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn delete_all(&self, collection: &str) -> Result<u64, StoreError> {
        let result = self
            .write(|pool| async move {
                sqlx::query("DELETE FROM documents WHERE collection = $1")
                    .bind(collection)
                    .execute(&pool)
                    .await
            })
            .await?;
        Ok(result.rows_affected())
    }
}
