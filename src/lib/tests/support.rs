use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use crate::adapters::{app, AppState};
use crate::core::{ResultSet, StoreError};
use crate::storage::sqlite::SqliteStore;
use crate::storage::{ExecOutcome, SqlValue, Store, StoreAccessor};

/// Wraps a real store and counts every call made through it.
pub struct CountingStore {
    inner: SqliteStore,
    pub queries: AtomicUsize,
    pub executes: AtomicUsize,
    pub persists: AtomicUsize,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
            + self.executes.load(Ordering::SeqCst)
            + self.persists.load(Ordering::SeqCst)
    }

    pub fn persists(&self) -> usize {
        self.persists.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for CountingStore {
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<ResultSet, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ExecOutcome, StoreError> {
        self.executes.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(sql, params).await
    }

    async fn persist(&self) -> Result<(), StoreError> {
        self.persists.fetch_add(1, Ordering::SeqCst);
        self.inner.persist().await
    }
}

/// Every call fails, as a broken database would.
pub struct BrokenStore;

#[async_trait]
impl Store for BrokenStore {
    async fn query(&self, _sql: &str, _params: &[SqlValue]) -> Result<ResultSet, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolClosed))
    }

    async fn execute(&self, _sql: &str, _params: &[SqlValue]) -> Result<ExecOutcome, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolClosed))
    }

    async fn persist(&self) -> Result<(), StoreError> {
        Err(StoreError::Timeout(Duration::from_millis(1)))
    }
}

/// Removes every row right before each update or delete runs, as a
/// competing request would.
pub struct VanishingStore {
    pub inner: SqliteStore,
    pub persists: AtomicUsize,
}

#[async_trait]
impl Store for VanishingStore {
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<ResultSet, StoreError> {
        self.inner.query(sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ExecOutcome, StoreError> {
        if sql.starts_with("UPDATE") || sql.starts_with("DELETE") {
            self.inner.execute("DELETE FROM todos", &[]).await?;
        }
        self.inner.execute(sql, params).await
    }

    async fn persist(&self) -> Result<(), StoreError> {
        self.persists.fetch_add(1, Ordering::SeqCst);
        self.inner.persist().await
    }
}

pub async fn test_app() -> (Router, Arc<CountingStore>) {
    let inner = SqliteStore::new_memory(Duration::from_secs(5))
        .await
        .expect("in-memory store should open");
    let store = Arc::new(CountingStore {
        inner,
        queries: AtomicUsize::new(0),
        executes: AtomicUsize::new(0),
        persists: AtomicUsize::new(0),
    });
    let state = AppState::new(StoreAccessor::ready(store.clone()));
    (app(state), store)
}

pub fn broken_app() -> Router {
    app(AppState::new(StoreAccessor::ready(Arc::new(BrokenStore))))
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => Request::builder().method(method).uri(uri).body(Body::empty()),
    }
    .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub async fn create(app: &Router, body: &str) -> Value {
    let (status, json) = send(app, "POST", "/todos", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {json}");
    json
}
