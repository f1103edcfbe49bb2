pub mod sqlite;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use tokio::sync::OnceCell;

use crate::core::{ResultSet, StoreError};

/// Positional statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    pub last_insert_id: i64,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<ResultSet, StoreError>;
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ExecOutcome, StoreError>;
    /// Flushes state to durable storage after a mutation.
    async fn persist(&self) -> Result<(), StoreError>;
}

type Opener = Box<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn Store>, StoreError>> + Send + Sync>;

/// Owns the single store handle shared by every request.
///
/// The handle is opened on first use; callers racing on that first use all
/// wait on the same initialization.
pub struct StoreAccessor {
    cell: OnceCell<Arc<dyn Store>>,
    open: Opener,
}

impl StoreAccessor {
    pub fn lazy<F, Fut, S>(open: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S, StoreError>> + Send + 'static,
        S: Store + 'static,
    {
        let open: Opener = Box::new(move || {
            let fut = open();
            async move {
                let store: Arc<dyn Store> = Arc::new(fut.await?);
                Ok::<_, StoreError>(store)
            }
            .boxed()
        });
        Self {
            cell: OnceCell::new(),
            open,
        }
    }

    /// Wraps a store that is already open.
    pub fn ready(store: Arc<dyn Store>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(store)),
            open: Box::new(|| {
                async {
                    Err::<Arc<dyn Store>, _>(StoreError::Unavailable("store was supplied pre-opened".into()))
                }
                .boxed()
            }),
        }
    }

    pub async fn acquire(&self) -> Result<Arc<dyn Store>, StoreError> {
        self.cell.get_or_try_init(|| (self.open)()).await.cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NoStore;

    #[async_trait]
    impl Store for NoStore {
        async fn query(&self, _sql: &str, _params: &[SqlValue]) -> Result<ResultSet, StoreError> {
            Ok(vec![])
        }

        async fn execute(&self, _sql: &str, _params: &[SqlValue]) -> Result<ExecOutcome, StoreError> {
            Ok(ExecOutcome::default())
        }

        async fn persist(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_acquire_opens_once() {
        let opened = Arc::new(AtomicUsize::new(0));
        let counter = opened.clone();
        let accessor = Arc::new(StoreAccessor::lazy(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Ok::<_, StoreError>(NoStore)
            }
        }));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let accessor = accessor.clone();
                tokio::spawn(async move { accessor.acquire().await.map(|_| ()) })
            })
            .collect();
        for result in futures::future::join_all(handles).await {
            result.unwrap().unwrap();
        }

        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_open_is_retried_on_next_acquire() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let accessor = StoreAccessor::lazy(move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(StoreError::Unavailable("boom".into()))
                } else {
                    Ok(NoStore)
                }
            }
        });
        assert!(accessor.acquire().await.is_err());
        assert!(accessor.acquire().await.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn ready_accessor_never_opens() {
        let accessor = StoreAccessor::ready(Arc::new(NoStore));
        assert!(accessor.acquire().await.is_ok());
        assert!(accessor.acquire().await.is_ok());
    }

    #[test]
    fn optional_params_become_null() {
        assert_eq!(SqlValue::from(None::<String>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("x")), SqlValue::Text("x".into()));
    }
}
