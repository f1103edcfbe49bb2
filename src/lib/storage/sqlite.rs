use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Number, Value};
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow, SqliteSynchronous,
};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};

#[cfg(feature = "tracing")]
use tracing::{debug, info, instrument};

use crate::core::{ResultSet, StoreError, Table};
use crate::storage::{ExecOutcome, SqlValue, Store};

pub const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS todos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT,
        status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'completed'))
    )";

pub struct SqliteStore {
    pool: SqlitePool,
    timeout: Duration,
    in_memory: bool,
}

impl SqliteStore {
    pub async fn open(url: &str, max_connections: u32, timeout: Duration) -> Result<Self, StoreError> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let mut options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new().acquire_timeout(timeout);
        if in_memory {
            // every pooled connection to :memory: would be its own database
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Full);
            pool_options = pool_options.max_connections(max_connections.max(1));
        }

        let pool = pool_options.connect_with(options).await?;
        sqlx::query(SCHEMA).execute(&pool).await?;

        #[cfg(feature = "tracing")]
        info!(url = %url, in_memory, "Store opened");
        Ok(Self {
            pool,
            timeout,
            in_memory,
        })
    }

    pub async fn new_memory(timeout: Duration) -> Result<Self, StoreError> {
        Self::open("sqlite::memory:", 1, timeout).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Checks a connection out of the pool and keeps it until dropped.
    #[cfg(test)]
    pub(crate) async fn hold_connection(
        &self,
    ) -> Result<sqlx::pool::PoolConnection<Sqlite>, sqlx::Error> {
        self.pool.acquire().await
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
            .map_err(StoreError::from)
    }
}

fn bind_all<'q>(sql: &'q str, params: &[SqlValue]) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    params
        .iter()
        .fold(sqlx::query(sql), |query, param| match param {
            SqlValue::Null => query.bind(None::<i64>),
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
        })
}

fn decode_row(row: &SqliteRow) -> Result<Vec<Value>, sqlx::Error> {
    (0..row.len())
        .map(|i| {
            let raw = row.try_get_raw(i)?;
            if raw.is_null() {
                return Ok(Value::Null);
            }
            let type_name = raw.type_info().name().to_string();
            match type_name.as_str() {
                "INTEGER" | "BOOLEAN" => row.try_get::<i64, _>(i).map(Value::from),
                "REAL" => row
                    .try_get::<f64, _>(i)
                    .map(|v| Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)),
                "BLOB" => row.try_get::<Vec<u8>, _>(i).map(Value::from),
                _ => row.try_get::<String, _>(i).map(Value::from),
            }
        })
        .collect()
}

#[async_trait]
impl Store for SqliteStore {
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, params)))]
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<ResultSet, StoreError> {
        let rows = self.bounded(bind_all(sql, params).fetch_all(&self.pool)).await?;
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let columns = first
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();
        let values = rows
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(vec![Table { columns, values }])
    }

    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, params)))]
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ExecOutcome, StoreError> {
        let result = self.bounded(bind_all(sql, params).execute(&self.pool)).await?;
        Ok(ExecOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id: result.last_insert_rowid(),
        })
    }

    async fn persist(&self) -> Result<(), StoreError> {
        if self.in_memory {
            #[cfg(feature = "tracing")]
            debug!("In-memory store, nothing to flush");
            return Ok(());
        }
        self.bounded(sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)").execute(&self.pool))
            .await?;
        #[cfg(feature = "tracing")]
        debug!("Store checkpointed");
        Ok(())
    }
}
