//! Embedded backend: a local SQLite file behind a lazily opened sqlx pool.

use async_trait::async_trait;
use serde_json::{Number, Value};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Column, Row as _, Sqlite, TypeInfo, ValueRef};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{error, info};

use super::backend::Backend;
use super::dialect;
use super::schema::{self, SQLITE_INIT};
use super::traits::QueryExecutor;
use super::types::{CommandTag, QueryResult, Row, SqlParam};
use crate::error::RecordsError;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, <Sqlite as sqlx::Database>::Arguments<'q>>;

pub struct SqliteExecutor {
    path: PathBuf,
    pool: OnceCell<SqlitePool>,
}

impl std::fmt::Debug for SqliteExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteExecutor")
            .field("path", &self.path)
            .field("connected", &self.pool.initialized())
            .finish()
    }
}

impl SqliteExecutor {
    /// No file is touched until the first query.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The process-wide pool, opened on first call and reused afterwards.
    pub async fn pool(&self) -> Result<&SqlitePool, RecordsError> {
        self.pool.get_or_try_init(|| open_pool(&self.path)).await
    }

    async fn run(
        &self,
        sql: &str,
        command: CommandTag,
        params: &[SqlParam],
    ) -> Result<QueryResult, RecordsError> {
        let pool = self.pool().await?;
        let query = bind_all(sqlx::query(sql), params);

        match command {
            CommandTag::Select => {
                let rows = query.fetch_all(pool).await?;
                let fields = rows.first().map(column_names).unwrap_or_default();
                let rows = rows
                    .iter()
                    .map(row_to_json)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(QueryResult::from_rows(command, fields, rows))
            }
            _ => {
                let done = query.execute(pool).await?;
                let count = if command.is_dml() {
                    done.rows_affected()
                } else {
                    0
                };
                Ok(QueryResult::affected(command, count))
            }
        }
    }
}

async fn open_pool(path: &Path) -> Result<SqlitePool, RecordsError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(DEFAULT_MAX_CONNECTIONS)
        .acquire_timeout(DEFAULT_ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await
        .map_err(|source| {
            error!(path = %path.display(), error = %source, "embedded database could not be opened");
            RecordsError::EmbeddedUnavailable {
                path: path.to_path_buf(),
                source,
            }
        })?;

    info!(path = %path.display(), "opened embedded database");
    Ok(pool)
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<QueryResult, RecordsError> {
        let translated = dialect::to_sqlite(sql);
        let command = CommandTag::classify(&translated);
        self.run(&translated, command, params)
            .await
            .inspect_err(|e| {
                error!(backend = "sqlite", sql = %sql, params = ?params, error = %e, "query failed");
            })
    }

    async fn init_schema(&self) -> Result<(), RecordsError> {
        for stmt in schema::statements(SQLITE_INIT) {
            self.query(stmt, &[]).await?;
        }
        Ok(())
    }

    async fn table_exists(&self, table: &str) -> Result<bool, RecordsError> {
        let result = self
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = $1",
                &[table.into()],
            )
            .await?;
        Ok(result.row_count > 0)
    }

    async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
            info!(path = %self.path.display(), "closed embedded database");
        }
    }
}

fn bind_all<'q>(mut query: SqliteQuery<'q>, params: &'q [SqlParam]) -> SqliteQuery<'q> {
    for param in params {
        query = match param {
            SqlParam::Null => query.bind(None::<String>),
            SqlParam::Int(v) => query.bind(*v),
            SqlParam::Float(v) => query.bind(*v),
            SqlParam::Text(v) => query.bind(v.as_str()),
            SqlParam::Bool(v) => query.bind(*v),
        };
    }
    query
}

fn column_names(row: &SqliteRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

/// SQLite is dynamically typed, so decode by each value's storage class.
fn row_to_json(row: &SqliteRow) -> Result<Row, sqlx::Error> {
    let mut out = Row::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_info = raw.type_info();
            match type_info.name() {
                "INTEGER" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(idx)?),
                "REAL" | "NUMERIC" => Number::from_f64(row.try_get_unchecked::<f64, _>(idx)?)
                    .map_or(Value::Null, Value::Number),
                "BLOB" => Value::String(
                    String::from_utf8_lossy(&row.try_get_unchecked::<Vec<u8>, _>(idx)?)
                        .into_owned(),
                ),
                _ => Value::String(row.try_get_unchecked::<String, _>(idx)?),
            }
        };
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}
