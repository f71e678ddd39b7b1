//! Networked backend: PostgreSQL through a lazily built sqlx pool.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Number, Value};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow, PgSslMode};
use sqlx::{Column, Connection, Decode, Postgres, Row as _, Type, TypeInfo};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use super::backend::Backend;
use super::schema::{self, POSTGRES_INIT};
use super::traits::QueryExecutor;
use super::types::{CommandTag, QueryResult, Row, SqlParam, TIMESTAMP_FORMAT};
use crate::config::Config;
use crate::error::RecordsError;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);
/// Connections idle for longer than this are pinged before reuse.
const IDLE_PING_AFTER: Duration = Duration::from_secs(30);
/// Advisory lock held while the DDL runs, so concurrent initializers in any
/// process take turns instead of racing on the system catalogs.
const SCHEMA_LOCK_KEY: i64 = 0x7374_7564_656e_7473;

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, <Postgres as sqlx::Database>::Arguments<'q>>;

pub struct PostgresExecutor {
    url: Option<String>,
    ssl_mode: PgSslMode,
    pool: OnceCell<PgPool>,
}

impl std::fmt::Debug for PostgresExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresExecutor")
            .field("ssl_mode", &self.ssl_mode)
            .field("connected", &self.pool.initialized())
            .finish_non_exhaustive()
    }
}

impl PostgresExecutor {
    /// `encrypt` selects TLS (`sslmode=require`) for the transport.
    pub fn new(url: Option<String>, encrypt: bool) -> Self {
        Self {
            url,
            ssl_mode: if encrypt {
                PgSslMode::Require
            } else {
                PgSslMode::Disable
            },
            pool: OnceCell::new(),
        }
    }

    /// TLS stays on unless `APP_ENV` explicitly names a non-production environment.
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.networked_url().map(str::to_owned),
            !cfg.explicitly_non_production(),
        )
    }

    pub fn ssl_mode(&self) -> PgSslMode {
        self.ssl_mode
    }

    /// The process-wide pool, built on first call and reused afterwards.
    pub async fn pool(&self) -> Result<&PgPool, RecordsError> {
        self.pool.get_or_try_init(|| self.open_pool()).await
    }

    async fn open_pool(&self) -> Result<PgPool, RecordsError> {
        let url = self.url.as_deref().ok_or_else(|| {
            error!("networked database selected but no DATABASE_URL is configured");
            RecordsError::MissingDatabaseUrl
        })?;
        let options = PgConnectOptions::from_str(url)?.ssl_mode(self.ssl_mode);

        let pool = PgPoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .acquire_timeout(DEFAULT_ACQUIRE_TIMEOUT)
            .idle_timeout(DEFAULT_IDLE_TIMEOUT)
            // `CURRENT_TIMESTAMP` into a TIMESTAMP column follows the session
            // time zone; pin it so stored times are UTC like the embedded store.
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("SET TIME ZONE 'UTC'").execute(&mut *conn).await?;
                    Ok(())
                })
            })
            .before_acquire(|conn, meta| {
                Box::pin(async move {
                    if meta.idle_for < IDLE_PING_AFTER {
                        return Ok(true);
                    }
                    match conn.ping().await {
                        Ok(()) => Ok(true),
                        Err(e) => {
                            warn!(
                                error = %e,
                                idle_for = ?meta.idle_for,
                                "idle database connection failed; discarding it"
                            );
                            Ok(false)
                        }
                    }
                })
            })
            .connect_with(options)
            .await?;

        info!(ssl_mode = ?self.ssl_mode, "connected to networked database");
        Ok(pool)
    }

    async fn run(
        &self,
        sql: &str,
        command: CommandTag,
        params: &[SqlParam],
    ) -> Result<QueryResult, RecordsError> {
        let pool = self.pool().await?;
        let query = bind_all(sqlx::query(sql), params);

        if command == CommandTag::Select || has_returning_clause(sql) {
            let rows = query.fetch_all(pool).await?;
            let fields = rows.first().map(column_names).unwrap_or_default();
            let rows = rows
                .iter()
                .map(row_to_json)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(QueryResult::from_rows(command, fields, rows))
        } else {
            let done = query.execute(pool).await?;
            Ok(QueryResult::affected(command, done.rows_affected()))
        }
    }
}

#[async_trait]
impl QueryExecutor for PostgresExecutor {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<QueryResult, RecordsError> {
        let command = CommandTag::classify(sql);
        self.run(sql, command, params).await.inspect_err(|e| {
            error!(backend = "postgres", sql = %sql, params = ?params, error = %e, "query failed");
        })
    }

    async fn init_schema(&self) -> Result<(), RecordsError> {
        let pool = self.pool().await?;
        let mut tx = pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SCHEMA_LOCK_KEY)
            .execute(&mut *tx)
            .await?;
        for stmt in schema::statements(POSTGRES_INIT) {
            sqlx::query(stmt)
                .execute(&mut *tx)
                .await
                .inspect_err(|e| {
                    error!(backend = "postgres", sql = %stmt, error = %e, "schema statement failed");
                })?;
        }
        // Commit releases the lock.
        tx.commit().await?;
        Ok(())
    }

    async fn table_exists(&self, table: &str) -> Result<bool, RecordsError> {
        let result = self
            .query(
                "SELECT table_name FROM information_schema.tables WHERE table_schema = current_schema() AND table_name = $1",
                &[table.into()],
            )
            .await?;
        Ok(result.row_count > 0)
    }

    async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
            info!("closed networked database pool");
        }
    }
}

fn has_returning_clause(sql: &str) -> bool {
    sql.split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .any(|word| word.eq_ignore_ascii_case("returning"))
}

fn bind_all<'q>(mut query: PgQuery<'q>, params: &'q [SqlParam]) -> PgQuery<'q> {
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

fn column_names(row: &PgRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

fn get<'r, T>(row: &'r PgRow, idx: usize) -> Result<Option<T>, sqlx::Error>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get::<Option<T>, _>(idx)
}

fn row_to_json(row: &PgRow) -> Result<Row, sqlx::Error> {
    let mut out = Row::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let value = match column.type_info().name() {
            "BOOL" => get::<bool>(row, idx)?.map(Value::Bool),
            "INT2" => get::<i16>(row, idx)?.map(Value::from),
            "INT4" => get::<i32>(row, idx)?.map(Value::from),
            "INT8" => get::<i64>(row, idx)?.map(Value::from),
            "FLOAT4" => get::<f32>(row, idx)?
                .and_then(|v| Number::from_f64(f64::from(v)))
                .map(Value::Number),
            "FLOAT8" => get::<f64>(row, idx)?
                .and_then(Number::from_f64)
                .map(Value::Number),
            "TIMESTAMP" => get::<NaiveDateTime>(row, idx)?
                .map(|ts| Value::String(ts.format(TIMESTAMP_FORMAT).to_string())),
            "TIMESTAMPTZ" => get::<DateTime<Utc>>(row, idx)?.map(|ts| {
                Value::String(ts.naive_utc().format(TIMESTAMP_FORMAT).to_string())
            }),
            "DATE" => get::<NaiveDate>(row, idx)?.map(|d| Value::String(d.to_string())),
            _ => get::<String>(row, idx)?.map(Value::String),
        };
        out.insert(column.name().to_string(), value.unwrap_or(Value::Null));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_returning_clause_detection() {
        assert!(has_returning_clause(
            "INSERT INTO users (name) VALUES ($1) RETURNING id"
        ));
        assert!(has_returning_clause("delete from t returning *"));
        assert!(!has_returning_clause("SELECT returning_customer FROM t"));
    }

    #[test]
    fn test_tls_follows_environment() {
        let cfg = Config {
            database_url: Some("postgres://localhost/records".into()),
            ..Config::default()
        };
        assert!(matches!(
            PostgresExecutor::from_config(&cfg).ssl_mode(),
            PgSslMode::Require
        ));

        let cfg = Config {
            app_env: Some("development".into()),
            ..cfg
        };
        assert!(matches!(
            PostgresExecutor::from_config(&cfg).ssl_mode(),
            PgSslMode::Disable
        ));
    }

    #[tokio::test]
    async fn test_missing_url_fails_at_pool_construction() {
        let db = PostgresExecutor::new(None, true);
        let err = db.query("SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(err, RecordsError::MissingDatabaseUrl));
    }
}
