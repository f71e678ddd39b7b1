use async_trait::async_trait;

use super::backend::Backend;
use super::types::{QueryResult, SqlParam};
use crate::error::RecordsError;

/// The data-access capability handed to the HTTP layer.
///
/// SQL is always written in the PostgreSQL convention (`$1, $2, ...`);
/// implementations translate as needed.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    fn backend(&self) -> Backend;

    /// Execute one statement. Failures are logged with the SQL text and
    /// parameters and returned unchanged.
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<QueryResult, RecordsError>;

    /// Create the `users` and `students` tables if they are missing.
    async fn init_schema(&self) -> Result<(), RecordsError>;

    async fn table_exists(&self, table: &str) -> Result<bool, RecordsError>;

    /// Release the underlying pool, if one was ever opened.
    async fn close(&self);
}
