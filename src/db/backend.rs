use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::postgres::PostgresExecutor;
use super::sqlite::SqliteExecutor;
use super::traits::QueryExecutor;
use crate::config::Config;

/// Which store serves every query for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Postgres,
    Sqlite,
}

impl Backend {
    /// Any production-like signal selects the networked database; the embedded
    /// file is used only for plain local runs.
    pub fn select(cfg: &Config) -> Self {
        if cfg.networked_url().is_some() || cfg.on_managed_platform() || cfg.is_production() {
            Backend::Postgres
        } else {
            Backend::Sqlite
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Postgres => "postgres",
            Backend::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the executor for the selected backend. Nothing connects until the
/// first query.
pub fn executor_for(cfg: &Config) -> Arc<dyn QueryExecutor> {
    match Backend::select(cfg) {
        Backend::Postgres => Arc::new(PostgresExecutor::from_config(cfg)),
        Backend::Sqlite => Arc::new(SqliteExecutor::new(cfg.sqlite_path.clone())),
    }
}
