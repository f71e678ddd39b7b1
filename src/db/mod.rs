//! Database module: one query interface over two interchangeable stores.
//!
//! Layout:
//! - `traits.rs`: the `QueryExecutor` capability handed to handlers
//! - `backend.rs`: picks PostgreSQL or SQLite once from configuration
//! - `postgres.rs` / `sqlite.rs`: the two executors, each owning one lazy pool
//! - `dialect.rs`: PostgreSQL -> SQLite statement rewriting
//! - `schema.rs`: per-backend DDL for `users` and `students`
//! - `bootstrap.rs`: idempotent table creation and admin seeding
//! - `models.rs`: typed views over normalized rows
//! - `types.rs`: parameters and the shared result shape

pub mod backend;
pub mod bootstrap;
pub mod dialect;
pub mod models;
pub mod postgres;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use backend::{Backend, executor_for};
pub use bootstrap::{Bootstrap, SeedOutcome};
pub use models::{Account, Student};
pub use postgres::PostgresExecutor;
pub use sqlite::SqliteExecutor;
pub use traits::QueryExecutor;
pub use types::{CommandTag, QueryResult, Row, SqlParam};
