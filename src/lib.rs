pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use db::{QueryExecutor, QueryResult, SqlParam};
pub use error::RecordsError;
