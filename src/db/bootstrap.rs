//! Idempotent start-up work: tables first, then the default admin account.
//!
//! Table creation errors are returned to the caller. Seeding errors are only
//! logged, since an existing installation is usually already seeded.

use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use super::backend::executor_for;
use super::traits::QueryExecutor;
use crate::auth::password;
use crate::config::Config;
use crate::error::RecordsError;

pub const SEED_NAME: &str = "Administrator";
pub const SEED_EMAIL: &str = "admin@example.com";
pub const SEED_PASSWORD: &str = "admin123";
pub const SEED_ROLE: &str = "admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Created,
    AlreadyPresent,
    Failed,
}

/// Create missing tables, then make sure the seed account exists.
pub async fn initialize(db: &dyn QueryExecutor) -> Result<SeedOutcome, RecordsError> {
    db.init_schema().await.inspect_err(|e| {
        error!(backend = %db.backend(), error = %e, "table creation failed");
    })?;
    Ok(seed_admin(db).await)
}

pub async fn seed_admin(db: &dyn QueryExecutor) -> SeedOutcome {
    match try_seed_admin(db).await {
        Ok(true) => {
            info!(email = SEED_EMAIL, "created default admin account");
            SeedOutcome::Created
        }
        Ok(false) => SeedOutcome::AlreadyPresent,
        Err(e) => {
            warn!(email = SEED_EMAIL, error = %e, "could not create default admin account; continuing");
            SeedOutcome::Failed
        }
    }
}

async fn try_seed_admin(db: &dyn QueryExecutor) -> Result<bool, RecordsError> {
    let existing = db
        .query("SELECT id FROM users WHERE email = $1", &[SEED_EMAIL.into()])
        .await?;
    if existing.row_count > 0 {
        return Ok(false);
    }

    let hashed = password::hash(SEED_PASSWORD).await?;
    // A concurrent initializer may have inserted the row since the check above.
    let inserted = db
        .query(
            "INSERT INTO users (name, email, password, role) VALUES ($1, $2, $3, $4) ON CONFLICT (email) DO NOTHING",
            &[
                SEED_NAME.into(),
                SEED_EMAIL.into(),
                hashed.into(),
                SEED_ROLE.into(),
            ],
        )
        .await?;
    Ok(inserted.row_count > 0)
}

/// One-shot initialization against the configured backend, for the
/// `init_db` deploy step. The pool is closed before returning.
pub async fn initialize_from_config(cfg: &Config) -> Result<SeedOutcome, RecordsError> {
    let db = executor_for(cfg);
    info!(backend = %db.backend(), "initializing database");
    let outcome = initialize(db.as_ref()).await;
    db.close().await;
    outcome
}

/// Runs [`initialize`] once per process. Handlers call [`Bootstrap::ensure`]
/// before touching the database; after the first success it is free.
/// A failed attempt is not remembered, so the next call tries again.
pub struct Bootstrap {
    db: Arc<dyn QueryExecutor>,
    done: OnceCell<SeedOutcome>,
}

impl Bootstrap {
    pub fn new(db: Arc<dyn QueryExecutor>) -> Self {
        Self {
            db,
            done: OnceCell::new(),
        }
    }

    pub async fn ensure(&self) -> Result<SeedOutcome, RecordsError> {
        self.done
            .get_or_try_init(|| initialize(self.db.as_ref()))
            .await
            .copied()
    }

    pub fn is_done(&self) -> bool {
        self.done.initialized()
    }
}
