//! Credential check and session issuance.

pub mod password;
pub mod session;

use tracing::{info, warn};

use crate::db::models::{self, Account};
use crate::db::QueryExecutor;
use crate::error::RecordsError;
pub use session::{Session, SessionUser};

/// Look up the account by email and check the password.
/// `Ok(None)` means the credentials were rejected.
pub async fn authenticate(
    db: &dyn QueryExecutor,
    email: &str,
    plain_password: &str,
) -> Result<Option<SessionUser>, RecordsError> {
    let result = db
        .query("SELECT * FROM users WHERE email = $1", &[email.into()])
        .await?;
    let Some(row) = result.into_first() else {
        warn!(email, "login rejected: unknown user");
        return Ok(None);
    };
    let account: Account = models::from_row(row)?;

    let valid = password::verify(plain_password, &account.password)
        .await
        .unwrap_or_else(|e| {
            warn!(email, error = %e, "stored password hash could not be checked");
            false
        });
    if !valid {
        warn!(email, "login rejected: wrong password");
        return Ok(None);
    }

    info!(email, "user authenticated");
    Ok(Some(account.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::bootstrap::{self, SEED_EMAIL, SEED_PASSWORD};
    use crate::db::SqliteExecutor;
    use tempfile::tempdir;

    #[tokio::test]
    async fn seed_credentials_authenticate() {
        let dir = tempdir().unwrap();
        let db = SqliteExecutor::new(dir.path().join("auth.db"));
        bootstrap::initialize(&db).await.unwrap();

        let user = authenticate(&db, SEED_EMAIL, SEED_PASSWORD)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.email, SEED_EMAIL);
        assert_eq!(user.role.as_deref(), Some("admin"));

        assert!(authenticate(&db, SEED_EMAIL, "wrong").await.unwrap().is_none());
        assert!(
            authenticate(&db, "nobody@example.com", SEED_PASSWORD)
                .await
                .unwrap()
                .is_none()
        );
    }
}
