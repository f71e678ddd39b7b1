//! bcrypt hashing, run off the async executor.

use crate::error::RecordsError;

/// Matches the cost used by existing installations.
pub const HASH_COST: u32 = 10;

pub async fn hash(plain: &str) -> Result<String, RecordsError> {
    let plain = plain.to_owned();
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(plain, HASH_COST)).await??;
    Ok(hashed)
}

pub async fn verify(plain: &str, hashed: &str) -> Result<bool, RecordsError> {
    let plain = plain.to_owned();
    let hashed = hashed.to_owned();
    let ok = tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hashed)).await??;
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_is_salted_and_verifies() {
        let a = hash("admin123").await.unwrap();
        let b = hash("admin123").await.unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$2b$10$"));
        assert!(verify("admin123", &a).await.unwrap());
        assert!(!verify("admin124", &a).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error() {
        let err = verify("admin123", "plaintext").await.unwrap_err();
        assert!(matches!(err, RecordsError::PasswordHash(_)));
    }
}
