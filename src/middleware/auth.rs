use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Key, PrivateCookieJar};

use crate::auth::session::{self, Session};
use crate::error::RecordsError;

/// Rejects the request with 401 unless it carries a live session cookie.
#[derive(Debug, Clone)]
pub struct RequireSession(pub Session);

impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
    Key: FromRef<S>,
{
    type Rejection = RecordsError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // The jar extractor cannot fail.
        let Ok(jar) = PrivateCookieJar::<Key>::from_request_parts(parts, state).await;
        session::load(&jar)
            .map(Self)
            .ok_or(RecordsError::Unauthorized)
    }
}
