use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::db::Account;
use crate::error::RecordsError;

pub const SESSION_COOKIE: &str = "records_session";
pub const SESSION_MAX_AGE_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Option<String>,
}

impl From<Account> for SessionUser {
    fn from(a: Account) -> Self {
        Self {
            id: a.id.to_string(),
            email: a.email,
            name: a.name,
            role: a.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub user: SessionUser,
    pub expires: DateTime<Utc>,
}

impl Session {
    pub fn new(user: SessionUser) -> Self {
        Self {
            user,
            expires: Utc::now() + chrono::Duration::days(SESSION_MAX_AGE_DAYS),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires <= Utc::now()
    }
}

/// Encrypt the session into the private cookie jar.
pub fn store(
    jar: PrivateCookieJar,
    session: &Session,
    secure: bool,
) -> Result<PrivateCookieJar, RecordsError> {
    let value = serde_json::to_string(session)?;
    Ok(jar.add(build_cookie(SESSION_COOKIE, value, secure)))
}

/// The live session, if the cookie decrypts, parses, and has not expired.
pub fn load(jar: &PrivateCookieJar) -> Option<Session> {
    let cookie = jar.get(SESSION_COOKIE)?;
    serde_json::from_str::<Session>(cookie.value())
        .ok()
        .filter(|s| !s.is_expired())
}

pub fn clear(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(clear_cookie(SESSION_COOKIE))
}

fn build_cookie(name: &str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::days(SESSION_MAX_AGE_DAYS))
        .build()
}

fn clear_cookie(name: &str) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Key;

    fn user() -> SessionUser {
        SessionUser {
            id: "1".into(),
            email: "admin@example.com".into(),
            name: "Administrator".into(),
            role: Some("admin".into()),
        }
    }

    #[test]
    fn stored_session_round_trips_through_jar() {
        let jar = PrivateCookieJar::new(Key::generate());
        let session = Session::new(user());
        let jar = store(jar, &session, true).unwrap();

        assert_eq!(load(&jar), Some(session));
        assert_eq!(load(&clear(jar)), None);
    }

    #[test]
    fn expired_session_is_ignored() {
        let jar = PrivateCookieJar::new(Key::generate());
        let session = Session {
            user: user(),
            expires: Utc::now() - chrono::Duration::seconds(1),
        };
        let jar = store(jar, &session, false).unwrap();
        assert_eq!(load(&jar), None);
    }
}
