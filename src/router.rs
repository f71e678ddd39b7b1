use axum::{
    Router,
    extract::FromRef,
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use std::sync::Arc;
use tracing::warn;

use crate::config::Config;
use crate::db::{Bootstrap, QueryExecutor};
use crate::error::RecordsError;
use crate::handlers::{auth, health, setup, students};

#[derive(Clone)]
pub struct RecordsState {
    pub db: Arc<dyn QueryExecutor>,
    pub bootstrap: Arc<Bootstrap>,
    pub config: Arc<Config>,
    cookie_key: Key,
}

impl RecordsState {
    pub fn new(db: Arc<dyn QueryExecutor>, config: Config) -> Result<Self, RecordsError> {
        let cookie_key = cookie_key(config.session_secret.as_deref())?;
        Ok(Self {
            bootstrap: Arc::new(Bootstrap::new(db.clone())),
            db,
            config: Arc::new(config),
            cookie_key,
        })
    }

    pub fn secure_cookies(&self) -> bool {
        !self.config.insecure_cookie
    }
}

impl FromRef<RecordsState> for Key {
    fn from_ref(state: &RecordsState) -> Self {
        state.cookie_key.clone()
    }
}

fn cookie_key(secret: Option<&str>) -> Result<Key, RecordsError> {
    match secret {
        Some(secret) => Key::try_from(secret.as_bytes()).map_err(|_| {
            RecordsError::Config("RECORDS_SESSION_SECRET must be at least 64 bytes".to_string())
        }),
        None => {
            warn!("RECORDS_SESSION_SECRET is not set; sessions will not survive a restart");
            Ok(Key::generate())
        }
    }
}

pub fn records_router(state: RecordsState) -> Router {
    Router::new()
        .route("/api/health", get(health::health_handler))
        .route(
            "/api/setup",
            get(setup::setup_handler).post(setup::setup_handler),
        )
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/session", get(auth::session_handler))
        .route("/api/auth/logout", post(auth::logout_handler))
        .route(
            "/api/students",
            get(students::list_students).post(students::create_student),
        )
        .route(
            "/api/students/{id}",
            get(students::get_student)
                .put(students::update_student)
                .delete(students::delete_student),
        )
        .with_state(state)
}
