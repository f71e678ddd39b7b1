use axum::{
    Json,
    extract::State,
    response::IntoResponse,
};
use axum_extra::extract::{WithRejection, cookie::PrivateCookieJar};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::non_empty;
use crate::auth::{self, Session, session};
use crate::{RecordsError, router::RecordsState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /api/auth/login -> checks credentials and sets the session cookie.
pub async fn login_handler(
    State(state): State<RecordsState>,
    jar: PrivateCookieJar,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, RecordsError>,
) -> Result<impl IntoResponse, RecordsError> {
    state.bootstrap.ensure().await?;

    let (Some(email), Some(password)) = (non_empty(req.email), non_empty(req.password)) else {
        warn!("login attempt without email or password");
        return Err(RecordsError::BadRequest(
            "Email and password are required".to_string(),
        ));
    };

    let user = auth::authenticate(state.db.as_ref(), email.trim(), &password)
        .await?
        .ok_or(RecordsError::InvalidCredentials)?;

    let session = Session::new(user);
    let jar = session::store(jar, &session, state.secure_cookies())?;
    Ok((jar, Json(session)))
}

/// GET /api/auth/session -> the current session, or `{}` when signed out.
pub async fn session_handler(jar: PrivateCookieJar) -> Result<Json<Value>, RecordsError> {
    let body = match session::load(&jar) {
        Some(session) => serde_json::to_value(session)?,
        None => json!({}),
    };
    Ok(Json(body))
}

/// POST /api/auth/logout -> drops the session cookie.
pub async fn logout_handler(jar: PrivateCookieJar) -> impl IntoResponse {
    if let Some(session) = session::load(&jar) {
        info!(email = %session.user.email, "user signed out");
    }
    (session::clear(jar), Json(json!({ "success": true })))
}
