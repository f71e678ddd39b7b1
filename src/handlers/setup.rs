use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::db::bootstrap::{self, SEED_EMAIL, SeedOutcome};
use crate::{RecordsError, router::RecordsState};

/// GET|POST /api/setup -> creates tables and the default admin account.
pub async fn setup_handler(
    State(state): State<RecordsState>,
) -> Result<(StatusCode, Json<Value>), RecordsError> {
    match bootstrap::initialize(state.db.as_ref()).await? {
        SeedOutcome::Created => Ok((
            StatusCode::CREATED,
            Json(json!({ "message": "Admin user created successfully", "email": SEED_EMAIL })),
        )),
        SeedOutcome::AlreadyPresent => Ok((
            StatusCode::OK,
            Json(json!({ "message": "Admin user already exists", "email": SEED_EMAIL })),
        )),
        SeedOutcome::Failed => Err(RecordsError::SeedFailed),
    }
}
