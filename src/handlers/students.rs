use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::non_empty;
use crate::db::models::{self, Student};
use crate::db::{QueryExecutor, SqlParam};
use crate::middleware::RequireSession;
use crate::{RecordsError, router::RecordsState};

const DEFAULT_STATUS: &str = "active";

/// Request body for create and update. Blank strings count as missing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub enrollment_date: Option<String>,
    pub status: Option<String>,
}

struct Required {
    first_name: String,
    last_name: String,
    email: String,
}

impl StudentPayload {
    fn required(&mut self) -> Result<Required, RecordsError> {
        match (
            non_empty(self.first_name.take()),
            non_empty(self.last_name.take()),
            non_empty(self.email.take()),
        ) {
            (Some(first_name), Some(last_name), Some(email)) => Ok(Required {
                first_name,
                last_name,
                email: email.trim().to_string(),
            }),
            _ => Err(missing_fields()),
        }
    }

    /// phone, dateOfBirth, address, city, postalCode, country, in column order.
    fn optional_params(&mut self) -> [SqlParam; 6] {
        [
            non_empty(self.phone.take()).into(),
            non_empty(self.date_of_birth.take()).into(),
            non_empty(self.address.take()).into(),
            non_empty(self.city.take()).into(),
            non_empty(self.postal_code.take()).into(),
            non_empty(self.country.take()).into(),
        ]
    }
}

fn missing_fields() -> RecordsError {
    RecordsError::BadRequest("Missing required fields".to_string())
}

/// Maps a duplicate email to 409; everything else passes through.
fn conflict_on_duplicate(e: RecordsError) -> RecordsError {
    if e.is_unique_violation() {
        RecordsError::Conflict("A student with this email already exists".to_string())
    } else {
        e
    }
}

async fn find_by(
    db: &dyn QueryExecutor,
    column: &str,
    value: SqlParam,
) -> Result<Option<Student>, RecordsError> {
    let sql = format!("SELECT * FROM students WHERE {column} = $1");
    db.query(&sql, &[value])
        .await?
        .into_first()
        .map(models::from_row)
        .transpose()
        .map_err(Into::into)
}

/// GET /api/students -> newest first.
pub async fn list_students(
    State(state): State<RecordsState>,
    _session: RequireSession,
) -> Result<Json<Vec<Student>>, RecordsError> {
    state.bootstrap.ensure().await?;
    let result = state
        .db
        .query("SELECT * FROM students ORDER BY id DESC", &[])
        .await?;
    let students = result
        .rows
        .into_iter()
        .map(models::from_row)
        .collect::<Result<Vec<Student>, _>>()?;
    Ok(Json(students))
}

/// POST /api/students -> 201 with the stored row.
pub async fn create_student(
    State(state): State<RecordsState>,
    RequireSession(session): RequireSession,
    WithRejection(Json(mut payload), _): WithRejection<Json<StudentPayload>, RecordsError>,
) -> Result<(StatusCode, Json<Student>), RecordsError> {
    state.bootstrap.ensure().await?;

    let required = payload.required()?;
    let enrollment_date = non_empty(payload.enrollment_date.take()).ok_or_else(missing_fields)?;
    let [phone, date_of_birth, address, city, postal_code, country] = payload.optional_params();

    state
        .db
        .query(
            r#"INSERT INTO students (
                "firstName", "lastName", email, phone, "dateOfBirth",
                address, city, "postalCode", country, "enrollmentDate", status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
            &[
                required.first_name.into(),
                required.last_name.into(),
                required.email.as_str().into(),
                phone,
                date_of_birth,
                address,
                city,
                postal_code,
                country,
                enrollment_date.into(),
                DEFAULT_STATUS.into(),
            ],
        )
        .await
        .map_err(conflict_on_duplicate)?;

    // The embedded backend reports no inserted row, so read it back by its unique email.
    let student = find_by(state.db.as_ref(), "email", required.email.into())
        .await?
        .ok_or(RecordsError::NotFound("Student"))?;

    info!(id = student.id, by = %session.user.email, "student created");
    Ok((StatusCode::CREATED, Json(student)))
}

/// GET /api/students/{id}
pub async fn get_student(
    State(state): State<RecordsState>,
    _session: RequireSession,
    WithRejection(Path(id), _): WithRejection<Path<i64>, RecordsError>,
) -> Result<Json<Student>, RecordsError> {
    state.bootstrap.ensure().await?;
    find_by(state.db.as_ref(), "id", id.into())
        .await?
        .map(Json)
        .ok_or(RecordsError::NotFound("Student"))
}

/// PUT /api/students/{id} -> replaces the editable fields and bumps `updatedAt`.
/// `enrollmentDate` is kept when the body omits it.
pub async fn update_student(
    State(state): State<RecordsState>,
    RequireSession(session): RequireSession,
    WithRejection(Path(id), _): WithRejection<Path<i64>, RecordsError>,
    WithRejection(Json(mut payload), _): WithRejection<Json<StudentPayload>, RecordsError>,
) -> Result<Json<Value>, RecordsError> {
    state.bootstrap.ensure().await?;

    let required = payload.required()?;
    let enrollment_date: SqlParam = non_empty(payload.enrollment_date.take()).into();
    let status = non_empty(payload.status.take()).unwrap_or_else(|| DEFAULT_STATUS.to_string());
    let [phone, date_of_birth, address, city, postal_code, country] = payload.optional_params();

    let result = state
        .db
        .query(
            r#"UPDATE students SET
                "firstName" = $1, "lastName" = $2, email = $3, phone = $4,
                "dateOfBirth" = $5, address = $6, city = $7, "postalCode" = $8,
                country = $9, status = $10,
                "enrollmentDate" = COALESCE($11, "enrollmentDate"),
                "updatedAt" = CURRENT_TIMESTAMP
            WHERE id = $12"#,
            &[
                required.first_name.into(),
                required.last_name.into(),
                required.email.into(),
                phone,
                date_of_birth,
                address,
                city,
                postal_code,
                country,
                status.into(),
                enrollment_date,
                id.into(),
            ],
        )
        .await
        .map_err(conflict_on_duplicate)?;

    if result.row_count == 0 {
        return Err(RecordsError::NotFound("Student"));
    }
    info!(id, by = %session.user.email, "student updated");
    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/students/{id}
pub async fn delete_student(
    State(state): State<RecordsState>,
    RequireSession(session): RequireSession,
    WithRejection(Path(id), _): WithRejection<Path<i64>, RecordsError>,
) -> Result<Json<Value>, RecordsError> {
    state.bootstrap.ensure().await?;
    let result = state
        .db
        .query("DELETE FROM students WHERE id = $1", &[id.into()])
        .await?;
    if result.row_count == 0 {
        return Err(RecordsError::NotFound("Student"));
    }
    info!(id, by = %session.user.email, "student deleted");
    Ok(Json(json!({ "success": true })))
}
