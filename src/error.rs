use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use std::path::PathBuf;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum RecordsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(
        "No networked database address configured; set DATABASE_URL (or POSTGRES_URL) when running on the managed platform or in production"
    )]
    MissingDatabaseUrl,

    #[error(
        "Embedded database at {path} is unavailable in this environment ({source}); configure DATABASE_URL for a networked database instead"
    )]
    EmbeddedUnavailable {
        path: PathBuf,
        #[source]
        source: SqlxError,
    },

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Failed to setup admin user")]
    SeedFailed,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A body or path extractor turned the request down.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
}

impl From<JsonRejection> for RecordsError {
    fn from(rejection: JsonRejection) -> Self {
        RecordsError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for RecordsError {
    fn from(rejection: PathRejection) -> Self {
        RecordsError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl RecordsError {
    /// True when the underlying store rejected a write on a UNIQUE constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            RecordsError::Database(SqlxError::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

impl IntoResponse for RecordsError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            RecordsError::InvalidCredentials | RecordsError::Unauthorized => {
                let status = StatusCode::UNAUTHORIZED;
                let body = ApiErrorBody {
                    code: "UNAUTHORIZED".to_string(),
                    message: self.to_string(),
                };
                (status, body)
            }
            RecordsError::BadRequest(msg) => {
                let status = StatusCode::BAD_REQUEST;
                let body = ApiErrorBody {
                    code: "BAD_REQUEST".to_string(),
                    message: msg,
                };
                (status, body)
            }
            RecordsError::NotFound(what) => {
                let status = StatusCode::NOT_FOUND;
                let body = ApiErrorBody {
                    code: "NOT_FOUND".to_string(),
                    message: format!("{what} not found"),
                };
                (status, body)
            }
            RecordsError::Conflict(msg) => {
                let status = StatusCode::CONFLICT;
                let body = ApiErrorBody {
                    code: "CONFLICT".to_string(),
                    message: msg,
                };
                (status, body)
            }
            RecordsError::Rejected { status, message } => {
                let body = ApiErrorBody {
                    code: "INVALID_REQUEST".to_string(),
                    message,
                };
                (status, body)
            }
            RecordsError::MissingDatabaseUrl | RecordsError::EmbeddedUnavailable { .. } => {
                let status = StatusCode::SERVICE_UNAVAILABLE;
                let body = ApiErrorBody {
                    code: "DATABASE_UNAVAILABLE".to_string(),
                    message: "The database is not available.".to_string(),
                };
                (status, body)
            }
            RecordsError::SeedFailed => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let body = ApiErrorBody {
                    code: "SETUP_FAILED".to_string(),
                    message: self.to_string(),
                };
                (status, body)
            }
            RecordsError::Config(_)
            | RecordsError::Database(_)
            | RecordsError::Json(_)
            | RecordsError::Io(_)
            | RecordsError::PasswordHash(_)
            | RecordsError::Task(_) => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let body = ApiErrorBody {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                };
                (status, body)
            }
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
