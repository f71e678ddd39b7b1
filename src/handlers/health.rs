use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use crate::db::{Backend, QueryExecutor, bootstrap::SEED_EMAIL, schema::TABLES};
use crate::{RecordsError, router::RecordsState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: String,
    pub database: DatabaseReport,
    pub environment: EnvironmentReport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseReport {
    #[serde(rename = "type")]
    pub backend: Backend,
    pub initialized: bool,
    pub tables: TablesReport,
    pub admin_user_exists: bool,
}

#[derive(Debug, Serialize)]
pub struct TablesReport {
    pub users: bool,
    pub students: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentReport {
    pub app_env: Option<String>,
    pub managed_platform: bool,
    pub has_session_secret: bool,
}

/// GET /api/health -> initializes the database and reports what it finds.
pub async fn health_handler(State(state): State<RecordsState>) -> Response {
    match build_report(&state).await {
        Ok(report) => {
            info!(backend = %report.database.backend, admin = report.database.admin_user_exists, "health check passed");
            Json(report).into_response()
        }
        Err(e) => {
            error!(error = %e, "health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "unhealthy",
                    "error": e.to_string(),
                    "timestamp": Utc::now().to_rfc3339(),
                })),
            )
                .into_response()
        }
    }
}

async fn build_report(state: &RecordsState) -> Result<HealthReport, RecordsError> {
    state.bootstrap.ensure().await?;
    let db = state.db.as_ref();

    let [users, students] = TABLES;
    let tables = TablesReport {
        users: db.table_exists(users).await?,
        students: db.table_exists(students).await?,
    };

    Ok(HealthReport {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        database: DatabaseReport {
            backend: db.backend(),
            initialized: state.bootstrap.is_done(),
            tables,
            admin_user_exists: admin_exists(db).await?,
        },
        environment: EnvironmentReport {
            app_env: state.config.app_env.clone(),
            managed_platform: state.config.on_managed_platform(),
            has_session_secret: state.config.session_secret.is_some(),
        },
    })
}

async fn admin_exists(db: &dyn QueryExecutor) -> Result<bool, RecordsError> {
    let result = db
        .query("SELECT id FROM users WHERE email = $1", &[SEED_EMAIL.into()])
        .await?;
    Ok(result.row_count > 0)
}
