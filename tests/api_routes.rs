use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use student_records::config::Config;
use student_records::db::SqliteExecutor;
use student_records::router::{RecordsState, records_router};
use tempfile::TempDir;
use tower::ServiceExt;

fn test_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let cfg = Config {
        sqlite_path: dir.path().join("students.db"),
        session_secret: Some("s".repeat(64)),
        insecure_cookie: true,
        ..Config::default()
    };
    let db = Arc::new(SqliteExecutor::new(cfg.sqlite_path.clone()));
    let state = RecordsState::new(db, cfg).expect("failed to build state");
    (records_router(state), dir)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let resp = app.clone().oneshot(req).await.expect("request failed");
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = resp
        .into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("failed to build request")
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("records_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

async fn login(app: &Router) -> String {
    let (status, headers, body) = send(
        app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "admin@example.com", "password": "admin123" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "admin");
    session_cookie(&headers).expect("login did not set a session cookie")
}

#[tokio::test]
async fn health_reports_initialized_embedded_database() {
    let (app, _dir) = test_app();
    let (status, _, body) = send(&app, request("GET", "/api/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["type"], "sqlite");
    assert_eq!(body["database"]["initialized"], true);
    assert_eq!(body["database"]["tables"]["users"], true);
    assert_eq!(body["database"]["tables"]["students"], true);
    assert_eq!(body["database"]["adminUserExists"], true);
    assert_eq!(body["environment"]["hasSessionSecret"], true);
}

#[tokio::test]
async fn setup_creates_admin_once() {
    let (app, _dir) = test_app();
    let (status, _, body) = send(&app, request("POST", "/api/setup", None, None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "admin@example.com");

    let (status, _, body) = send(&app, request("GET", "/api/setup", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Admin user already exists");
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let (app, _dir) = test_app();

    let (status, headers, _) = send(
        &app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "admin@example.com", "password": "nope" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(session_cookie(&headers).is_none());

    let (status, _, _) = send(
        &app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "admin@example.com" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_endpoint_reflects_login_state() {
    let (app, _dir) = test_app();

    let (status, _, body) = send(&app, request("GET", "/api/auth/session", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let cookie = login(&app).await;
    let (_, _, body) = send(&app, request("GET", "/api/auth/session", Some(&cookie), None)).await;
    assert_eq!(body["user"]["email"], "admin@example.com");

    let (status, _, _) = send(&app, request("GET", "/api/auth/session", Some("records_session=forged"), None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn students_require_a_session() {
    let (app, _dir) = test_app();
    for (method, uri) in [
        ("GET", "/api/students"),
        ("GET", "/api/students/1"),
        ("DELETE", "/api/students/1"),
    ] {
        let (status, _, _) = send(&app, request(method, uri, None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
    }

    let (status, _, _) = send(
        &app,
        request("GET", "/api/students", Some("records_session=forged"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn student_crud_flow() {
    let (app, _dir) = test_app();
    let cookie = login(&app).await;
    let cookie = Some(cookie.as_str());

    let (status, _, created) = send(
        &app,
        request(
            "POST",
            "/api/students",
            cookie,
            Some(json!({
                "firstName": "John",
                "lastName": "Doe",
                "email": "john.doe@example.com",
                "phone": "",
                "enrollmentDate": "2024-09-01"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "active");
    assert_eq!(created["phone"], Value::Null);
    assert_eq!(created["country"], Value::Null);
    let id = created["id"].as_i64().expect("id should be a number");

    let (status, _, _) = send(
        &app,
        request(
            "POST",
            "/api/students",
            cookie,
            Some(json!({
                "firstName": "Jane",
                "lastName": "Doe",
                "email": "john.doe@example.com",
                "enrollmentDate": "2024-09-01"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, _) = send(
        &app,
        request(
            "POST",
            "/api/students",
            cookie,
            Some(json!({ "firstName": "No", "lastName": "Date", "email": "x@example.com" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, list) = send(&app, request("GET", "/api/students", cookie, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let uri = format!("/api/students/{id}");
    let (status, _, body) = send(
        &app,
        request(
            "PUT",
            &uri,
            cookie,
            Some(json!({
                "firstName": "Johnny",
                "lastName": "Doe",
                "email": "john.doe@example.com",
                "city": "Lisbon",
                "status": "graduated"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _, fetched) = send(&app, request("GET", &uri, cookie, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["firstName"], "Johnny");
    assert_eq!(fetched["city"], "Lisbon");
    assert_eq!(fetched["status"], "graduated");
    assert_eq!(fetched["enrollmentDate"], "2024-09-01");

    let (status, _, _) = send(
        &app,
        request(
            "PUT",
            "/api/students/9999",
            cookie,
            Some(json!({ "firstName": "A", "lastName": "B", "email": "ab@example.com" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&app, request("DELETE", &uri, cookie, None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(&app, request("GET", &uri, cookie, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = send(&app, request("DELETE", &uri, cookie, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let (app, _dir) = test_app();
    let cookie = login(&app).await;

    let (status, headers, body) =
        send(&app, request("POST", "/api/auth/logout", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let cleared = headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with("records_session=") && v.contains("Max-Age=0"));
    assert!(cleared);
}

#[tokio::test]
async fn malformed_requests_get_the_error_envelope() {
    let (app, _dir) = test_app();
    let cookie = login(&app).await;

    let bad_json = Request::builder()
        .method("POST")
        .uri("/api/students")
        .header(header::COOKIE, &cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("failed to build request");
    let (status, _, body) = send(&app, bad_json).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");

    let no_content_type = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .body(Body::from(r#"{"email":"a","password":"b"}"#))
        .expect("failed to build request");
    let (status, _, body) = send(&app, no_content_type).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");

    let (status, _, body) =
        send(&app, request("GET", "/api/students/abc", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}
