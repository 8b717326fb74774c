use std::sync::{Arc, Mutex};

use axum::extract::{Path, Request, State};
use axum::http::{StatusCode, header::AUTHORIZATION};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use learnhub::api::{HttpApiClient, LearningApi};
use learnhub::config::AppConfig;
use learnhub::error::AppError;
use learnhub::models::{CourseFilters, Level, ProgressWrite};
use learnhub::routing::{Navigator, Route};
use learnhub::session::{SessionManager, SqliteStorage, TOKEN_KEY, TokenStorage};
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct Seen {
    auth: Arc<Mutex<Vec<Option<String>>>>,
    queries: Arc<Mutex<Vec<Option<String>>>>,
}

impl Seen {
    fn last_auth(&self) -> Option<String> {
        self.auth.lock().unwrap().last().cloned().flatten()
    }

    fn last_query(&self) -> Option<String> {
        self.queries.lock().unwrap().last().cloned().flatten()
    }
}

fn course_json(id: u64) -> Value {
    json!({
        "id": id,
        "title": format!("Course {}", id),
        "description": "A course",
        "instructor": {"id": 1, "username": "ferris"},
        "category": null,
        "thumbnail": null,
        "price": "19.00",
        "is_free": false,
        "duration_hours": 4,
        "level": "beginner",
        "lessons_count": 2,
        "enrolled_count": 3,
        "is_enrolled": false,
        "lessons": [
            {"id": 10, "title": "One", "description": "", "video_url": null,
             "content": "", "order": 1, "duration_minutes": 5},
            {"id": 11, "title": "Two", "description": "", "video_url": null,
             "content": "", "order": 2, "duration_minutes": 5}
        ]
    })
}

fn enrollment_json(id: u64, course_id: u64) -> Value {
    json!({
        "id": id,
        "student": {"id": 5, "username": "learner"},
        "course": course_json(course_id),
        "enrolled_at": "2024-03-01T10:00:00Z",
        "completed_at": null,
        "is_completed": false,
        "progress_percentage": 50
    })
}

async fn auth_gate(State(seen): State<Seen>, request: Request, next: Next) -> Response {
    let auth = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    seen.auth.lock().unwrap().push(auth.clone());
    seen.queries
        .lock()
        .unwrap()
        .push(request.uri().query().map(str::to_string));

    if auth.as_deref() == Some("Bearer expired") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Given token not valid for any token type"})),
        )
            .into_response();
    }
    next.run(request).await
}

async fn list_courses() -> Json<Value> {
    Json(json!([course_json(1), course_json(2)]))
}

async fn get_course(Path(id): Path<u64>) -> Response {
    if id > 2 {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response();
    }
    Json(course_json(id)).into_response()
}

async fn my_enrollment(Path(id): Path<u64>) -> Response {
    if id == 2 {
        return Json(enrollment_json(70, 2)).into_response();
    }
    (
        StatusCode::NOT_FOUND,
        Json(json!({"message": "Not enrolled in this course"})),
    )
        .into_response()
}

async fn enroll(Path(_id): Path<u64>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"message": "Already enrolled in this course"})),
    )
        .into_response()
}

async fn enrollments() -> Json<Value> {
    Json(json!({
        "count": 1,
        "next": null,
        "previous": null,
        "results": [enrollment_json(70, 2)]
    }))
}

async fn progress() -> Json<Value> {
    Json(json!([
        {"id": 1, "lesson": {"id": 10, "title": "One"}, "completed": true,
         "completed_at": "2024-03-02T10:00:00Z", "last_position": 0},
        {"id": 2, "lesson": {"id": 11, "title": "Two"}, "completed": false,
         "completed_at": null, "last_position": 30}
    ]))
}

async fn record_progress(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({
            "id": 99,
            "lesson": {"id": body["lesson"], "title": "Two"},
            "completed": body["completed"],
            "completed_at": null,
            "last_position": 0
        })),
    )
}

async fn categories() -> Json<Value> {
    Json(json!([{"id": 1, "name": "Programming", "description": ""}]))
}

async fn spawn_server() -> (String, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/api/courses/", get(list_courses))
        .route("/api/courses/{id}/", get(get_course))
        .route("/api/courses/{id}/my_enrollment/", get(my_enrollment))
        .route("/api/courses/{id}/enroll/", post(enroll))
        .route("/api/enrollments/", get(enrollments))
        .route("/api/progress/", get(progress).post(record_progress))
        .route("/api/categories/", get(categories))
        .layer(middleware::from_fn_with_state(seen.clone(), auth_gate));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server crashed");
    });

    (format!("http://{}/api", addr), seen)
}

fn client(base: &str, session: &SessionManager, navigator: &Navigator) -> HttpApiClient {
    let config = AppConfig::new(base, "sqlite::memory:");
    HttpApiClient::new(config, session.clone(), navigator.clone()).expect("client")
}

#[tokio::test]
async fn test_bearer_token_is_attached_when_present() {
    let (base, seen) = spawn_server().await;
    let session = SessionManager::in_memory();
    let api = client(&base, &session, &Navigator::default());

    api.get_course(1).await.unwrap();
    assert_eq!(seen.last_auth(), None);

    session.set("abc123").await.unwrap();
    api.get_course(1).await.unwrap();
    assert_eq!(seen.last_auth().as_deref(), Some("Bearer abc123"));
}

#[tokio::test]
async fn test_unauthorized_clears_session_and_redirects() {
    let (base, seen) = spawn_server().await;
    let session = SessionManager::in_memory();
    session.set("expired").await.unwrap();
    let navigator = Navigator::new(Route::Dashboard);
    let api = client(&base, &session, &navigator);

    let err = api.list_enrollments().await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
    assert!(!session.is_authenticated());
    assert_eq!(navigator.current(), Route::Login);

    api.list_categories().await.unwrap();
    assert_eq!(seen.last_auth(), None);
}

#[tokio::test]
async fn test_unauthorized_on_auth_screen_does_not_navigate() {
    let (base, _seen) = spawn_server().await;
    let session = SessionManager::in_memory();
    session.set("expired").await.unwrap();
    let navigator = Navigator::new(Route::Register);
    let api = client(&base, &session, &navigator);

    assert!(api.list_categories().await.is_err());
    assert_eq!(navigator.current(), Route::Register);
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_unauthorized_removes_persisted_token() {
    let (base, _seen) = spawn_server().await;
    let storage: Arc<dyn TokenStorage> =
        Arc::new(SqliteStorage::connect("sqlite::memory:").await.unwrap());
    let session = SessionManager::load(storage.clone()).await.unwrap();
    session.set("expired").await.unwrap();
    let api = client(&base, &session, &Navigator::default());

    assert!(api.get_course(1).await.is_err());
    assert_eq!(storage.get(TOKEN_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_missing_enrollment_is_none() {
    let (base, _seen) = spawn_server().await;
    let session = SessionManager::in_memory();
    session.set("abc123").await.unwrap();
    let api = client(&base, &session, &Navigator::default());

    assert_eq!(api.my_enrollment(1).await.unwrap(), None);
    let enrollment = api.my_enrollment(2).await.unwrap().expect("enrolled");
    assert_eq!(enrollment.id, 70);
    assert_eq!(enrollment.progress(), 50);
}

#[tokio::test]
async fn test_enroll_error_keeps_server_message() {
    let (base, _seen) = spawn_server().await;
    let api = client(&base, &SessionManager::in_memory(), &Navigator::default());

    let err = api.enroll(1).await.unwrap_err();
    assert_eq!(err.server_message(), Some("Already enrolled in this course"));
}

#[tokio::test]
async fn test_missing_course_is_not_found() {
    let (base, _seen) = spawn_server().await;
    let api = client(&base, &SessionManager::in_memory(), &Navigator::default());

    assert!(api.get_course(404).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_plain_and_paginated_collections_normalize() {
    let (base, _seen) = spawn_server().await;
    let api = client(&base, &SessionManager::in_memory(), &Navigator::default());

    let courses = api.list_courses(&CourseFilters::default()).await.unwrap();
    assert_eq!(courses.items.len(), 2);
    assert_eq!(courses.total, 2);
    assert!(!courses.has_more());

    let enrollments = api.list_enrollments().await.unwrap();
    assert_eq!(enrollments.total, 1);
    assert_eq!(enrollments.items[0].course.id, 2);
}

#[tokio::test]
async fn test_catalog_query_only_carries_non_empty_filters() {
    let (base, seen) = spawn_server().await;
    let api = client(&base, &SessionManager::in_memory(), &Navigator::default());

    api.list_courses(&CourseFilters::default()).await.unwrap();
    assert_eq!(seen.last_query(), None);

    let filters = CourseFilters {
        category: String::new(),
        level: Some(Level::Advanced),
        search: "rust".to_string(),
    };
    api.list_courses(&filters).await.unwrap();
    assert_eq!(seen.last_query().as_deref(), Some("level=advanced&search=rust"));

    let filters = CourseFilters {
        category: "Programming".to_string(),
        ..CourseFilters::default()
    };
    api.list_courses(&filters).await.unwrap();
    assert_eq!(seen.last_query().as_deref(), Some("category=Programming"));
}

#[tokio::test]
async fn test_progress_lookup_and_write() {
    let (base, seen) = spawn_server().await;
    let api = client(&base, &SessionManager::in_memory(), &Navigator::default());

    let progress = api.find_progress(70, 11).await.unwrap().expect("row for lesson 11");
    assert_eq!(progress.lesson.id(), 11);
    assert!(!progress.completed);
    assert_eq!(seen.last_query().as_deref(), Some("enrollment=70&lesson=11"));

    assert_eq!(api.find_progress(70, 12).await.unwrap(), None);

    let written = api
        .record_progress(&ProgressWrite {
            enrollment: 70,
            lesson: 11,
            completed: true,
        })
        .await
        .unwrap();
    assert_eq!(written.lesson.id(), 11);
    assert!(written.completed);
}
