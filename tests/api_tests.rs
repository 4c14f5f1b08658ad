use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{sync::Arc, time::SystemTime};
use todo_api::{
    AppConfig, AppState, InMemoryTodoRepository, JwtSessionValidator, create_router,
    auth::Claims,
    config::Env,
    models::{CreatedResponse, DeletedResponse, ErrorResponse, Todo, UpdatedResponse},
};
use tokio::net::TcpListener;
use tower::util::ServiceExt;

const TEST_SESSION_SECRET: &str = "api-test-secret";

fn app_state(repo: Arc<InMemoryTodoRepository>, env: Env) -> AppState {
    let mut config = AppConfig::default();
    config.env = env;
    config.session_secret = TEST_SESSION_SECRET.to_string();

    AppState {
        repo,
        sessions: Arc::new(JwtSessionValidator::from_config(&config)),
        config,
    }
}

fn app(repo: Arc<InMemoryTodoRepository>) -> axum::Router {
    create_router(app_state(repo, Env::Local))
}

fn token_for(user_id: &str) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SESSION_SECRET.as_bytes()),
    )
    .unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- Router Tests ---

#[tokio::test]
async fn test_health_check() {
    let response = app(Arc::new(InMemoryTodoRepository::new()))
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unauthorized_request_never_reaches_store() {
    let repo = Arc::new(InMemoryTodoRepository::new());
    let router = create_router(app_state(repo.clone(), Env::Production));

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/todos/u1")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"title":"buy milk"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let error: ErrorResponse = body_json(response).await;
    assert_eq!(error.error, "missing session token");
    assert_eq!(repo.calls(), 0);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let repo = Arc::new(InMemoryTodoRepository::new());

    for body in [r#"{"title": 42}"#, "not json", r#"{"completed": "yes"}"#, "[]"] {
        let response = app(repo.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/todos/u1")
                    .header("Content-Type", "application/json")
                    .header("x-user-id", "u1")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        let error: ErrorResponse = body_json(response).await;
        assert_eq!(error.error, "Invalid request body");
    }
    assert_eq!(repo.calls(), 0);
}

#[tokio::test]
async fn test_missing_content_type_is_bad_request() {
    let response = app(Arc::new(InMemoryTodoRepository::new()))
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/todo")
                .header("x-user-id", "u1")
                .body(Body::from(r#"{"title":"x"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_id_is_bad_request() {
    let response = app(Arc::new(InMemoryTodoRepository::new()))
        .oneshot(
            Request::builder()
                .uri("/todo/12345")
                .header("x-user-id", "u1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ErrorResponse = body_json(response).await;
    assert_eq!(error.error, "Invalid todo ID format");
}

#[tokio::test]
async fn test_store_failure_is_internal_error_with_generic_message() {
    let response = app(Arc::new(InMemoryTodoRepository::new_failing()))
        .oneshot(
            Request::builder()
                .uri("/todos/u1")
                .header("x-user-id", "u1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error: ErrorResponse = body_json(response).await;
    assert_eq!(error.error, "Failed to fetch todos");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let response = app(Arc::new(InMemoryTodoRepository::new()))
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_openapi_document_lists_todo_routes() {
    let response = app(Arc::new(InMemoryTodoRepository::new()))
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let doc: serde_json::Value = body_json(response).await;
    let paths = doc["paths"].as_object().unwrap();
    for path in ["/todo/{id}", "/todo", "/todos/{userid}", "/todos/{userid}/{id}"] {
        assert!(paths.contains_key(path), "missing {path}");
    }
}

// --- End-to-End over HTTP ---

struct TestApp {
    address: String,
}

async fn spawn_app(repo: Arc<InMemoryTodoRepository>) -> TestApp {
    let router = create_router(app_state(repo, Env::Production));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
    }
}

#[tokio::test]
async fn test_todo_lifecycle_over_http() {
    let app = spawn_app(Arc::new(InMemoryTodoRepository::new())).await;
    let client = reqwest::Client::new();
    let cookie = format!("token={}", token_for("u1"));

    // Create
    let response = client
        .post(format!("{}/todos/u1", app.address))
        .header("Cookie", &cookie)
        .json(&serde_json::json!({ "title": "buy milk" }))
        .send()
        .await
        .expect("post fail");
    assert_eq!(response.status(), 201);
    let created: CreatedResponse = response.json().await.unwrap();
    assert_eq!(created.success, "Todo created successfully");

    // Fetch one
    let response = client
        .get(format!("{}/todo/{}", app.address, created.id))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let todo: Todo = response.json().await.unwrap();
    assert_eq!(todo.userid, "u1");
    assert_eq!(todo.title, "buy milk");
    assert!(!todo.completed);

    // Update via PATCH
    let response = client
        .patch(format!("{}/todo", app.address))
        .header("Cookie", &cookie)
        .json(&serde_json::json!({
            "id": created.id, "userid": "u1", "title": "buy oat milk", "completed": true
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: UpdatedResponse = response.json().await.unwrap();
    assert_eq!((updated.matched_count, updated.modified_count), (1, 1));

    // Cross-user update
    let response = client
        .put(format!("{}/todo", app.address))
        .header("Cookie", &cookie)
        .json(&serde_json::json!({ "id": created.id, "userid": "u2", "title": "new" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // List
    let response = client
        .get(format!("{}/todos/u1", app.address))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();
    let todos: Vec<Todo> = response.json().await.unwrap();
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].title, "buy oat milk");

    // Delete one
    let response = client
        .delete(format!("{}/todos/u1/{}", app.address, created.id))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let deleted: DeletedResponse = response.json().await.unwrap();
    assert_eq!(deleted.deleted_count, 1);

    // Gone
    let response = client
        .get(format!("{}/todo/{}", app.address, created.id))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // Clearing an empty list still succeeds
    let response = client
        .delete(format!("{}/todos/u1", app.address))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let cleared: DeletedResponse = response.json().await.unwrap();
    assert_eq!(cleared.deleted_count, 0);
}
