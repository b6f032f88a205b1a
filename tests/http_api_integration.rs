//! Integration tests for the HTTP backend.
//!
//! Each test spins up an Axum server on a random port that fakes the
//! auth and onboarding endpoints, then drives `HttpApi` against it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use tutorly::api::HttpApi;
use tutorly::auth::{AccessToken, AuthService, Registration, Role, SessionManager};
use tutorly::credentials::MemoryCredentialStore;
use tutorly::error::{AuthError, PersistenceError};
use tutorly::onboarding::{
    FieldUpdate, OnboardingState, OnboardingStep, PersistenceProvider, StepPersistence,
};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const TOKEN: &str = "tok-1";

#[derive(Default)]
struct Backend {
    saved_steps: Mutex<Vec<(u8, Value)>>,
    logouts: Mutex<usize>,
}

fn user_json(email: &str, role: &str) -> Value {
    json!({
        "id": 7,
        "email": email,
        "role": role,
        "first_name": "Sarah",
        "last_name": "Jenkins",
        "status": "active"
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

async fn login(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if email.starts_with("slow") {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
    if body["password"] != "secret1" {
        return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "bad credentials"}))).into_response();
    }
    Json(json!({"access_token": TOKEN, "user": user_json(&email, "instructor")})).into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    if email.contains("taken") {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"field": "email", "detail": "already registered"})),
        )
            .into_response();
    }
    let role = body["role"].as_str().unwrap_or("student");
    Json(json!({"access_token": TOKEN, "user": user_json(email, role)})).into_response()
}

async fn me(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(user_json("sarah@t.com", "instructor")).into_response()
}

async fn logout(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> StatusCode {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    *backend.logouts.lock().unwrap() += 1;
    StatusCode::NO_CONTENT
}

async fn save_step(
    State(backend): State<Arc<Backend>>,
    Path(step): Path<u8>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    if step == 5 {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    backend.saved_steps.lock().unwrap().push((step, body));
    StatusCode::OK
}

/// Start the fake backend on a random port, return (base URL, state).
async fn start_server() -> (String, Arc<Backend>) {
    let backend = Arc::new(Backend::default());
    let app = axum::Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
        .route("/instructor/onboarding/steps/{step}", put(save_step))
        .with_state(Arc::clone(&backend));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{port}"), backend)
}

fn client(base_url: &str) -> HttpApi {
    HttpApi::new(base_url, Duration::from_secs(2)).unwrap()
}

fn password(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

// ── Auth ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_returns_token_and_user() {
    timeout(TEST_TIMEOUT, async {
        let (url, _) = start_server().await;
        let resp = client(&url)
            .login("sarah@t.com", &password("secret1"))
            .await
            .unwrap();

        assert_eq!(resp.access_token.expose(), TOKEN);
        assert_eq!(resp.user.id, 7);
        assert_eq!(resp.user.role, Role::Instructor);
        assert_eq!(resp.user.email, "sarah@t.com");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials() {
    timeout(TEST_TIMEOUT, async {
        let (url, _) = start_server().await;
        let err = client(&url)
            .login("sarah@t.com", &password("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rejected_registration_is_validation_error() {
    timeout(TEST_TIMEOUT, async {
        let (url, _) = start_server().await;
        let registration = Registration::new("Sam", "Lee", "taken@t.com", "secret1", Role::Student);
        let err = client(&url).register(&registration).await.unwrap_err();
        match err {
            AuthError::Validation { field, reason } => {
                assert_eq!(field, "email");
                assert_eq!(reason, "already registered");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn registration_sends_role() {
    timeout(TEST_TIMEOUT, async {
        let (url, _) = start_server().await;
        let registration = Registration::new("Sam", "Lee", "sam@t.com", "secret1", Role::Instructor);
        let resp = client(&url).register(&registration).await.unwrap();
        assert_eq!(resp.user.role, Role::Instructor);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn current_user_requires_bearer_token() {
    timeout(TEST_TIMEOUT, async {
        let (url, _) = start_server().await;
        let api = client(&url);

        let user = api.current_user(&AccessToken::new(TOKEN)).await.unwrap();
        assert_eq!(user.email, "sarah@t.com");

        let err = api
            .current_user(&AccessToken::new("stale"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn slow_backend_times_out() {
    timeout(TEST_TIMEOUT, async {
        let (url, _) = start_server().await;
        let api = HttpApi::new(&url, Duration::from_millis(200)).unwrap();
        let err = api
            .login("slow@t.com", &password("secret1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Timeout(d) if d == Duration::from_millis(200)));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn session_manager_over_http_notifies_logout() {
    timeout(TEST_TIMEOUT, async {
        let (url, backend) = start_server().await;
        let sessions = SessionManager::new(Arc::new(MemoryCredentialStore::new()), Arc::new(client(&url)));
        sessions.initialize().await;

        let session = sessions.login("sarah@t.com", &password("secret1")).await.unwrap();
        assert!(session.is_authenticated());

        let notification = sessions.logout().expect("token present, notification expected");
        notification.await.unwrap();
        assert!(!sessions.is_authenticated());
        assert_eq!(*backend.logouts.lock().unwrap(), 1);
    })
    .await
    .expect("test timed out");
}

// ── Onboarding ───────────────────────────────────────────────────────

#[tokio::test]
async fn step_saves_are_put_with_form_payload() {
    timeout(TEST_TIMEOUT, async {
        let (url, backend) = start_server().await;
        let api = client(&url);
        let user = api.current_user(&AccessToken::new(TOKEN)).await.unwrap();
        let persistence = api.for_session(&AccessToken::new(TOKEN), &user);

        let mut state = OnboardingState::new();
        state.apply(FieldUpdate::Country("United Kingdom".into()));
        persistence
            .save_step(OnboardingStep::About, state.form())
            .await
            .unwrap();

        let saved = backend.saved_steps.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, 1);
        assert_eq!(saved[0].1["step"], 1);
        assert_eq!(saved[0].1["data"]["country"], "United Kingdom");
        assert_eq!(saved[0].1["data"]["pricing"]["regular"], 20);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rejected_step_save_is_save_failed() {
    timeout(TEST_TIMEOUT, async {
        let (url, backend) = start_server().await;
        let api = client(&url);

        let err = api
            .steps(AccessToken::new(TOKEN))
            .save_step(OnboardingStep::Pricing, &Default::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::SaveFailed { step: 5, .. }));

        let err = api
            .steps(AccessToken::new("stale"))
            .save_step(OnboardingStep::About, &Default::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::SaveFailed { step: 1, .. }));
        assert!(backend.saved_steps.lock().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}
