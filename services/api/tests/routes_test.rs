//! Router-level tests for the learning endpoints.
//!
//! Every test builds the real router on top of the in-memory store and a stub
//! generation backend, then drives it with `tower::ServiceExt::oneshot`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use api_lib::adapters::MemoryStore;
use api_lib::config::Config;
use api_lib::web::{self, AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use learning_assistant_core::domain::{GenerationParams, GenerationResult, OutputMode};
use learning_assistant_core::pipeline::LearningPipeline;
use learning_assistant_core::ports::GenerationService;
use serde_json::{json, Value};
use tower::ServiceExt;

struct StubGenerator {
    result: GenerationResult,
    mode: OutputMode,
    calls: AtomicUsize,
}

#[async_trait]
impl GenerationService for StubGenerator {
    async fn generate(&self, _prompt: &str, _params: &GenerationParams) -> GenerationResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }

    fn output_mode(&self) -> OutputMode {
        self.mode
    }
}

struct TestApp {
    router: Router,
    generator: Arc<StubGenerator>,
}

fn app_with(result: GenerationResult, mode: OutputMode) -> TestApp {
    let config = Config::from_lookup(|key| match key {
        "STORAGE_BACKEND" => Some("memory".to_string()),
        _ => None,
    })
    .expect("memory config should load");

    let memory = Arc::new(MemoryStore::new());
    let generator = Arc::new(StubGenerator {
        result,
        mode,
        calls: AtomicUsize::new(0),
    });
    let pipeline = Arc::new(LearningPipeline::new(
        memory.clone(),
        generator.clone(),
        config.pipeline.clone(),
    ));
    let state = Arc::new(AppState {
        accounts: memory.clone(),
        store: memory,
        pipeline,
        config: Arc::new(config),
    });

    TestApp {
        router: web::router(state).expect("router should build"),
        generator,
    }
}

fn app_generating(text: &str) -> TestApp {
    app_with(
        GenerationResult::Success {
            text: text.to_string(),
        },
        OutputMode::TruncationRepair,
    )
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    router.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Registers `username` and returns the `session=...` cookie pair.
async fn register(router: &Router, username: &str) -> String {
    let response = send(
        router,
        "POST",
        "/register",
        None,
        Some(json!({"username": username, "password": "s3cret"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    session_cookie(&response)
}

fn session_cookie(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("response should set a session cookie")
        .to_string()
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let app = app_generating("Plan.");

    let response = send(
        &app.router,
        "POST",
        "/generate_plan",
        None,
        Some(json!({"goal": "learn Go"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app.router, "GET", "/learning_progress", Some("session=bogus"), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn generated_plan_is_stored_and_listed() {
    let app = app_generating("Overview. Week 1: basics. Week 2: conc");
    let cookie = register(&app.router, "ada").await;

    let response = send(
        &app.router,
        "POST",
        "/generate_plan",
        Some(&cookie),
        Some(json!({"goal": "learn Go", "weeklyTime": "6", "experienceLevel": "beginner"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    assert_eq!(created["plan"], "Overview. Week 1: basics.");
    assert_eq!(created["goal"], "learn Go");
    let plan_id = created["id"].as_i64().unwrap();

    let progress = json_body(send(&app.router, "GET", "/learning_progress", Some(&cookie), None).await).await;
    assert_eq!(progress.as_array().unwrap().len(), 1);
    assert_eq!(progress[0]["id"], plan_id);

    let detail = send(&app.router, "GET", &format!("/plans/{}", plan_id), Some(&cookie), None).await;
    assert_eq!(detail.status(), StatusCode::OK);
    let detail = json_body(detail).await;
    assert_eq!(detail["plan"], created["plan"]);
    assert_eq!(detail["lectures"], json!([]));
}

#[tokio::test]
async fn empty_goal_is_rejected_before_generation() {
    let app = app_generating("Plan.");
    let cookie = register(&app.router, "ada").await;

    let response = send(
        &app.router,
        "POST",
        "/generate_plan",
        Some(&cookie),
        Some(json!({"goal": "  "})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.generator.calls.load(Ordering::SeqCst), 0);
    let progress = json_body(send(&app.router, "GET", "/learning_progress", Some(&cookie), None).await).await;
    assert_eq!(progress, json!([]));
}

#[tokio::test]
async fn missing_or_null_goal_is_a_bad_request() {
    let app = app_generating("Plan.");
    let cookie = register(&app.router, "ada").await;

    for body in [json!({"weeklyTime": 3}), json!({"goal": null, "weeklyTime": 3})] {
        let response = send(&app.router, "POST", "/generate_plan", Some(&cookie), Some(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    assert_eq!(app.generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn non_positive_weekly_hours_are_a_bad_request() {
    let app = app_generating("Plan.");
    let cookie = register(&app.router, "ada").await;

    for hours in [json!(0), json!("-2")] {
        let response = send(
            &app.router,
            "POST",
            "/generate_plan",
            Some(&cookie),
            Some(json!({"goal": "learn Go", "weeklyTime": hours})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    assert_eq!(app.generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn backend_failure_is_reported_and_nothing_is_stored() {
    let app = app_with(GenerationResult::failure("503"), OutputMode::PassThrough);
    let cookie = register(&app.router, "ada").await;

    let response = send(
        &app.router,
        "POST",
        "/generate_plan",
        Some(&cookie),
        Some(json!({"goal": "learn Go"})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let progress = json_body(send(&app.router, "GET", "/learning_progress", Some(&cookie), None).await).await;
    assert_eq!(progress, json!([]));
}

#[tokio::test]
async fn lecture_lifecycle() {
    let app = app_generating("Content for the learner.");
    let cookie = register(&app.router, "ada").await;
    let plan = json_body(
        send(
            &app.router,
            "POST",
            "/generate_plan",
            Some(&cookie),
            Some(json!({"goal": "learn Go"})),
        )
        .await,
    )
    .await;
    let plan_id = plan["id"].as_i64().unwrap();

    let response = send(
        &app.router,
        "POST",
        &format!("/plans/{}/lectures", plan_id),
        Some(&cookie),
        Some(json!({"section": "Week 1"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let lecture = json_body(response).await;
    assert_eq!(lecture["plan_id"], plan_id);
    assert_eq!(lecture["section"], "Week 1");
    assert_eq!(lecture["completed"], false);
    let lecture_id = lecture["id"].as_i64().unwrap();

    let complete_uri = format!("/lectures/{}/complete", lecture_id);
    for _ in 0..2 {
        let response = send(&app.router, "POST", &complete_uri, Some(&cookie), None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let lectures = json_body(
        send(
            &app.router,
            "GET",
            &format!("/plans/{}/lectures", plan_id),
            Some(&cookie),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(lectures.as_array().unwrap().len(), 1);
    assert_eq!(lectures[0]["completed"], true);
}

#[tokio::test]
async fn lectures_of_missing_or_foreign_plans_are_not_found() {
    let app = app_generating("Content.");
    let owner = register(&app.router, "ada").await;
    let stranger = register(&app.router, "bob").await;
    let plan = json_body(
        send(
            &app.router,
            "POST",
            "/generate_plan",
            Some(&owner),
            Some(json!({"goal": "learn Go"})),
        )
        .await,
    )
    .await;
    let plan_id = plan["id"].as_i64().unwrap();

    let missing = send(
        &app.router,
        "POST",
        "/plans/999/lectures",
        Some(&owner),
        Some(json!({"section": "intro"})),
    )
    .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let foreign = send(
        &app.router,
        "POST",
        &format!("/plans/{}/lectures", plan_id),
        Some(&stranger),
        Some(json!({"section": "intro"})),
    )
    .await;
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);

    let blank = send(
        &app.router,
        "POST",
        &format!("/plans/{}/lectures", plan_id),
        Some(&owner),
        Some(json!({"section": ""})),
    )
    .await;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

    let missing_lecture = send(&app.router, "POST", "/lectures/42/complete", Some(&owner), None).await;
    assert_eq!(missing_lecture.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn account_flow() {
    let app = app_generating("Plan.");
    register(&app.router, "ada").await;

    let duplicate = send(
        &app.router,
        "POST",
        "/register",
        None,
        Some(json!({"username": "ada", "password": "other"})),
    )
    .await;
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);

    let wrong = send(
        &app.router,
        "POST",
        "/login",
        None,
        Some(json!({"username": "ada", "password": "wrong"})),
    )
    .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let login = send(
        &app.router,
        "POST",
        "/login",
        None,
        Some(json!({"username": "ada", "password": "s3cret"})),
    )
    .await;
    assert_eq!(login.status(), StatusCode::OK);
    let cookie = session_cookie(&login);

    let check = send(&app.router, "GET", "/check_login", Some(&cookie), None).await;
    assert_eq!(check.status(), StatusCode::OK);
    assert_eq!(json_body(check).await["username"], "ada");

    let logout = send(&app.router, "POST", "/logout", Some(&cookie), None).await;
    assert_eq!(logout.status(), StatusCode::OK);

    let check = send(&app.router, "GET", "/check_login", Some(&cookie), None).await;
    assert_eq!(check.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn questions_are_answered_without_storing() {
    let app = app_with(
        GenerationResult::Success {
            text: "Ownership moves values.\n".to_string(),
        },
        OutputMode::PassThrough,
    );
    let cookie = register(&app.router, "ada").await;

    let response = send(
        &app.router,
        "POST",
        "/api/ask",
        Some(&cookie),
        Some(json!({"question": "What is ownership?"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["answer"], "Ownership moves values.");

    let blank = send(
        &app.router,
        "POST",
        "/api/ask",
        Some(&cookie),
        Some(json!({"question": ""})),
    )
    .await;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
}
