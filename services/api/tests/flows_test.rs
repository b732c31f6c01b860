//! End-to-end tests of the HTTP surface: login gate, the three generation flows
//! and DOCX export, driven through the router with a scripted generator.

use api_lib::{
    adapters::{DocxExporter, InMemorySessionStore, YamlCredentialStore},
    config::{AuthConfig, Config},
    web::{self, state::AppState},
};
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use coursegen_core::{
    domain::{FlowKind, GenerationRequest},
    ports::{PortError, PortResult, TextExtractionService, TextGenerationService},
};
use rand_core::OsRng;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tower::ServiceExt;

const COOKIE_NAME: &str = "coursegen_auth";
const BOUNDARY: &str = "coursegen-test-boundary";

//=========================================================================================
// Test Doubles
//=========================================================================================

/// Returns queued replies in order, then a fixed text. Records every request.
#[derive(Default)]
struct ScriptedGenerator {
    replies: Mutex<VecDeque<PortResult<String>>>,
    calls: Mutex<Vec<(FlowKind, String)>>,
}

impl ScriptedGenerator {
    fn reply(&self, text: &str) {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
    }

    fn fail(&self, message: &str) {
        self.fail_with(PortError::Upstream(message.to_string()));
    }

    fn fail_with(&self, error: PortError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    fn calls(&self) -> Vec<(FlowKind, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn last_prompt(&self) -> String {
        self.calls().last().map(|(_, p)| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerationService for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> PortResult<String> {
        self.calls
            .lock()
            .unwrap()
            .push((request.flow(), request.prompt().to_string()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("generated text".to_string()))
    }
}

/// Signals `entered` when a request arrives, then holds it until `gate` opens.
#[derive(Default)]
struct GatedGenerator {
    entered: Notify,
    gate: Notify,
}

#[async_trait]
impl TextGenerationService for GatedGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> PortResult<String> {
        self.entered.notify_one();
        self.gate.notified().await;
        Ok("Recursion notes.".to_string())
    }
}

/// Treats uploaded bytes as already-extracted text.
struct PlainTextExtractor;

impl TextExtractionService for PlainTextExtractor {
    fn extract_text(&self, data: &[u8]) -> PortResult<String> {
        String::from_utf8(data.to_vec()).map_err(|e| PortError::InvalidInput(e.to_string()))
    }
}

struct PanickingExtractor;

impl TextExtractionService for PanickingExtractor {
    fn extract_text(&self, _data: &[u8]) -> PortResult<String> {
        panic!("malformed cross-reference table");
    }
}

//=========================================================================================
// Harness
//=========================================================================================

struct TestApp {
    router: Router,
    generator: Arc<ScriptedGenerator>,
}

fn hash(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

fn test_app() -> TestApp {
    let generator = Arc::new(ScriptedGenerator::default());
    TestApp {
        router: test_router(generator.clone(), Arc::new(PlainTextExtractor)),
        generator,
    }
}

/// An app whose generator or extractor is not the scripted one. The
/// `generator` field of the result is then never called.
fn test_app_with(
    generator: Arc<dyn TextGenerationService>,
    extractor: Arc<dyn TextExtractionService>,
) -> TestApp {
    TestApp {
        router: test_router(generator, extractor),
        generator: Arc::new(ScriptedGenerator::default()),
    }
}

fn test_router(
    generator: Arc<dyn TextGenerationService>,
    extractor: Arc<dyn TextExtractionService>,
) -> Router {
    let config = Config::from_lookup(|name| match name {
        "OPENAI_API_KEY" => Some("test-key".to_string()),
        _ => None,
    })
    .unwrap();

    let auth_yaml = format!(
        r#"
credentials:
  usernames:
    jdoe:
      name: John Doe
      password: "{}"
      email: jdoe@example.com
    asmith:
      name: Alice Smith
      password: "{}"
    legacy:
      name: Legacy User
      password: "{}"
cookie:
  name: {}
  key: integration-test-signing-key
  expiry_days: 30
"#,
        hash("password123"),
        hash("alice-secret"),
        bcrypt::hash("legacy-secret", 4).unwrap(),
        COOKIE_NAME
    );
    let auth_config = AuthConfig::from_yaml_str(&auth_yaml).unwrap();

    let state = Arc::new(AppState {
        config: Arc::new(config),
        credentials: Arc::new(YamlCredentialStore::from_config(&auth_config)),
        cookie: auth_config.cookie,
        sessions: Arc::new(InMemorySessionStore::new()),
        generator,
        exporter: Arc::new(DocxExporter::new()),
        extractor,
    });
    web::router(state)
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.send(json_request(
            Method::POST,
            "/auth/login",
            None,
            json!({ "username": username, "password": password }),
        ))
        .await
    }

    /// Logs in as `jdoe` and returns the `name=value` cookie pair.
    async fn login_cookie(&self) -> String {
        let response = self.login("jdoe", "password123").await;
        assert_eq!(response.status, StatusCode::OK);
        let set_cookie = response.headers[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn upload_syllabus(&self, cookie: &str, syllabus: &str) -> TestResponse {
        self.send(multipart_request(
            "/lesson-plan",
            cookie,
            &[
                Part::file("syllabus", "syllabus.txt", syllabus.as_bytes()),
                Part::text("difficulty", "Btech"),
                Part::text("temperature", "0.5"),
            ],
        ))
        .await
    }
}

fn json_request(method: Method, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

struct Part<'a> {
    name: &'a str,
    file_name: Option<&'a str>,
    data: &'a [u8],
}

impl<'a> Part<'a> {
    fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            file_name: None,
            data: value.as_bytes(),
        }
    }

    fn file(name: &'a str, file_name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            file_name: Some(file_name),
            data,
        }
    }
}

fn multipart_request(uri: &str, cookie: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    part.name, file_name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    part.name
                )
                .as_bytes(),
            ),
        }
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap()
}

const OUTLINE: &str = "Algorithms\n\
Algorithms -> Sorting\n\
Algorithms -> Sorting -> Merge sort\n\
Data Structures";

//=========================================================================================
// Login Gate
//=========================================================================================

#[tokio::test]
async fn login_sets_cookie_and_opens_a_session() {
    let app = test_app();

    let response = app.login("jdoe", "password123").await;
    assert_eq!(response.status, StatusCode::OK);
    let set_cookie = response.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with(&format!("{}=", COOKIE_NAME)));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains(&format!("Max-Age={}", 30 * 24 * 60 * 60)));
    assert_eq!(response.json()["name"], "John Doe");

    let cookie = set_cookie.split(';').next().unwrap();
    let session = app.get("/session", Some(cookie)).await;
    assert_eq!(session.status, StatusCode::OK);
    let body = session.json();
    assert_eq!(body["username"], "jdoe");
    assert_eq!(body["name"], "John Doe");
    assert_eq!(body["difficulty"], "Btech");
    assert_eq!(body["lesson_plan"], Value::Null);
    assert_eq!(body["has_textbook"], false);
    assert!(body["created_at"].is_string());
    assert!(body["expires_at"].is_string());
}

#[tokio::test]
async fn bcrypt_hashed_users_can_log_in() {
    let app = test_app();

    let response = app.login("legacy", "legacy-secret").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["name"], "Legacy User");

    let wrong = app.login("legacy", "password123").await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_the_same() {
    let app = test_app();

    let wrong = app.login("jdoe", "nope").await;
    let unknown = app.login("mallory", "password123").await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.text(), "Username/password is incorrect");
    assert_eq!(wrong.text(), unknown.text());
    assert!(wrong.headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn blank_credentials_are_rejected_before_lookup() {
    let app = test_app();
    let response = app.login("  ", "").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), "Please enter your username and password");
}

#[tokio::test]
async fn protected_routes_require_a_valid_cookie() {
    let app = test_app();

    assert_eq!(app.get("/health", None).await.status, StatusCode::OK);
    for uri in ["/session", "/lesson-plan/export", "/notes/export"] {
        assert_eq!(app.get(uri, None).await.status, StatusCode::UNAUTHORIZED);
    }

    let forged = format!("{}=not.a.token", COOKIE_NAME);
    assert_eq!(
        app.get("/session", Some(&forged)).await.status,
        StatusCode::UNAUTHORIZED
    );

    let qa = app
        .send(json_request(
            Method::POST,
            "/qa",
            None,
            json!({ "question": "What is recursion?" }),
        ))
        .await;
    assert_eq!(qa.status, StatusCode::UNAUTHORIZED);
    assert!(app.generator.calls().is_empty());
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let app = test_app();
    let cookie = app.login_cookie().await;

    let logout = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/auth/logout")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(logout.status, StatusCode::OK);
    let cleared = logout.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));

    // The token itself is still unexpired, but its session is gone.
    assert_eq!(
        app.get("/session", Some(&cookie)).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn each_login_gets_its_own_workspace() {
    let app = test_app();
    let first = app.login_cookie().await;
    let second = app.login_cookie().await;

    app.generator.reply(OUTLINE);
    let response = app.upload_syllabus(&first, "Unit 1: Algorithms").await;
    assert_eq!(response.status, StatusCode::OK);

    let other = app.get("/session", Some(&second)).await.json();
    assert_eq!(other["lesson_plan"], Value::Null);
}

//=========================================================================================
// Lesson Plan
//=========================================================================================

#[tokio::test]
async fn lesson_plan_is_generated_from_the_syllabus() {
    let app = test_app();
    let cookie = app.login_cookie().await;

    app.generator.reply(&format!("  {}\n", OUTLINE));
    let response = app.upload_syllabus(&cookie, "Unit 1: Algorithms").await;
    assert_eq!(response.status, StatusCode::OK);

    let calls = app.generator.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, FlowKind::LessonPlan);
    assert!(calls[0].1.contains("Syllabus: Unit 1: Algorithms"));
    assert!(calls[0].1.contains("Difficulty Level: Btech"));
    assert!(calls[0].1.contains("->"));

    let body = response.json();
    assert_eq!(body["difficulty"], "Btech");
    let outline = body["outline"].as_array().unwrap();
    assert_eq!(outline.len(), 2);
    assert_eq!(outline[0]["title"], "Algorithms");
    assert_eq!(outline[0]["subtopics"][0]["title"], "Sorting");
    assert_eq!(outline[0]["subtopics"][0]["points"][0], "Merge sort");
    assert_eq!(outline[1]["title"], "Data Structures");

    let session = app.get("/session", Some(&cookie)).await.json();
    assert!(session["lesson_plan"]
        .as_str()
        .unwrap()
        .contains("Algorithms -> Sorting"));
}

#[tokio::test]
async fn lesson_plan_requires_a_syllabus_file() {
    let app = test_app();
    let cookie = app.login_cookie().await;

    let missing = app
        .send(multipart_request(
            "/lesson-plan",
            &cookie,
            &[Part::text("difficulty", "Btech")],
        ))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let blank = app.upload_syllabus(&cookie, "   \n").await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let not_text = app
        .send(multipart_request(
            "/lesson-plan",
            &cookie,
            &[Part::file("syllabus", "syllabus.bin", &[0xff, 0xfe, 0x00])],
        ))
        .await;
    assert_eq!(not_text.status, StatusCode::BAD_REQUEST);

    assert!(app.generator.calls().is_empty());
}

#[tokio::test]
async fn lesson_plan_rejects_bad_parameters() {
    let app = test_app();
    let cookie = app.login_cookie().await;

    for (field, value) in [
        ("difficulty", "Diploma"),
        ("temperature", "1.5"),
        ("max_tokens", "5000"),
        ("max_tokens", "lots"),
    ] {
        let response = app
            .send(multipart_request(
                "/lesson-plan",
                &cookie,
                &[
                    Part::file("syllabus", "syllabus.txt", b"Unit 1: Algorithms"),
                    Part::text(field, value),
                ],
            ))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}={}", field, value);
    }
    assert!(app.generator.calls().is_empty());
}

#[tokio::test]
async fn edited_lesson_plan_replaces_the_outline() {
    let app = test_app();
    let cookie = app.login_cookie().await;

    let saved = app
        .send(json_request(
            Method::PUT,
            "/lesson-plan",
            Some(&cookie),
            json!({ "text": "Recursion\nRecursion -> Base cases" }),
        ))
        .await;
    assert_eq!(saved.status, StatusCode::OK);
    let outline = saved.json()["outline"].clone();
    assert_eq!(outline[0]["title"], "Recursion");
    assert_eq!(outline[0]["subtopics"][0]["title"], "Base cases");

    let empty = app
        .send(json_request(
            Method::PUT,
            "/lesson-plan",
            Some(&cookie),
            json!({ "text": "  " }),
        ))
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lesson_plan_exports_as_docx() {
    let app = test_app();
    let cookie = app.login_cookie().await;

    let early = app.get("/lesson-plan/export", Some(&cookie)).await;
    assert_eq!(early.status, StatusCode::CONFLICT);

    app.generator.reply(OUTLINE);
    app.upload_syllabus(&cookie, "Unit 1: Algorithms").await;

    let export = app.get("/lesson-plan/export", Some(&cookie)).await;
    assert_eq!(export.status, StatusCode::OK);
    assert_eq!(
        export.headers[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
    assert!(export.headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("final_lesson_plan.docx"));
    assert!(export.body.starts_with(b"PK"));
}

//=========================================================================================
// Notes
//=========================================================================================

#[tokio::test]
async fn notes_follow_the_saved_outline() {
    let app = test_app();
    let cookie = app.login_cookie().await;
    app.generator.reply(OUTLINE);
    app.upload_syllabus(&cookie, "Unit 1: Algorithms").await;

    app.generator.reply("Merge sort splits the input in halves.");
    app.generator.reply("A diagram of merge sort.");
    app.generator.reply("Arrays, lists and trees.");
    app.generator.fail("image service down");

    let response = app
        .send(multipart_request(
            "/notes",
            &cookie,
            &[Part::text("difficulty", "Mtech")],
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let calls = app.generator.calls();
    let flows: Vec<FlowKind> = calls.iter().skip(1).map(|(flow, _)| *flow).collect();
    assert_eq!(
        flows,
        vec![
            FlowKind::Notes,
            FlowKind::ImagePrompt,
            FlowKind::Notes,
            FlowKind::ImagePrompt
        ]
    );
    assert!(calls[1].1.contains("sub-subtopic: 'Merge sort'"));
    assert!(calls[1].1.contains("Mtech level course"));
    assert!(calls[3].1.contains("the topic: 'Data Structures'"));

    let body = response.json();
    assert_eq!(body["difficulty"], "Mtech");
    let notes = body["notes"].as_str().unwrap();
    assert!(notes.starts_with("## Algorithms"));
    assert!(notes.contains("### Sorting"));
    assert!(notes.contains("#### Merge sort"));
    assert!(notes.contains("Merge sort splits the input in halves."));
    assert!(notes.contains("> **Image Prompt:** A diagram of merge sort."));
    assert!(notes.contains("## Data Structures"));
    assert_eq!(notes.matches("Image Prompt").count(), 1);
}

#[tokio::test]
async fn notes_for_an_explicit_topic_use_the_textbook() {
    let app = test_app();
    let cookie = app.login_cookie().await;

    let response = app
        .send(multipart_request(
            "/notes",
            &cookie,
            &[
                Part::file("textbook", "book.pdf", b"Recursion is a function calling itself."),
                Part::text("topic", "Recursion"),
                Part::text("include_image_prompts", "false"),
            ],
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let calls = app.generator.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].1.contains("the topic: 'Recursion'"));
    assert!(calls[0]
        .1
        .contains("Consider the following information:\nRecursion is a function calling itself."));

    let session = app.get("/session", Some(&cookie)).await.json();
    assert_eq!(session["has_textbook"], true);
    assert!(session["notes"].as_str().unwrap().contains("## Recursion"));
}

#[tokio::test]
async fn notes_need_a_lesson_plan_or_a_topic() {
    let app = test_app();
    let cookie = app.login_cookie().await;

    let response = app
        .send(multipart_request(
            "/notes",
            &cookie,
            &[Part::text("difficulty", "Btech")],
        ))
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert!(app.generator.calls().is_empty());

    let export = app.get("/notes/export", Some(&cookie)).await;
    assert_eq!(export.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn edited_notes_are_exported() {
    let app = test_app();
    let cookie = app.login_cookie().await;

    let saved = app
        .send(json_request(
            Method::PUT,
            "/notes",
            Some(&cookie),
            json!({ "text": "## Recursion\n\n- **Base case** stops the recursion" }),
        ))
        .await;
    assert_eq!(saved.status, StatusCode::OK);

    let export = app.get("/notes/export", Some(&cookie)).await;
    assert_eq!(export.status, StatusCode::OK);
    assert!(export.headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("detailed_notes.docx"));
    assert!(export.body.starts_with(b"PK"));
}

//=========================================================================================
// Q&A
//=========================================================================================

#[tokio::test]
async fn questions_are_answered_from_the_notes() {
    let app = test_app();
    let cookie = app.login_cookie().await;
    app.send(json_request(
        Method::PUT,
        "/notes",
        Some(&cookie),
        json!({ "text": "Recursion needs a base case." }),
    ))
    .await;

    app.generator.reply("Every recursion needs a base case.");
    let response = app
        .send(json_request(
            Method::POST,
            "/qa",
            Some(&cookie),
            json!({ "question": "What does recursion need?" }),
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["question"], "What does recursion need?");
    assert_eq!(body["answer"], "Every recursion needs a base case.");

    let prompt = app.generator.last_prompt();
    assert!(prompt.starts_with("Answer the following question based on the notes:"));
    assert!(prompt.contains("Notes:\nRecursion needs a base case.\n\nQuestion: What does recursion need?"));
}

#[tokio::test]
async fn questions_without_notes_still_reach_the_model() {
    let app = test_app();
    let cookie = app.login_cookie().await;

    let response = app
        .send(json_request(
            Method::POST,
            "/qa",
            Some(&cookie),
            json!({ "question": "What is recursion?", "max_tokens": 200 }),
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(app
        .generator
        .last_prompt()
        .contains("Notes:\n\n\nQuestion: What is recursion?"));

    let blank = app
        .send(json_request(
            Method::POST,
            "/qa",
            Some(&cookie),
            json!({ "question": "   " }),
        ))
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.generator.calls().len(), 1);
}

//=========================================================================================
// Failures
//=========================================================================================

#[tokio::test]
async fn generator_failure_leaves_the_session_usable() {
    let app = test_app();
    let cookie = app.login_cookie().await;

    app.generator.fail("invalid_api_key");
    let response = app.upload_syllabus(&cookie, "Unit 1: Algorithms").await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert!(response.text().contains("invalid_api_key"));

    let session = app.get("/session", Some(&cookie)).await;
    assert_eq!(session.status, StatusCode::OK);
    assert_eq!(session.json()["lesson_plan"], Value::Null);

    app.generator.reply(OUTLINE);
    let retry = app.upload_syllabus(&cookie, "Unit 1: Algorithms").await;
    assert_eq!(retry.status, StatusCode::OK);
}

#[tokio::test]
async fn failed_notes_section_keeps_previous_notes() {
    let app = test_app();
    let cookie = app.login_cookie().await;
    app.send(json_request(
        Method::PUT,
        "/notes",
        Some(&cookie),
        json!({ "text": "Earlier notes." }),
    ))
    .await;

    app.generator.fail("upstream timeout");
    let response = app
        .send(multipart_request(
            "/notes",
            &cookie,
            &[Part::text("topic", "Recursion")],
        ))
        .await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);

    let session = app.get("/session", Some(&cookie)).await.json();
    assert_eq!(session["notes"], "Earlier notes.");
}

#[tokio::test]
async fn rate_limited_generation_is_a_503() {
    let app = test_app();
    let cookie = app.login_cookie().await;

    app.generator
        .fail_with(PortError::RateLimited("Rate limit reached for gpt-4o-mini".to_string()));
    let response = app.upload_syllabus(&cookie, "Unit 1: Algorithms").await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.text().contains("Rate limit reached"));

    let session = app.get("/session", Some(&cookie)).await.json();
    assert_eq!(session["lesson_plan"], Value::Null);
}

#[tokio::test]
async fn extractor_panic_is_a_bad_request() {
    let app = test_app_with(
        Arc::new(ScriptedGenerator::default()),
        Arc::new(PanickingExtractor),
    );
    let cookie = app.login_cookie().await;

    let response = app
        .send(multipart_request(
            "/notes",
            &cookie,
            &[
                Part::file("textbook", "book.pdf", b"%PDF-1.4 broken"),
                Part::text("topic", "Recursion"),
            ],
        ))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), "Failed to extract text from PDF");

    // The server keeps answering on the same session.
    let session = app.get("/session", Some(&cookie)).await;
    assert_eq!(session.status, StatusCode::OK);
    assert_eq!(session.json()["has_textbook"], false);
}

#[tokio::test]
async fn uploaded_textbook_survives_a_failed_generation() {
    let app = test_app();
    let cookie = app.login_cookie().await;

    app.generator.fail("upstream timeout");
    let response = app
        .send(multipart_request(
            "/notes",
            &cookie,
            &[
                Part::file("textbook", "book.pdf", b"Chapter 4: Recursion and the call stack."),
                Part::text("topic", "Recursion"),
            ],
        ))
        .await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);

    let session = app.get("/session", Some(&cookie)).await.json();
    assert_eq!(session["has_textbook"], true);

    // A retry without re-uploading still grounds the prompt in the textbook.
    let retry = app
        .send(multipart_request(
            "/notes",
            &cookie,
            &[
                Part::text("topic", "Recursion"),
                Part::text("include_image_prompts", "false"),
            ],
        ))
        .await;
    assert_eq!(retry.status, StatusCode::OK);
    assert!(app.generator.last_prompt().contains("call stack"));
}

//=========================================================================================
// Concurrent Requests
//=========================================================================================

#[tokio::test]
async fn lesson_plan_edit_during_notes_generation_is_kept() {
    let generator = Arc::new(GatedGenerator::default());
    let app = test_app_with(generator.clone(), Arc::new(PlainTextExtractor));
    let cookie = app.login_cookie().await;

    let notes_request = multipart_request(
        "/notes",
        &cookie,
        &[
            Part::text("topic", "Recursion"),
            Part::text("difficulty", "Mtech"),
            Part::text("include_image_prompts", "false"),
        ],
    );
    let router = app.router.clone();
    let notes = tokio::spawn(async move { router.oneshot(notes_request).await.unwrap() });

    // The notes request now holds its session snapshot and waits on the generator.
    generator.entered.notified().await;
    let edit = app
        .send(json_request(
            Method::PUT,
            "/lesson-plan",
            Some(&cookie),
            json!({ "text": OUTLINE }),
        ))
        .await;
    assert_eq!(edit.status, StatusCode::OK);

    generator.gate.notify_one();
    let notes = notes.await.unwrap();
    assert_eq!(notes.status(), StatusCode::OK);

    let session = app.get("/session", Some(&cookie)).await.json();
    assert_eq!(session["lesson_plan"], OUTLINE);
    assert!(session["notes"].as_str().unwrap().contains("Recursion notes."));
    assert_eq!(session["difficulty"], "Mtech");
}
