//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    auth::{AuthResponse, LoginRequest},
    lesson_plan_task::generate_lesson_plan,
    notes_task::{generate_notes, NotesOptions},
    qa_task::answer_question,
    state::{AppState, AuthContext},
    upload::UploadForm,
};
use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use coursegen_core::{
    domain::{Difficulty, FlowKind, GenerationParams, Session},
    outline::LessonPlanOutline,
    ports::PortError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        session_handler,
        generate_lesson_plan_handler,
        save_lesson_plan_handler,
        export_lesson_plan_handler,
        generate_notes_handler,
        save_notes_handler,
        export_notes_handler,
        ask_question_handler,
    ),
    components(
        schemas(
            LoginRequest,
            AuthResponse,
            SessionResponse,
            LessonPlanResponse,
            OutlineTopic,
            OutlineSubtopic,
            NotesResponse,
            EditTextRequest,
            AskRequest,
            AnswerResponse,
        )
    ),
    tags(
        (name = "Course Generator API", description = "Lesson plan, notes and Q&A generation for educators.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    session_id: Uuid,
    username: String,
    name: String,
    difficulty: String,
    lesson_plan: Option<String>,
    notes: Option<String>,
    has_textbook: bool,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct OutlineSubtopic {
    title: String,
    points: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct OutlineTopic {
    title: String,
    subtopics: Vec<OutlineSubtopic>,
}

#[derive(Serialize, ToSchema)]
pub struct LessonPlanResponse {
    lesson_plan: String,
    difficulty: String,
    outline: Vec<OutlineTopic>,
}

#[derive(Serialize, ToSchema)]
pub struct NotesResponse {
    notes: String,
    difficulty: String,
}

#[derive(Deserialize, ToSchema)]
pub struct EditTextRequest {
    pub text: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AskRequest {
    pub question: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct AnswerResponse {
    question: String,
    answer: String,
}

fn outline_view(outline: Option<&LessonPlanOutline>) -> Vec<OutlineTopic> {
    outline
        .map(|o| {
            o.topics
                .iter()
                .map(|t| OutlineTopic {
                    title: t.title.clone(),
                    subtopics: t
                        .subtopics
                        .iter()
                        .map(|s| OutlineSubtopic {
                            title: s.title.clone(),
                            points: s.points.clone(),
                        })
                        .collect(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn lesson_plan_response(session: &Session) -> LessonPlanResponse {
    LessonPlanResponse {
        lesson_plan: session.lesson_plan_text.clone().unwrap_or_default(),
        difficulty: session.difficulty.to_string(),
        outline: outline_view(session.lesson_plan_outline.as_ref()),
    }
}

//=========================================================================================
// Shared Helpers
//=========================================================================================

/// Maps a port error to the status code and message returned to the client.
pub fn port_error_response(e: PortError) -> (StatusCode, String) {
    let status = match &e {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PortError::FailedPrecondition(_) => StatusCode::CONFLICT,
        PortError::Upstream(_) => StatusCode::BAD_GATEWAY,
        PortError::RateLimited(_) => StatusCode::SERVICE_UNAVAILABLE,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Request failed: {}", e);
    }
    (status, e.to_string())
}

fn session_error(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(_) => (StatusCode::UNAUTHORIZED, "Session has ended".to_string()),
        other => port_error_response(other),
    }
}

/// A snapshot of the caller's session, for reading only.
async fn load_session(
    app_state: &AppState,
    ctx: &AuthContext,
) -> Result<Session, (StatusCode, String)> {
    app_state
        .sessions
        .get_session(ctx.session_id)
        .await
        .map_err(session_error)
}

/// Writes the fields `apply` sets into the stored session and returns the result.
/// Edits made by other requests since any earlier snapshot are kept.
async fn update_session<F>(
    app_state: &AppState,
    ctx: &AuthContext,
    apply: F,
) -> Result<Session, (StatusCode, String)>
where
    F: FnOnce(&mut Session) + Send + 'static,
{
    app_state
        .sessions
        .update_session(ctx.session_id, Box::new(apply))
        .await
        .map_err(session_error)
}

fn parse_difficulty(raw: Option<&str>, fallback: Difficulty) -> Result<Difficulty, (StatusCode, String)> {
    raw.map(str::parse::<Difficulty>)
        .transpose()
        .map(|d| d.unwrap_or(fallback))
        .map_err(port_error_response)
}

fn export_response(
    app_state: &AppState,
    title: &str,
    file_stem: &str,
    text: Option<&str>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let text = text.filter(|t| !t.trim().is_empty()).ok_or_else(|| {
        (
            StatusCode::CONFLICT,
            format!("Nothing to export yet: generate the {} first", title.to_lowercase()),
        )
    })?;

    let bytes = app_state
        .exporter
        .export(title, text)
        .map_err(port_error_response)?;
    let file_name = format!("{}.{}", file_stem, app_state.exporter.extension());
    info!("Exported '{}' ({} bytes)", file_name, bytes.len());

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, app_state.exporter.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    ))
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is running"))
)]
pub async fn health_handler() -> &'static str {
    "ok"
}

/// Returns the current session: who is logged in and what has been generated so far.
#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "Current session", body = SessionResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn session_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = load_session(&app_state, &ctx).await?;
    Ok(Json(SessionResponse {
        session_id: session.id,
        username: session.username,
        name: session.display_name,
        difficulty: session.difficulty.to_string(),
        lesson_plan: session.lesson_plan_text,
        notes: session.notes_text,
        has_textbook: session.textbook_text.is_some(),
        created_at: session.created_at,
        expires_at: session.expires_at,
    }))
}

/// Generate a lesson plan from an uploaded syllabus.
///
/// Multipart fields: `syllabus` (text file, required), `difficulty`
/// (Btech, Mtech or PHD), `temperature`, `max_tokens`.
#[utoipa::path(
    post,
    path = "/lesson-plan",
    request_body(content_type = "multipart/form-data", description = "The syllabus and generation settings."),
    responses(
        (status = 200, description = "Lesson plan generated", body = LessonPlanResponse),
        (status = 400, description = "Missing or malformed syllabus, or invalid parameter"),
        (status = 401, description = "Not logged in"),
        (status = 502, description = "Generation service failed")
    )
)]
pub async fn generate_lesson_plan_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut form = UploadForm::read(multipart).await?;
    let session = load_session(&app_state, &ctx).await?;

    let syllabus = form
        .take_file("syllabus")
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                "Please upload a syllabus file to generate a lesson plan".to_string(),
            )
        })?
        .into_text()?;
    let difficulty = parse_difficulty(form.text("difficulty"), session.difficulty)?;
    let params = GenerationParams::resolve(
        FlowKind::LessonPlan,
        form.parse("temperature")?,
        form.parse("max_tokens")?,
    )
    .map_err(port_error_response)?;

    let lesson_plan = generate_lesson_plan(&app_state, &session, &syllabus, difficulty, params)
        .await
        .map_err(port_error_response)?;

    let updated = update_session(&app_state, &ctx, move |s: &mut Session| {
        s.difficulty = difficulty;
        s.set_lesson_plan(lesson_plan);
    })
    .await?;
    Ok(Json(lesson_plan_response(&updated)))
}

/// Save an edited lesson plan. The outline used for notes is re-parsed from it.
#[utoipa::path(
    put,
    path = "/lesson-plan",
    request_body = EditTextRequest,
    responses(
        (status = 200, description = "Lesson plan saved", body = LessonPlanResponse),
        (status = 400, description = "Empty lesson plan"),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn save_lesson_plan_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<EditTextRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.text.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Lesson plan must not be empty".to_string()));
    }
    let text = req.text;
    let updated = update_session(&app_state, &ctx, move |s: &mut Session| s.set_lesson_plan(text)).await?;

    let response = lesson_plan_response(&updated);
    if response.outline.is_empty() {
        warn!("Saved lesson plan for session {} has no parsable outline", updated.id);
    }
    Ok(Json(response))
}

/// Download the current lesson plan as a Word document.
#[utoipa::path(
    get,
    path = "/lesson-plan/export",
    responses(
        (status = 200, description = "DOCX attachment", body = Vec<u8>, content_type = "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        (status = 401, description = "Not logged in"),
        (status = 409, description = "No lesson plan yet")
    )
)]
pub async fn export_lesson_plan_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = load_session(&app_state, &ctx).await?;
    export_response(
        &app_state,
        "Lesson Plan",
        "final_lesson_plan",
        session.lesson_plan_text.as_deref(),
    )
}

/// Generate detailed notes.
///
/// Multipart fields: `textbook` (PDF, optional, kept for later requests),
/// `topic` (optional; without it every section of the saved lesson plan is
/// generated), `difficulty`, `temperature`, `max_tokens`,
/// `include_image_prompts` (default true).
#[utoipa::path(
    post,
    path = "/notes",
    request_body(content_type = "multipart/form-data", description = "Optional textbook and generation settings."),
    responses(
        (status = 200, description = "Notes generated", body = NotesResponse),
        (status = 400, description = "Unreadable textbook or invalid parameter"),
        (status = 401, description = "Not logged in"),
        (status = 409, description = "No lesson plan and no topic"),
        (status = 502, description = "Generation service failed")
    )
)]
pub async fn generate_notes_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut form = UploadForm::read(multipart).await?;
    let mut session = load_session(&app_state, &ctx).await?;

    let difficulty = parse_difficulty(form.text("difficulty"), session.difficulty)?;
    let params = GenerationParams::resolve(
        FlowKind::Notes,
        form.parse("temperature")?,
        form.parse("max_tokens")?,
    )
    .map_err(port_error_response)?;
    let include_image_prompts = form.parse::<bool>("include_image_prompts")?.unwrap_or(true);
    let topic = form.text("topic").map(str::to_string);

    if let Some(textbook) = form.take_file("textbook") {
        let extractor = app_state.extractor.clone();
        let data = textbook.data;
        let text = tokio::task::spawn_blocking(move || extractor.extract_text(&data))
            .await
            .map_err(|e| {
                error!("Textbook extraction task failed: {:?}", e);
                (
                    StatusCode::BAD_REQUEST,
                    "Failed to extract text from PDF".to_string(),
                )
            })?
            .map_err(port_error_response)?;

        let textbook_text = if text.trim().is_empty() {
            warn!("Textbook for session {} contained no extractable text", session.id);
            None
        } else {
            info!("Textbook extracted for session {} ({} chars)", session.id, text.len());
            Some(text)
        };
        // Stored before generating so a failed generation keeps the upload.
        session = update_session(&app_state, &ctx, move |s: &mut Session| {
            s.textbook_text = textbook_text;
        })
        .await?;
    }

    let options = NotesOptions {
        topic,
        difficulty,
        params,
        include_image_prompts,
    };
    let notes = generate_notes(&app_state, &session, &options)
        .await
        .map_err(port_error_response)?;

    let stored = notes.clone();
    update_session(&app_state, &ctx, move |s: &mut Session| {
        s.difficulty = difficulty;
        s.notes_text = Some(stored);
    })
    .await?;
    Ok(Json(NotesResponse {
        notes,
        difficulty: difficulty.to_string(),
    }))
}

/// Save edited notes. Later questions are answered against the saved text.
#[utoipa::path(
    put,
    path = "/notes",
    request_body = EditTextRequest,
    responses(
        (status = 200, description = "Notes saved", body = NotesResponse),
        (status = 400, description = "Empty notes"),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn save_notes_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<EditTextRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.text.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Notes must not be empty".to_string()));
    }
    let stored = req.text.clone();
    let updated = update_session(&app_state, &ctx, move |s: &mut Session| {
        s.notes_text = Some(stored);
    })
    .await?;
    Ok(Json(NotesResponse {
        notes: req.text,
        difficulty: updated.difficulty.to_string(),
    }))
}

/// Download the current notes as a Word document.
#[utoipa::path(
    get,
    path = "/notes/export",
    responses(
        (status = 200, description = "DOCX attachment", body = Vec<u8>, content_type = "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        (status = 401, description = "Not logged in"),
        (status = 409, description = "No notes yet")
    )
)]
pub async fn export_notes_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = load_session(&app_state, &ctx).await?;
    export_response(
        &app_state,
        "Detailed Course Notes",
        "detailed_notes",
        session.notes_text.as_deref(),
    )
}

/// Ask a question about the current notes.
#[utoipa::path(
    post,
    path = "/qa",
    request_body = AskRequest,
    responses(
        (status = 200, description = "Answer generated", body = AnswerResponse),
        (status = 400, description = "Empty question or invalid parameter"),
        (status = 401, description = "Not logged in"),
        (status = 502, description = "Generation service failed")
    )
)]
pub async fn ask_question_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<AskRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = load_session(&app_state, &ctx).await?;
    let params = GenerationParams::resolve(FlowKind::QuestionAnswer, req.temperature, req.max_tokens)
        .map_err(port_error_response)?;

    let answer = answer_question(&app_state, &session, &req.question, params)
        .await
        .map_err(port_error_response)?;

    Ok(Json(AnswerResponse {
        question: req.question,
        answer,
    }))
}
