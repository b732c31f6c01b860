//! services/api/src/web/qa_task.rs
//!
//! Answers a single question against the notes held in the session.
//! Each question is independent; nothing from earlier answers is carried over.

use coursegen_core::{
    domain::{FlowKind, GenerationParams, GenerationRequest, Session},
    ports::PortResult,
    prompts,
};
use std::time::Instant;
use tracing::info;

use crate::web::state::AppState;

pub async fn answer_question(
    app_state: &AppState,
    session: &Session,
    question: &str,
    params: GenerationParams,
) -> PortResult<String> {
    let notes = session.notes_text.as_deref().unwrap_or_default();
    let prompt = prompts::qa_prompt(notes, question)?;
    let request = GenerationRequest::new(FlowKind::QuestionAnswer, prompt, params);

    let started = Instant::now();
    let answer = app_state.generator.generate(&request).await?;
    info!(
        "Answered question for session {} in {:?} (notes context: {} chars)",
        session.id,
        started.elapsed(),
        notes.len()
    );
    Ok(answer)
}
