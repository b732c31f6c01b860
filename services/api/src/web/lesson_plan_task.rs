//! services/api/src/web/lesson_plan_task.rs
//!
//! Turns a syllabus into a lesson plan. The caller stores the result.

use coursegen_core::{
    domain::{Difficulty, FlowKind, GenerationParams, GenerationRequest, Session},
    ports::PortResult,
    prompts,
};
use std::time::Instant;
use tracing::info;

use crate::web::state::AppState;

pub async fn generate_lesson_plan(
    app_state: &AppState,
    session: &Session,
    syllabus: &str,
    difficulty: Difficulty,
    params: GenerationParams,
) -> PortResult<String> {
    let prompt = prompts::lesson_plan_prompt(syllabus, difficulty)?;
    let request = GenerationRequest::new(FlowKind::LessonPlan, prompt, params);

    let started = Instant::now();
    let lesson_plan = app_state.generator.generate(&request).await?;
    info!(
        "{} lesson plan generated for session {} in {:?} ({} chars)",
        difficulty,
        session.id,
        started.elapsed(),
        lesson_plan.len()
    );
    Ok(lesson_plan)
}
