//! services/api/src/web/notes_task.rs
//!
//! Generates course notes, either for one explicit topic or section by section
//! over the saved lesson plan outline. Sections are generated one after another.
//! The session is only read here; the caller stores the finished notes.

use coursegen_core::{
    domain::{Difficulty, FlowKind, GenerationParams, GenerationRequest, Session},
    outline::SectionRef,
    ports::{PortError, PortResult},
    prompts,
};
use std::time::Instant;
use tracing::{info, warn};

use crate::web::state::AppState;

pub struct NotesOptions {
    pub topic: Option<String>,
    pub difficulty: Difficulty,
    pub params: GenerationParams,
    pub include_image_prompts: bool,
}

fn plan_sections(session: &Session, topic: Option<&str>) -> PortResult<Vec<SectionRef>> {
    if let Some(topic) = topic.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(vec![SectionRef::topic_only(topic)]);
    }

    let sections = session
        .lesson_plan_outline
        .as_ref()
        .map(|outline| outline.sections())
        .unwrap_or_default();
    if sections.is_empty() {
        return Err(PortError::FailedPrecondition(
            "generate and save a lesson plan first, or name a topic".to_string(),
        ));
    }
    Ok(sections)
}

/// Appends the headings that open `section`, skipping those already open.
fn push_headings(notes: &mut String, section: &SectionRef, previous: Option<&SectionRef>) {
    let same_topic = previous.is_some_and(|p| p.topic == section.topic);
    if !same_topic {
        notes.push_str(&format!("\n## {}\n", section.topic));
    }
    if let Some(subtopic) = &section.subtopic {
        let same_subtopic = same_topic && previous.is_some_and(|p| p.subtopic == section.subtopic);
        if !same_subtopic {
            notes.push_str(&format!("\n### {}\n", subtopic));
        }
    }
    if let Some(point) = &section.point {
        notes.push_str(&format!("\n#### {}\n", point));
    }
}

pub async fn generate_notes(
    app_state: &AppState,
    session: &Session,
    options: &NotesOptions,
) -> PortResult<String> {
    let sections = plan_sections(session, options.topic.as_deref())?;
    let textbook = session.textbook_text.as_deref();
    let started = Instant::now();
    info!(
        "Generating notes for session {}: {} sections, textbook: {}",
        session.id,
        sections.len(),
        textbook.is_some()
    );

    let mut notes = String::new();
    let mut previous: Option<&SectionRef> = None;
    for (i, section) in sections.iter().enumerate() {
        push_headings(&mut notes, section, previous);
        previous = Some(section);

        let prompt = prompts::section_prompt(section, options.difficulty, textbook)?;
        let request = GenerationRequest::new(FlowKind::Notes, prompt, options.params);
        let content = app_state.generator.generate(&request).await.map_err(|e| {
            warn!("Notes section {} ('{}') failed: {}", i + 1, section.heading(), e);
            e
        })?;
        notes.push('\n');
        notes.push_str(&content);
        notes.push('\n');

        if options.include_image_prompts {
            let request = GenerationRequest::new(
                FlowKind::ImagePrompt,
                prompts::image_prompt(section),
                GenerationParams::defaults(FlowKind::ImagePrompt),
            );
            match app_state.generator.generate(&request).await {
                Ok(image_prompt) if !image_prompt.is_empty() => {
                    notes.push_str(&format!("\n> **Image Prompt:** {}\n", image_prompt));
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping image prompt for '{}': {}", section.heading(), e),
            }
        }
    }

    let notes = notes.trim().to_string();
    info!(
        "Notes generated for session {} in {:?} ({} chars)",
        session.id,
        started.elapsed(),
        notes.len()
    );
    Ok(notes)
}
