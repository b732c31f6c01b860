//! crates/coursegen_core/src/prompts.rs
//!
//! Prompt templates for every generation flow. All builders are pure and
//! deterministic. User text is substituted verbatim, without escaping.

use crate::domain::Difficulty;
use crate::outline::SectionRef;
use crate::ports::{PortError, PortResult};

const LESSON_PLAN_TEMPLATE: &str = r#"Generate a detailed lesson plan based on the following syllabus and difficulty level:
Syllabus: {syllabus}
Difficulty Level: {difficulty}

The lesson plan should be structured in a hierarchical format, using "->" to denote different levels. For example:
Topic 1
Topic 1 -> Subtopic 1
Topic 1 -> Subtopic 1 -> Sub-subtopic 1
Topic 2
Topic 2 -> Subtopic 1

Ensure the plan is comprehensive and covers all aspects of the syllabus at the specified difficulty level."#;

const SECTION_TEMPLATE: &str = "Generate detailed content for a slide on {focus} for a {difficulty} level course.\n\
Include relevant explanations, examples, and details suitable for comprehensive understanding.";

const TEXTBOOK_CONTEXT_TEMPLATE: &str = "\nConsider the following information:\n{textbook}";

const IMAGE_PROMPT_TEMPLATE: &str =
    "Generate a descriptive prompt for an image representing {focus}.";

const QA_TEMPLATE: &str = "Answer the following question based on the notes:\n\nNotes:\n{notes}\n\nQuestion: {question}";

fn require_text(field: &str, value: &str) -> PortResult<()> {
    if value.trim().is_empty() {
        return Err(PortError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn describe_focus(section: &SectionRef) -> String {
    let mut focus = format!("the topic: '{}'", section.topic);
    if let Some(subtopic) = &section.subtopic {
        focus.push_str(&format!(", subtopic: '{}'", subtopic));
    }
    if let Some(point) = &section.point {
        focus.push_str(&format!(", sub-subtopic: '{}'", point));
    }
    focus
}

/// Builds the lesson plan prompt for a syllabus at the given difficulty.
pub fn lesson_plan_prompt(syllabus: &str, difficulty: Difficulty) -> PortResult<String> {
    require_text("syllabus", syllabus)?;
    Ok(LESSON_PLAN_TEMPLATE
        .replace("{syllabus}", syllabus)
        .replace("{difficulty}", difficulty.label()))
}

/// Builds the notes prompt for one section, optionally grounded in textbook text.
pub fn section_prompt(
    section: &SectionRef,
    difficulty: Difficulty,
    textbook: Option<&str>,
) -> PortResult<String> {
    require_text("topic", &section.topic)?;
    let mut prompt = SECTION_TEMPLATE
        .replace("{focus}", &describe_focus(section))
        .replace("{difficulty}", difficulty.label());

    if let Some(textbook) = textbook.filter(|t| !t.trim().is_empty()) {
        prompt.push_str(&TEXTBOOK_CONTEXT_TEMPLATE.replace("{textbook}", textbook));
    }
    Ok(prompt)
}

pub fn image_prompt(section: &SectionRef) -> String {
    IMAGE_PROMPT_TEMPLATE.replace("{focus}", &describe_focus(section))
}

/// Builds the Q&A prompt. Empty notes are allowed; an empty question is not.
pub fn qa_prompt(notes: &str, question: &str) -> PortResult<String> {
    require_text("question", question)?;
    Ok(QA_TEMPLATE
        .replace("{notes}", notes)
        .replace("{question}", question))
}
