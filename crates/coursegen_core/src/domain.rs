//! crates/coursegen_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any transport or serialization backend;
//! `Difficulty` crosses the wire only through its `Display`/`FromStr` labels.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::outline::LessonPlanOutline;
use crate::ports::{PortError, PortResult};

//=========================================================================================
// Difficulty
//=========================================================================================

/// The audience level a lesson plan or set of notes is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Difficulty {
    #[default]
    Btech,
    Mtech,
    Phd,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Btech, Difficulty::Mtech, Difficulty::Phd];

    /// The label embedded into prompts and shown to users.
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Btech => "Btech",
            Difficulty::Mtech => "Mtech",
            Difficulty::Phd => "PHD",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Difficulty {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                PortError::InvalidInput(format!(
                    "Unknown difficulty '{}', expected one of Btech, Mtech, PHD",
                    s
                ))
            })
    }
}

//=========================================================================================
// Generation
//=========================================================================================

/// The kind of generation call being made. Each flow has its own parameter bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    LessonPlan,
    Notes,
    QuestionAnswer,
    ImagePrompt,
}

/// Default and allowed values for the sampling parameters of one flow.
#[derive(Debug, Clone, Copy)]
pub struct ParamBounds {
    pub default_temperature: f32,
    pub default_max_tokens: u32,
    pub min_max_tokens: u32,
    pub max_max_tokens: u32,
}

impl FlowKind {
    pub fn bounds(&self) -> ParamBounds {
        match self {
            FlowKind::LessonPlan => ParamBounds {
                default_temperature: 0.7,
                default_max_tokens: 1000,
                min_max_tokens: 500,
                max_max_tokens: 2000,
            },
            FlowKind::Notes => ParamBounds {
                default_temperature: 0.8,
                default_max_tokens: 1500,
                min_max_tokens: 500,
                max_max_tokens: 2500,
            },
            FlowKind::QuestionAnswer => ParamBounds {
                default_temperature: 0.7,
                default_max_tokens: 500,
                min_max_tokens: 100,
                max_max_tokens: 1000,
            },
            FlowKind::ImagePrompt => ParamBounds {
                default_temperature: 0.7,
                default_max_tokens: 100,
                min_max_tokens: 100,
                max_max_tokens: 100,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FlowKind::LessonPlan => "lesson_plan",
            FlowKind::Notes => "notes",
            FlowKind::QuestionAnswer => "qa",
            FlowKind::ImagePrompt => "image_prompt",
        }
    }
}

/// Sampling parameters for a single generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationParams {
    /// Fills in the flow defaults and rejects values outside the flow's bounds.
    pub fn resolve(
        flow: FlowKind,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> PortResult<Self> {
        let bounds = flow.bounds();
        let temperature = temperature.unwrap_or(bounds.default_temperature);
        let max_tokens = max_tokens.unwrap_or(bounds.default_max_tokens);

        if !(0.0..=1.0).contains(&temperature) {
            return Err(PortError::InvalidInput(format!(
                "temperature must be between 0.0 and 1.0, got {}",
                temperature
            )));
        }
        if max_tokens < bounds.min_max_tokens || max_tokens > bounds.max_max_tokens {
            return Err(PortError::InvalidInput(format!(
                "max_tokens for {} must be between {} and {}, got {}",
                flow.name(),
                bounds.min_max_tokens,
                bounds.max_max_tokens,
                max_tokens
            )));
        }

        Ok(Self {
            temperature,
            max_tokens,
        })
    }

    pub fn defaults(flow: FlowKind) -> Self {
        let bounds = flow.bounds();
        Self {
            temperature: bounds.default_temperature,
            max_tokens: bounds.default_max_tokens,
        }
    }
}

/// A single prompt bound for the generation service. Immutable once built.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    flow: FlowKind,
    prompt: String,
    params: GenerationParams,
}

impl GenerationRequest {
    pub fn new(flow: FlowKind, prompt: String, params: GenerationParams) -> Self {
        Self {
            flow,
            prompt,
            params,
        }
    }

    pub fn flow(&self) -> FlowKind {
        self.flow
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn params(&self) -> GenerationParams {
        self.params
    }
}

//=========================================================================================
// Users and Sessions
//=========================================================================================

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub username: String,
    pub display_name: String,
    pub hashed_password: String,
}

/// The result of checking a submitted login form against the stored credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated { username: String, display_name: String },
    Unauthenticated,
    UnknownUser,
}

/// The per-login workspace. Holds everything the three flows read and write.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub difficulty: Difficulty,
    pub lesson_plan_text: Option<String>,
    pub lesson_plan_outline: Option<LessonPlanOutline>,
    pub notes_text: Option<String>,
    pub textbook_text: Option<String>,
}

impl Session {
    pub fn new(username: &str, display_name: &str, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            display_name: display_name.to_string(),
            created_at: now,
            expires_at: now + ttl,
            difficulty: Difficulty::default(),
            lesson_plan_text: None,
            lesson_plan_outline: None,
            notes_text: None,
            textbook_text: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Stores a (possibly user-edited) lesson plan and re-derives its outline.
    pub fn set_lesson_plan(&mut self, text: String) {
        self.lesson_plan_outline = Some(LessonPlanOutline::parse(&text));
        self.lesson_plan_text = Some(text);
    }
}
