pub mod domain;
pub mod markup;
pub mod outline;
pub mod ports;
pub mod prompts;

pub use domain::{
    Difficulty, FlowKind, GenerationParams, GenerationRequest, LoginOutcome,
    Session, UserCredentials,
};
pub use outline::{LessonPlanOutline, SectionRef};
pub use ports::{
    CredentialStore, DocumentExportService, PortError, PortResult, SessionStore, SessionUpdate,
    TextExtractionService, TextGenerationService,
};
