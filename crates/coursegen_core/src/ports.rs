//! crates/coursegen_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like APIs or file formats.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{GenerationRequest, Session, UserCredentials};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., network, parsers).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Missing prerequisite: {0}")]
    FailedPrecondition(String),
    #[error("Upstream service rejected the request: {0}")]
    Upstream(String),
    #[error("Upstream service is rate limiting requests: {0}")]
    RateLimited(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A change to some fields of a stored session.
pub type SessionUpdate = Box<dyn FnOnce(&mut Session) + Send>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait TextGenerationService: Send + Sync {
    /// Sends one prompt and returns the single completion text.
    async fn generate(&self, request: &GenerationRequest) -> PortResult<String>;
}

pub trait CredentialStore: Send + Sync {
    /// Looks up the stored credentials for a username.
    fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: Session) -> PortResult<()>;

    /// Returns the session, or `NotFound` when it is unknown or expired.
    async fn get_session(&self, session_id: Uuid) -> PortResult<Session>;

    /// Applies `apply` to the stored session under the store's write lock and
    /// returns the result. Fields `apply` does not touch keep their stored values.
    async fn update_session(&self, session_id: Uuid, apply: SessionUpdate) -> PortResult<Session>;

    async fn delete_session(&self, session_id: Uuid) -> PortResult<()>;
}

pub trait DocumentExportService: Send + Sync {
    /// Renders a titled text blob into document bytes.
    fn export(&self, title: &str, body: &str) -> PortResult<Vec<u8>>;

    /// MIME type of the produced bytes.
    fn content_type(&self) -> &'static str;

    /// File extension of the produced bytes, without the dot.
    fn extension(&self) -> &'static str;
}

pub trait TextExtractionService: Send + Sync {
    /// Extracts plain text from an uploaded document.
    fn extract_text(&self, data: &[u8]) -> PortResult<String>;
}
