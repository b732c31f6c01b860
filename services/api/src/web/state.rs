//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-request auth context.

use crate::config::{Config, CookieConfig};
use coursegen_core::ports::{
    CredentialStore, DocumentExportService, SessionStore, TextExtractionService,
    TextGenerationService,
};
use std::sync::Arc;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cookie: CookieConfig,
    pub credentials: Arc<dyn CredentialStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub generator: Arc<dyn TextGenerationService>,
    pub exporter: Arc<dyn DocumentExportService>,
    pub extractor: Arc<dyn TextExtractionService>,
}

//=========================================================================================
// AuthContext (Specific to One Request)
//=========================================================================================

/// Inserted into request extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub session_id: Uuid,
    pub username: String,
}
