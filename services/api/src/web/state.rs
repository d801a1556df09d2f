//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use debugmate_core::ports::{DatabaseService, DebugAssistantService, IdentityService, SessionStore};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub identity: Arc<dyn IdentityService>,
    /// Holds drafts between the start and complete phases.
    pub sessions: Arc<dyn SessionStore>,
    pub assistant: Arc<dyn DebugAssistantService>,
}
