//! crates/debugmate_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{
    CompletedSession, DebugReport, GeneratedQuestions, Language, SessionSummary, User,
    UserIdentity, WeakSpot,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    /// Returns the user for an identity-provider id, creating a free-plan record on first use.
    async fn get_or_create_user(&self, external_id: &str) -> PortResult<User>;

    // --- Completed Sessions ---
    /// Stores a completed session, increments the owner's usage counter and
    /// bumps the matching weak spot, all in one transaction.
    async fn save_completed_session(&self, session: &CompletedSession) -> PortResult<()>;

    /// Returns one page of summaries (newest first) and the total count.
    async fn list_sessions(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> PortResult<(Vec<SessionSummary>, i64)>;

    async fn get_session_for_user(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> PortResult<CompletedSession>;

    async fn delete_session_for_user(&self, session_id: Uuid, user_id: Uuid) -> PortResult<()>;

    // --- Weak Spots ---
    async fn list_weak_spots(&self, user_id: Uuid) -> PortResult<Vec<WeakSpot>>;
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Turns the credential presented with a request into a verified identity.
    async fn verify(&self, credential: &str) -> PortResult<UserIdentity>;
}

/// Short-lived key/value storage shared by every request handler.
///
/// `get` on an absent or expired key yields `Ok(None)`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> PortResult<()>;

    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    async fn delete(&self, key: &str) -> PortResult<()>;

    /// Atomically removes the key and returns its prior value.
    /// Of several concurrent callers, at most one observes `Some`.
    async fn take(&self, key: &str) -> PortResult<Option<String>>;
}

/// A single request to a text-completion model.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Sends one request to the model and returns its raw text output.
    async fn complete(&self, request: &CompletionRequest) -> PortResult<String>;
}

#[async_trait]
pub trait DebugAssistantService: Send + Sync {
    /// Produces exactly three clarifying questions and an error category.
    async fn generate_clarifying_questions(
        &self,
        language: Language,
        error_message: &str,
        code: &str,
    ) -> PortResult<GeneratedQuestions>;

    /// Produces the final report from the original input plus formatted answers.
    async fn generate_debug_report(
        &self,
        language: Language,
        error_message: &str,
        code: &str,
        answers_formatted: &str,
    ) -> PortResult<DebugReport>;
}
