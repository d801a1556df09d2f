//! services/api/src/web/protocol.rs
//!
//! Defines the JSON request/response bodies of the two-phase debug protocol
//! and the history endpoints. Field names are camelCase on the wire; the web
//! client depends on them.

use debugmate_core::domain::{ClarifyingQuestion, DebugReport, QuestionAnswer, SessionSummary};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Phase 1: Start
//=========================================================================================

/// Body of `POST /debug/start`. Missing fields deserialize as empty strings so
/// that validation can name the offending field.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartDebugRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartDebugResponse {
    pub session_id: Uuid,
    pub questions: Vec<ClarifyingQuestion>,
    pub error_category: String,
}

//=========================================================================================
// Phase 2: Complete
//=========================================================================================

/// Body of `POST /debug/complete`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteDebugRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub answers: Vec<QuestionAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteDebugResponse {
    pub session_id: Uuid,
    pub report: DebugReport,
}

//=========================================================================================
// History
//=========================================================================================

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// 1-based page number. Defaults to 1.
    pub page: Option<i64>,
    /// Items per page, 1 to 50. Defaults to 10.
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionPage {
    pub data: Vec<SessionSummary>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeleteSessionResponse {
    pub success: bool,
}
